pub mod arch;
pub mod bits;
pub mod errors;
pub mod instruction;
pub mod memory;
pub mod registers;
pub mod syscall;
pub mod table;

pub mod decoder;
pub mod disasm;
pub mod encoder;

pub mod clock;
pub mod exec;


pub use clock::{Clock, Phase, SharedMachine, Tick};
pub use disasm::{disassemble, Disassembler, Listing};
pub use errors::Z16Error;
pub use exec::{ExecutionState, Machine};
pub use instruction::Instruction;
pub use memory::{Bus, DataMemory, MemoryImage};
pub use registers::Registers;
pub use syscall::{ConsoleHost, NullHost, SyscallHost};
