// Z16 architectural constants.

pub const OPC_RTYPE: u8 = 0b000;
pub const OPC_ITYPE: u8 = 0b001;
pub const OPC_BTYPE: u8 = 0b010;
pub const OPC_STYPE: u8 = 0b011;
pub const OPC_LTYPE: u8 = 0b100;
pub const OPC_JTYPE: u8 = 0b101;
pub const OPC_UTYPE: u8 = 0b110;
pub const OPC_SYS: u8 = 0b111;

pub const REGISTER_COUNT: usize = 8;
pub const WORD_BITS: u32 = 16;

/// Size of the whole address space in bytes.
pub const MEMORY_SIZE: usize = 65_536;

pub const INTERRUPT_VECTOR_START: u16 = 0x0000;
pub const INTERRUPT_VECTOR_END: u16 = 0x001F;
pub const PROGRAM_START: u16 = 0x0020;
pub const PROGRAM_END: u16 = 0xEFFF;
pub const MMIO_START: u16 = 0xF000;
pub const MMIO_END: u16 = 0xFFFF;

/// Service code of the canonical program terminator (`ECALL 10`).
pub const EXIT_SERVICE: u16 = 10;

// ABI register names
pub const T0: u8 = 0;
pub const RA: u8 = 1;
pub const SP: u8 = 2;
pub const S0: u8 = 3;
pub const S1: u8 = 4;
pub const T1: u8 = 5;
pub const A0: u8 = 6; // syscall argument / result
pub const A1: u8 = 7; // second syscall argument

pub fn abi_name(reg: u8) -> &'static str {
    match reg {
        T0 => "t0",
        RA => "ra",
        SP => "sp",
        S0 => "s0",
        S1 => "s1",
        T1 => "t1",
        A0 => "a0",
        A1 => "a1",
        _ => "",
    }
}
