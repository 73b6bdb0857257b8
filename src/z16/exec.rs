// z16/exec.rs
use std::sync::Arc;

use tracing::{info, trace, warn};

use crate::z16::arch::REGISTER_COUNT;
use crate::z16::disasm::disassemble;
use crate::z16::errors::Z16Error;
use crate::z16::instruction::Instruction;
use crate::z16::memory::{Bus, DataMemory, MemoryImage};
use crate::z16::registers::Registers;
use crate::z16::syscall::{dispatch, NullHost, Service, SyscallContext, SyscallHost};

/// Observable snapshot of a [`Machine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionState {
    pub registers: [u16; REGISTER_COUNT],
    pub pc: usize,
    pub halted: bool,
    pub paused: bool,
}

/// Single-stepping Z16 engine over a decoded program.
///
/// `pc` is a word index into the program and always lies in `0..=len`;
/// `len` is the one-past-the-end position where nothing executes.
pub struct Machine<H: SyscallHost = NullHost> {
    regs: Registers,
    pc: usize,
    halted: bool,
    paused: bool,
    program: Vec<Instruction>,
    mem: DataMemory,
    host: H,
}

impl<H: SyscallHost> Machine<H> {
    /// A machine starts paused, like the clock it is usually driven by.
    pub fn new(program: Vec<Instruction>, mem: DataMemory, host: H) -> Self {
        Self {
            regs: Registers::default(),
            pc: 0,
            halted: false,
            paused: true,
            program,
            mem,
            host,
        }
    }

    /// Decodes the image's program-code region and wraps it in a machine.
    pub fn from_image(image: Arc<MemoryImage>, host: H) -> Self {
        let program = disassemble(&image.program_words()).program();
        Self::new(program, DataMemory::new(image), host)
    }

    /// Convenience for tests and tools: `words` placed at the start of
    /// program code in an otherwise empty image.
    pub fn from_words(words: &[u16], host: H) -> Result<Self, Z16Error> {
        Ok(Self::from_image(Arc::new(MemoryImage::with_program(words)?), host))
    }

    pub fn registers(&self) -> &Registers { &self.regs }
    pub fn registers_mut(&mut self) -> &mut Registers { &mut self.regs }
    pub fn pc(&self) -> usize { self.pc }
    pub fn is_halted(&self) -> bool { self.halted }
    pub fn is_paused(&self) -> bool { self.paused }
    pub fn program(&self) -> &[Instruction] { &self.program }
    pub fn memory(&self) -> &DataMemory { &self.mem }
    pub fn host(&self) -> &H { &self.host }
    pub fn host_mut(&mut self) -> &mut H { &mut self.host }

    pub fn pause(&mut self) { self.paused = true; }
    pub fn resume(&mut self) { self.paused = false; }
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState {
            registers: self.regs.values(),
            pc: self.pc,
            halted: self.halted,
            paused: self.paused,
        }
    }

    /// Back to power-on state: registers cleared, stores dropped, paused.
    pub fn reset(&mut self) {
        self.regs.clear();
        self.mem.reset();
        self.pc = 0;
        self.halted = false;
        self.paused = true;
    }

    /// Moves PC by `delta` words, clamped to `0..=len`. No instruction runs.
    pub fn seek(&mut self, delta: isize) {
        self.pc = self.pc.saturating_add_signed(delta).min(self.program.len());
    }

    /// Runs the instruction at PC. Returns `false` when nothing ran: the
    /// machine is halted or PC is past the last instruction.
    pub fn step(&mut self) -> bool {
        if self.halted {
            return false;
        }
        self.execute(self.pc).is_ok()
    }

    /// Steps until halted, out of program, or `max_steps` reached.
    pub fn run(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.step() {
            steps += 1;
        }
        steps
    }

    /// Executes the instruction at `index` as if PC were there. An index
    /// outside the program changes nothing.
    pub fn execute(&mut self, index: usize) -> Result<(), Z16Error> {
        let Some(&inst) = self.program.get(index) else {
            let e = Z16Error::IndexOutOfRange { index, len: self.program.len() };
            warn!("{e}, nothing executed");
            return Err(e);
        };
        trace!(pc = index, ?inst, "execute");

        let regs = &mut self.regs;
        let link = (index as u16).wrapping_add(2);
        let mut next = Some(index + 1);
        let addr = |regs: &Registers, base: u8, offset: i8| regs.read(base).wrapping_add(offset as i16 as u16);

        match inst {
            // R
            Instruction::Add{rd,rs} => regs.write(rd, regs.read(rd).wrapping_add(regs.read(rs))),
            Instruction::Sub{rd,rs} => regs.write(rd, regs.read(rd).wrapping_sub(regs.read(rs))),
            Instruction::Slt{rd,rs} => regs.write(rd, (regs.read_signed(rd) < regs.read_signed(rs)) as u16),
            Instruction::Sltu{rd,rs} => regs.write(rd, (regs.read(rd) < regs.read(rs)) as u16),
            Instruction::Sll{rd,rs} => regs.write(rd, regs.read(rd) << (regs.read(rs) & 0xF)),
            Instruction::Srl{rd,rs} => regs.write(rd, regs.read(rd) >> (regs.read(rs) & 0xF)),
            Instruction::Sra{rd,rs} => regs.write(rd, (regs.read_signed(rd) >> (regs.read(rs) & 0xF)) as u16),
            Instruction::Or {rd,rs} => regs.write(rd, regs.read(rd) | regs.read(rs)),
            Instruction::And{rd,rs} => regs.write(rd, regs.read(rd) & regs.read(rs)),
            Instruction::Xor{rd,rs} => regs.write(rd, regs.read(rd) ^ regs.read(rs)),
            Instruction::Mv {rd,rs} => regs.write(rd, regs.read(rs)),
            Instruction::Jr {rs} => next = Some(regs.read(rs) as usize),
            Instruction::Jalr{rd,rs} => {
                // target first: rd may be rs
                let target = regs.read(rs) as usize;
                regs.write(rd, link);
                next = Some(target);
            }

            // I
            Instruction::Addi{rd,imm} => regs.write(rd, regs.read(rd).wrapping_add(imm as u16)),
            Instruction::Slti{rd,imm} => regs.write(rd, (regs.read_signed(rd) < imm) as u16),
            Instruction::Sltui{rd,imm} => regs.write(rd, (regs.read(rd) < imm as u16) as u16),
            Instruction::Ori {rd,imm} => regs.write(rd, regs.read(rd) | imm as u16),
            Instruction::Andi{rd,imm} => regs.write(rd, regs.read(rd) & imm as u16),
            Instruction::Xori{rd,imm} => regs.write(rd, regs.read(rd) ^ imm as u16),
            Instruction::Li  {rd,imm} => regs.write(rd, imm as u16),
            Instruction::Slli{rd,shamt} => regs.write(rd, regs.read(rd) << (shamt & 0xF)),
            Instruction::Srli{rd,shamt} => regs.write(rd, regs.read(rd) >> (shamt & 0xF)),
            Instruction::Srai{rd,shamt} => regs.write(rd, (regs.read_signed(rd) >> (shamt & 0xF)) as u16),

            // B
            Instruction::Beq{rs1,rs2,offset} if regs.read(rs1) == regs.read(rs2) => next = relative(index, offset),
            Instruction::Bne{rs1,rs2,offset} if regs.read(rs1) != regs.read(rs2) => next = relative(index, offset),
            Instruction::Bz {rs1,offset,..} if regs.read(rs1) == 0 => next = relative(index, offset),
            Instruction::Bnz{rs1,offset,..} if regs.read(rs1) != 0 => next = relative(index, offset),
            Instruction::Blt{rs1,rs2,offset} if regs.read_signed(rs1) < regs.read_signed(rs2) => next = relative(index, offset),
            Instruction::Bge{rs1,rs2,offset} if regs.read_signed(rs1) >= regs.read_signed(rs2) => next = relative(index, offset),
            Instruction::Bltu{rs1,rs2,offset} if regs.read(rs1) < regs.read(rs2) => next = relative(index, offset),
            Instruction::Bgeu{rs1,rs2,offset} if regs.read(rs1) >= regs.read(rs2) => next = relative(index, offset),
            Instruction::Beq{..} | Instruction::Bne{..} | Instruction::Bz{..} | Instruction::Bnz{..}
            | Instruction::Blt{..} | Instruction::Bge{..} | Instruction::Bltu{..} | Instruction::Bgeu{..} => {}

            // S / L
            Instruction::Sb{rs,base,offset} => { let a = addr(regs, base, offset); self.mem.store8(a, regs.read(rs) as u8); }
            Instruction::Sw{rs,base,offset} => { let a = addr(regs, base, offset); self.mem.store16(a, regs.read(rs)); }
            Instruction::Lb{rd,base,offset} => {
                let a = addr(regs, base, offset);
                regs.write(rd, self.mem.load8(a) as i8 as i16 as u16);
            }
            Instruction::Lbu{rd,base,offset} => {
                let a = addr(regs, base, offset);
                regs.write(rd, self.mem.load8(a) as u16);
            }
            Instruction::Lw{rd,base,offset} => {
                let a = addr(regs, base, offset);
                regs.write(rd, self.mem.load16(a));
            }

            // J / U
            Instruction::J{offset} => next = relative(index, offset),
            Instruction::Jal{rd,offset} => { regs.write(rd, link); next = relative(index, offset); }
            Instruction::Lui{rd,imm} => regs.write(rd, imm << 7),
            Instruction::Auipc{rd,imm} => regs.write(rd, (index as u16).wrapping_add(imm << 7)),

            Instruction::Ecall{service} => match Service::from_code(service) {
                Some(Service::ProgramExit) => {
                    info!(pc = index, "program exit");
                    self.halted = true;
                    next = Some(index);
                }
                Some(s) => {
                    let mut ctx = SyscallContext { regs, mem: &mut self.mem };
                    dispatch(&mut self.host, s, &mut ctx);
                }
                None => warn!(pc = index, "ECALL with unknown service {service}"),
            },

            Instruction::Unknown{word} => warn!(pc = index, "no handler for 0x{word:04X}, skipping"),
        }

        self.pc = match next {
            Some(t) if t <= self.program.len() => t,
            _ => {
                warn!(pc = index, ?next, "control transfer out of program, stopping at end");
                self.program.len()
            }
        };
        Ok(())
    }
}

#[inline]
fn relative(index: usize, delta: i16) -> Option<usize> {
    index.checked_add_signed(delta as isize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::z16::encoder::encode;
    use crate::z16::syscall::ConsoleHost;
    use Instruction::*;

    fn machine(program: &[Instruction]) -> Machine {
        let words: Vec<u16> = program.iter().map(|&i| encode(i).unwrap()).collect();
        Machine::from_words(&words, NullHost).unwrap()
    }

    #[test]
    fn add_then_exit() {
        let mut m = machine(&[
            Addi { rd: 1, imm: 5 },
            Addi { rd: 2, imm: 3 },
            Add { rd: 1, rs: 2 },
            Ecall { service: 10 },
        ]);
        assert_eq!(m.run(100), 4);
        assert_eq!(m.registers().read(1), 8);
        assert!(m.is_halted());
        assert_eq!(m.pc(), 3);
        assert!(!m.step());
    }

    #[test]
    fn executing_past_the_end_changes_nothing() {
        let mut m = machine(&[Li { rd: 1, imm: 7 }]);
        assert!(m.step());
        let before = m.state();
        assert_eq!(m.pc(), 1);
        assert!(matches!(m.execute(1), Err(Z16Error::IndexOutOfRange { index: 1, len: 1 })));
        assert!(!m.step());
        assert_eq!(m.state(), before);
    }

    #[test]
    fn hand_built_register_numbers_do_not_panic() {
        let mem = DataMemory::new(Arc::new(MemoryImage::from_bytes(&[]).unwrap()));
        let mut m = Machine::new(vec![Li { rd: 1, imm: 2 }, Add { rd: 9, rs: 1 }], mem, NullHost);
        assert_eq!(m.run(10), 2);
        assert_eq!(m.registers().read(1), 4);
    }

    #[test]
    fn signed_and_unsigned_compare_disagree() {
        let mut m = machine(&[Li { rd: 0, imm: -1 }, Li { rd: 1, imm: 1 }, Mv { rd: 2, rs: 0 }, Slt { rd: 0, rs: 1 }, Sltu { rd: 2, rs: 1 }]);
        m.run(10);
        assert_eq!(m.registers().read(0), 1);
        assert_eq!(m.registers().read(2), 0);
    }

    #[test]
    fn shifts_keep_or_drop_the_sign() {
        let mut m = machine(&[
            Li { rd: 1, imm: -64 },
            Mv { rd: 2, rs: 1 },
            Srai { rd: 1, shamt: 2 },
            Srli { rd: 2, shamt: 2 },
            Li { rd: 3, imm: 1 },
            Slli { rd: 3, shamt: 15 },
        ]);
        m.run(10);
        assert_eq!(m.registers().read(1) as i16, -16);
        assert_eq!(m.registers().read(2), 0xFFC0 >> 2);
        assert_eq!(m.registers().read(3), 0x8000);
    }

    #[test]
    fn jalr_links_and_jumps() {
        let mut m = machine(&[Li { rd: 3, imm: 3 }, Jalr { rd: 1, rs: 3 }, Li { rd: 4, imm: 9 }, Ecall { service: 10 }]);
        m.run(10);
        assert_eq!(m.registers().read(1), 3);
        assert_eq!(m.registers().read(4), 0);
        assert!(m.is_halted());
    }

    #[test]
    fn jalr_reads_target_before_linking() {
        let mut m = machine(&[Li { rd: 1, imm: 2 }, Jalr { rd: 1, rs: 1 }, Ecall { service: 10 }]);
        m.run(10);
        assert!(m.is_halted());
        assert_eq!(m.registers().read(1), 3);
    }

    #[test]
    fn counted_loop_with_branch() {
        // x1 counts down from 3, x2 accumulates
        let mut m = machine(&[
            Li { rd: 1, imm: 3 },
            Addi { rd: 2, imm: 2 },
            Addi { rd: 1, imm: -1 },
            Bnz { rs1: 1, rs2: 0, offset: -2 },
            Ecall { service: 10 },
        ]);
        m.run(100);
        assert_eq!(m.registers().read(2), 6);
        assert!(m.is_halted());
    }

    #[test]
    fn untaken_branch_falls_through() {
        let mut m = machine(&[Li { rd: 1, imm: 1 }, Beq { rs1: 1, rs2: 0, offset: 2 }, Li { rd: 2, imm: 5 }]);
        m.run(10);
        assert_eq!(m.registers().read(2), 5);
    }

    #[test]
    fn loads_and_stores_go_through_the_overlay() {
        let mut m = machine(&[
            Lui { rd: 2, imm: 2 }, // x2 = 0x100
            Li { rd: 1, imm: -2 },
            Sw { rs: 1, base: 2, offset: 4 },
            Lb { rd: 3, base: 2, offset: 4 },
            Lbu { rd: 4, base: 2, offset: 5 },
            Lw { rd: 5, base: 2, offset: 4 },
            Sb { rs: 1, base: 2, offset: -1 },
            Lbu { rd: 6, base: 2, offset: -1 },
        ]);
        m.run(20);
        let r = m.registers();
        assert_eq!(r.read(2), 0x100);
        assert_eq!(r.read(3), 0xFFFE);
        assert_eq!(r.read(4), 0x00FF);
        assert_eq!(r.read(5), 0xFFFE);
        assert_eq!(r.read(6), 0xFE);
        m.reset();
        assert_eq!(m.memory().load16(0x104), 0);
    }

    #[test]
    fn out_of_range_jump_parks_pc_at_end() {
        let mut m = machine(&[J { offset: -5 }, Li { rd: 1, imm: 1 }]);
        assert!(m.step());
        assert_eq!(m.pc(), 2);
        assert!(!m.step());
    }

    #[test]
    fn unknown_words_advance_pc() {
        let mut m = Machine::from_words(&[0xF000, encode(Li { rd: 1, imm: 4 }).unwrap()], NullHost).unwrap();
        m.run(10);
        assert_eq!(m.registers().read(1), 4);
        assert_eq!(m.pc(), 2);
    }

    #[test]
    fn syscalls_reach_the_host() {
        let words: Vec<u16> = [Li { rd: 6, imm: 0 }, Ecall { service: 2 }, Ecall { service: 8 }, Ecall { service: 10 }]
            .iter()
            .map(|&i| encode(i).unwrap())
            .collect();
        let mut m = Machine::from_words(&words, ConsoleHost::with_input(["42"])).unwrap();
        m.run(10);
        assert_eq!(m.registers().read(6), 42);
        assert!(m.host().output().contains("x6 (a0) = 0x002A"));
    }

    #[test]
    fn pause_seek_and_reset() {
        let mut m = machine(&[Li { rd: 1, imm: 1 }, Li { rd: 2, imm: 2 }]);
        assert!(m.is_paused());
        assert!(!m.toggle_pause());
        m.seek(1);
        assert_eq!(m.pc(), 1);
        m.seek(10);
        assert_eq!(m.pc(), 2);
        m.seek(-10);
        assert_eq!(m.pc(), 0);
        m.step();
        m.reset();
        assert_eq!(m.state(), ExecutionState { registers: [0; 8], pc: 0, halted: false, paused: true });
    }
}
