//! Disassembly of a Z16 word sequence into a listing with synthetic labels.
//!
//! A [`Disassembler`] owns the label state for one pass: the first branch or
//! jump that targets a word index creates `label_<n>` there, later references
//! to the same index reuse it. Decoding stops after the first SYS word
//! carrying service code 10.

use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::z16::decoder::{decode_lossy, is_exit_word};
use crate::z16::instruction::Instruction;
use crate::z16::syscall::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub usize);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label_{}", self.0)
    }
}

/// Label numbers by target word index, numbered in discovery order.
#[derive(Debug, Default, Clone)]
pub struct LabelTable {
    next: usize,
    by_target: BTreeMap<usize, Label>,
}

impl LabelTable {
    /// Returns the label at `target`, creating the next one on first use.
    pub fn resolve(&mut self, target: usize) -> Label {
        if let Some(&label) = self.by_target.get(&target) {
            return label;
        }
        let label = Label(self.next);
        self.next += 1;
        self.by_target.insert(target, label);
        label
    }

    pub fn at(&self, index: usize) -> Option<Label> {
        self.by_target.get(&index).copied()
    }

    pub fn len(&self) -> usize {
        self.by_target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }

    /// `(target, label)` pairs in target order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Label)> + '_ {
        self.by_target.iter().map(|(&t, &l)| (t, l))
    }
}

/// Where a relative branch or jump lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Label(Label),
    /// Target outside the word sequence; kept as the raw word delta.
    Offset(i16),
}

/// One operand as shown in the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Reg(u8),
    /// Immediate rendered in decimal.
    Imm(i32),
    /// Raw immediate field rendered as `0x` hex.
    Field(u16),
    Mem { offset: i8, base: u8 },
    Target(Target),
    Service(u16),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::Reg(r) => write!(f, "x{r}"),
            Operand::Imm(v) => write!(f, "{v}"),
            Operand::Field(v) => write!(f, "0x{v:02X}"),
            Operand::Mem { offset, base } => write!(f, "{offset}(x{base})"),
            Operand::Target(Target::Label(l)) => write!(f, "{l}"),
            Operand::Target(Target::Offset(o)) => write!(f, "{o}"),
            Operand::Service(code) => write!(f, "{code}"),
        }
    }
}

/// One decoded word with its branch target already resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub index: usize,
    pub word: u16,
    pub instruction: Instruction,
    pub target: Option<Target>,
}

impl Decoded {
    pub fn operands(&self) -> Vec<Operand> {
        use Instruction::*;
        use Operand::Reg;
        let target = || Operand::Target(self.target.unwrap_or(Target::Offset(0)));
        let field = |imm: i16| Operand::Field((imm as u16) & 0x7F);
        match self.instruction {
            Add{rd,rs} | Sub{rd,rs} | Slt{rd,rs} | Sltu{rd,rs} | Sll{rd,rs} | Srl{rd,rs}
            | Sra{rd,rs} | Or{rd,rs} | And{rd,rs} | Xor{rd,rs} | Mv{rd,rs} | Jalr{rd,rs} => vec![Reg(rd), Reg(rs)],
            Jr{rs} => vec![Reg(rs)],
            Addi{rd,imm} | Slti{rd,imm} | Ori{rd,imm} | Andi{rd,imm} | Xori{rd,imm} | Li{rd,imm} => {
                vec![Reg(rd), field(imm)]
            }
            Sltui{rd,imm} => vec![Reg(rd), Operand::Field(imm as u16)],
            Slli{rd,shamt} | Srli{rd,shamt} | Srai{rd,shamt} => vec![Reg(rd), Operand::Imm(shamt as i32)],
            Beq{rs1,rs2,..} | Bne{rs1,rs2,..} | Bz{rs1,rs2,..} | Bnz{rs1,rs2,..}
            | Blt{rs1,rs2,..} | Bge{rs1,rs2,..} | Bltu{rs1,rs2,..} | Bgeu{rs1,rs2,..} => {
                vec![Reg(rs1), Reg(rs2), target()]
            }
            Sb{rs,base,offset} | Sw{rs,base,offset} => vec![Reg(rs), Operand::Mem { offset, base }],
            Lb{rd,base,offset} | Lw{rd,base,offset} | Lbu{rd,base,offset} => {
                vec![Reg(rd), Operand::Mem { offset, base }]
            }
            J{..} => vec![target()],
            Jal{rd,..} => vec![Reg(rd), target()],
            Lui{rd,imm} | Auipc{rd,imm} => vec![Reg(rd), Operand::Field(imm)],
            Ecall{service} => vec![Operand::Service(service)],
            Unknown{..} => Vec::new(),
        }
    }

    /// Listing text: mnemonic first, operands comma-separated.
    pub fn text(&self) -> String {
        let Some(m) = self.instruction.mnemonic() else {
            return format!("UNKNOWN 0x{:04X}", self.word);
        };
        let ops = self.operands().iter().map(|o| o.to_string()).collect::<Vec<_>>().join(", ");
        let mut line = format!("{m} {ops}");
        if let Instruction::Ecall { service } = self.instruction {
            if let Some(s) = Service::from_code(service) {
                line.push_str(&format!("  # {}", s.name()));
            }
        }
        line
    }
}

/// Result of one disassembly pass.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    decoded: Vec<Decoded>,
    labels: LabelTable,
}

impl Listing {
    pub fn decoded(&self) -> &[Decoded] {
        &self.decoded
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.decoded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoded.is_empty()
    }

    /// The executable program, indexed by word position.
    pub fn program(&self) -> Vec<Instruction> {
        self.decoded.iter().map(|d| d.instruction).collect()
    }

    /// Text lines with each label line placed right before its target.
    /// Labels pointing past the last decoded word trail the listing.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.decoded.len() + self.labels.len());
        for d in &self.decoded {
            if let Some(label) = self.labels.at(d.index) {
                out.push(format!("{label}:"));
            }
            out.push(d.text());
        }
        for (target, label) in self.labels.iter() {
            if target >= self.decoded.len() {
                out.push(format!("{label}:"));
            }
        }
        out
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// One disassembly session. Consumed by [`Disassembler::run`], so label
/// numbering never leaks between passes.
#[derive(Debug, Default)]
pub struct Disassembler {
    labels: LabelTable,
}

impl Disassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(mut self, words: &[u16]) -> Listing {
        let mut decoded = Vec::new();
        for (index, &word) in words.iter().enumerate() {
            let instruction = decode_lossy(word);
            let target = instruction
                .relative_target()
                .map(|delta| self.target(index, delta, words.len()));
            decoded.push(Decoded { index, word, instruction, target });
            if is_exit_word(word) {
                debug!("program exit at word {index}, {} words dropped", words.len() - index - 1);
                break;
            }
        }
        Listing { decoded, labels: self.labels }
    }

    fn target(&mut self, index: usize, delta: i16, len: usize) -> Target {
        match index.checked_add_signed(delta as isize) {
            Some(t) if t < len => Target::Label(self.labels.resolve(t)),
            _ => Target::Offset(delta),
        }
    }
}

/// Convenience wrapper around a fresh [`Disassembler`].
pub fn disassemble(words: &[u16]) -> Listing {
    Disassembler::new().run(words)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::z16::encoder::encode;
    use Instruction::*;

    fn words(program: &[Instruction]) -> Vec<u16> {
        program.iter().map(|&i| encode(i).unwrap()).collect()
    }

    #[test]
    fn label_resolution_is_idempotent_and_ordered_by_discovery() {
        let mut labels = LabelTable::default();
        assert_eq!(labels.resolve(9), Label(0));
        assert_eq!(labels.resolve(2), Label(1));
        assert_eq!(labels.resolve(9), Label(0));
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn formats_every_class() {
        let listing = disassemble(&words(&[
            Add { rd: 1, rs: 2 },
            Jr { rs: 3 },
            Addi { rd: 1, imm: 5 },
            Addi { rd: 1, imm: -1 },
            Srli { rd: 2, shamt: 4 },
            Sb { rs: 1, base: 2, offset: -2 },
            Lw { rd: 3, base: 4, offset: 6 },
            Lui { rd: 5, imm: 0x1F },
            Ecall { service: 3 },
        ]));
        let lines = listing.lines();
        assert_eq!(
            lines,
            vec![
                "ADD x1, x2",
                "JR x3",
                "ADDI x1, 0x05",
                "ADDI x1, 0x7F",
                "SRLI x2, 4",
                "SB x1, -2(x2)",
                "LW x3, 6(x4)",
                "LUI x5, 0x1F",
                "ECALL 3  # Print String",
            ]
        );
    }

    #[test]
    fn branch_labels_precede_targets() {
        let listing = disassemble(&words(&[
            Beq { rs1: 1, rs2: 2, offset: 2 },
            J { offset: 1 },
            Ecall { service: 10 },
        ]));
        assert_eq!(
            listing.lines(),
            vec![
                "BEQ x1, x2, label_0",
                "J label_0",
                "label_0:",
                "ECALL 10  # Program Exit",
            ]
        );
    }

    #[test]
    fn labels_numbered_in_discovery_order() {
        let listing = disassemble(&words(&[
            Bne { rs1: 0, rs2: 0, offset: 3 },
            Jal { rd: 1, offset: 1 },
            Li { rd: 0, imm: 0 },
            Ecall { service: 10 },
        ]));
        assert_eq!(listing.labels().at(3), Some(Label(0)));
        assert_eq!(listing.labels().at(2), Some(Label(1)));
        assert_eq!(listing.lines()[1], "JAL x1, label_1");
    }

    #[test]
    fn decoding_stops_at_exit() {
        let mut w = words(&[Addi { rd: 1, imm: 1 }, Ecall { service: 10 }]);
        w.extend(words(&[Addi { rd: 2, imm: 2 }, Addi { rd: 3, imm: 3 }]));
        let listing = disassemble(&w);
        assert_eq!(listing.len(), 2);
        assert!(listing.program()[1].is_exit());
    }

    #[test]
    fn any_sys_word_with_exit_code_ends_decoding() {
        // SYS, funct3=001, service 10: undecodable but still the terminator
        let stop = (10u16 << 6) | (0b001 << 3) | 0b111;
        let mut w = vec![stop];
        w.extend(words(&[Addi { rd: 1, imm: 1 }, Addi { rd: 1, imm: 1 }]));
        let listing = disassemble(&w);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.lines(), vec!["UNKNOWN 0x028F"]);
    }

    #[test]
    fn out_of_range_targets_render_as_offsets() {
        let listing = disassemble(&words(&[
            Blt { rs1: 1, rs2: 2, offset: -3 },
            Ecall { service: 10 },
        ]));
        assert_eq!(listing.lines()[0], "BLT x1, x2, -3");
        assert!(listing.labels().is_empty());
    }

    #[test]
    fn labels_past_the_exit_trail_the_listing() {
        let w = words(&[
            Bz { rs1: 1, rs2: 0, offset: 2 },
            Ecall { service: 10 },
            Add { rd: 0, rs: 0 },
        ]);
        let lines = disassemble(&w).lines();
        assert_eq!(lines.last().map(String::as_str), Some("label_0:"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn unknown_words_keep_going() {
        let w = vec![0xF000, encode(Ecall { service: 10 }).unwrap()];
        let listing = disassemble(&w);
        assert_eq!(listing.lines(), vec!["UNKNOWN 0xF000", "ECALL 10  # Program Exit"]);
    }

    #[test]
    fn sessions_do_not_share_labels() {
        let w = words(&[J { offset: 1 }, Ecall { service: 10 }]);
        assert_eq!(disassemble(&w).lines()[0], "J label_0");
        assert_eq!(disassemble(&w).lines()[0], "J label_0");
    }
}
