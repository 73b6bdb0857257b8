// z16/instruction.rs
use crate::z16::arch::EXIT_SERVICE;
use crate::z16::table::Mnemonic;

/// A decoded Z16 instruction with typed operands.
///
/// Branch and jump offsets are word-index deltas (already halved from the
/// encoded byte offset). Load/store offsets are byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // R-type: rd is both the first source and the destination
    Add{ rd:u8, rs:u8 }, Sub{ rd:u8, rs:u8 },
    Slt{ rd:u8, rs:u8 }, Sltu{ rd:u8, rs:u8 },
    Sll{ rd:u8, rs:u8 }, Srl{ rd:u8, rs:u8 }, Sra{ rd:u8, rs:u8 },
    Or{ rd:u8, rs:u8 }, And{ rd:u8, rs:u8 }, Xor{ rd:u8, rs:u8 },
    Mv{ rd:u8, rs:u8 },
    Jr{ rs:u8 }, Jalr{ rd:u8, rs:u8 },

    // I-type: `imm` is the sign-extended 7-bit field
    Addi{ rd:u8, imm:i16 }, Slti{ rd:u8, imm:i16 },
    Sltui{ rd:u8, imm:u8 },
    Ori{ rd:u8, imm:i16 }, Andi{ rd:u8, imm:i16 }, Xori{ rd:u8, imm:i16 },
    Li{ rd:u8, imm:i16 },
    Slli{ rd:u8, shamt:u8 }, Srli{ rd:u8, shamt:u8 }, Srai{ rd:u8, shamt:u8 },

    // B-type
    Beq{ rs1:u8, rs2:u8, offset:i16 }, Bne{ rs1:u8, rs2:u8, offset:i16 },
    Bz{ rs1:u8, rs2:u8, offset:i16 }, Bnz{ rs1:u8, rs2:u8, offset:i16 },
    Blt{ rs1:u8, rs2:u8, offset:i16 }, Bge{ rs1:u8, rs2:u8, offset:i16 },
    Bltu{ rs1:u8, rs2:u8, offset:i16 }, Bgeu{ rs1:u8, rs2:u8, offset:i16 },

    // S-type / L-type
    Sb{ rs:u8, base:u8, offset:i8 }, Sw{ rs:u8, base:u8, offset:i8 },
    Lb{ rd:u8, base:u8, offset:i8 }, Lw{ rd:u8, base:u8, offset:i8 },
    Lbu{ rd:u8, base:u8, offset:i8 },

    // J-type / U-type (`imm` is the raw 9-bit field)
    J{ offset:i16 }, Jal{ rd:u8, offset:i16 },
    Lui{ rd:u8, imm:u16 }, Auipc{ rd:u8, imm:u16 },

    Ecall{ service:u16 },

    /// Word whose opcode/selector combination has no table entry.
    Unknown{ word:u16 },
}

impl Instruction {
    pub fn mnemonic(&self) -> Option<Mnemonic> {
        use Instruction::*;
        Some(match *self {
            Add{..} => Mnemonic::Add, Sub{..} => Mnemonic::Sub,
            Slt{..} => Mnemonic::Slt, Sltu{..} => Mnemonic::Sltu,
            Sll{..} => Mnemonic::Sll, Srl{..} => Mnemonic::Srl, Sra{..} => Mnemonic::Sra,
            Or{..} => Mnemonic::Or, And{..} => Mnemonic::And, Xor{..} => Mnemonic::Xor,
            Mv{..} => Mnemonic::Mv, Jr{..} => Mnemonic::Jr, Jalr{..} => Mnemonic::Jalr,
            Addi{..} => Mnemonic::Addi, Slti{..} => Mnemonic::Slti, Sltui{..} => Mnemonic::Sltui,
            Ori{..} => Mnemonic::Ori, Andi{..} => Mnemonic::Andi, Xori{..} => Mnemonic::Xori,
            Li{..} => Mnemonic::Li,
            Slli{..} => Mnemonic::Slli, Srli{..} => Mnemonic::Srli, Srai{..} => Mnemonic::Srai,
            Beq{..} => Mnemonic::Beq, Bne{..} => Mnemonic::Bne,
            Bz{..} => Mnemonic::Bz, Bnz{..} => Mnemonic::Bnz,
            Blt{..} => Mnemonic::Blt, Bge{..} => Mnemonic::Bge,
            Bltu{..} => Mnemonic::Bltu, Bgeu{..} => Mnemonic::Bgeu,
            Sb{..} => Mnemonic::Sb, Sw{..} => Mnemonic::Sw,
            Lb{..} => Mnemonic::Lb, Lw{..} => Mnemonic::Lw, Lbu{..} => Mnemonic::Lbu,
            J{..} => Mnemonic::J, Jal{..} => Mnemonic::Jal,
            Lui{..} => Mnemonic::Lui, Auipc{..} => Mnemonic::Auipc,
            Ecall{..} => Mnemonic::Ecall,
            Unknown{..} => return None,
        })
    }

    /// Word-index delta of a PC-relative branch or jump.
    pub fn relative_target(&self) -> Option<i16> {
        use Instruction::*;
        match *self {
            Beq{offset,..} | Bne{offset,..} | Bz{offset,..} | Bnz{offset,..}
            | Blt{offset,..} | Bge{offset,..} | Bltu{offset,..} | Bgeu{offset,..}
            | J{offset} | Jal{offset,..} => Some(offset),
            _ => None,
        }
    }

    /// `ECALL 10`, the canonical program terminator.
    pub fn is_exit(&self) -> bool {
        matches!(self, Instruction::Ecall { service } if *service == EXIT_SERVICE)
    }
}
