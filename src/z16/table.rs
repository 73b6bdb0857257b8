// z16/table.rs
//! Static instruction format table: (format class, selector bits) -> mnemonic.

use std::fmt;

use crate::z16::arch::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R,
    I,
    B,
    S,
    L,
    J,
    U,
    Sys,
}

impl Format {
    pub fn from_opcode(opcode: u8) -> Option<Format> {
        Some(match opcode {
            OPC_RTYPE => Format::R,
            OPC_ITYPE => Format::I,
            OPC_BTYPE => Format::B,
            OPC_STYPE => Format::S,
            OPC_LTYPE => Format::L,
            OPC_JTYPE => Format::J,
            OPC_UTYPE => Format::U,
            OPC_SYS => Format::Sys,
            _ => return None,
        })
    }

    pub fn opcode(self) -> u8 {
        match self {
            Format::R => OPC_RTYPE,
            Format::I => OPC_ITYPE,
            Format::B => OPC_BTYPE,
            Format::S => OPC_STYPE,
            Format::L => OPC_LTYPE,
            Format::J => OPC_JTYPE,
            Format::U => OPC_UTYPE,
            Format::Sys => OPC_SYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    // R
    Add, Sub, Slt, Sltu, Sll, Srl, Sra, Or, And, Xor, Mv, Jr, Jalr,
    // I
    Addi, Slti, Sltui, Slli, Srli, Srai, Ori, Andi, Xori, Li,
    // B
    Beq, Bne, Bz, Bnz, Blt, Bge, Bltu, Bgeu,
    // S / L
    Sb, Sw, Lb, Lw, Lbu,
    // J / U
    J, Jal, Lui, Auipc,
    // SYS
    Ecall,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Add => "ADD", Sub => "SUB", Slt => "SLT", Sltu => "SLTU",
            Sll => "SLL", Srl => "SRL", Sra => "SRA", Or => "OR",
            And => "AND", Xor => "XOR", Mv => "MV", Jr => "JR", Jalr => "JALR",
            Addi => "ADDI", Slti => "SLTI", Sltui => "SLTUI", Slli => "SLLI",
            Srli => "SRLI", Srai => "SRAI", Ori => "ORI", Andi => "ANDI",
            Xori => "XORI", Li => "LI",
            Beq => "BEQ", Bne => "BNE", Bz => "BZ", Bnz => "BNZ",
            Blt => "BLT", Bge => "BGE", Bltu => "BLTU", Bgeu => "BGEU",
            Sb => "SB", Sw => "SW", Lb => "LB", Lw => "LW", Lbu => "LBU",
            J => "J", Jal => "JAL", Lui => "LUI", Auipc => "AUIPC",
            Ecall => "ECALL",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary selector bits, shaped per format class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// R-type: `funct4` = bits [15:12], `funct3` = bits [5:3].
    R { funct4: u8, funct3: u8 },
    /// I-type: `funct3`, plus the 7-bit immediate whose top three bits pick
    /// the shift variant when `funct3` is the shift group.
    I { funct3: u8, imm7: u8 },
    /// B, S, L and SYS classes.
    Funct3(u8),
    /// J and U classes: bit 15.
    Flag(bool),
}

const I_SHIFT_GROUP: u8 = 0b011;

static R_TABLE: &[(u8, u8, Mnemonic)] = &[
    (0b0000, 0b000, Mnemonic::Add),
    (0b0001, 0b000, Mnemonic::Sub),
    (0b0010, 0b001, Mnemonic::Slt),
    (0b0011, 0b010, Mnemonic::Sltu),
    (0b0100, 0b011, Mnemonic::Sll),
    (0b0101, 0b011, Mnemonic::Srl),
    (0b0110, 0b011, Mnemonic::Sra),
    (0b0111, 0b100, Mnemonic::Or),
    (0b1000, 0b101, Mnemonic::And),
    (0b1001, 0b110, Mnemonic::Xor),
    (0b1010, 0b111, Mnemonic::Mv),
    (0b1011, 0b000, Mnemonic::Jr),
    (0b1100, 0b000, Mnemonic::Jalr),
];

static I_TABLE: &[(u8, Mnemonic)] = &[
    (0b000, Mnemonic::Addi),
    (0b001, Mnemonic::Slti),
    (0b010, Mnemonic::Sltui),
    (0b100, Mnemonic::Ori),
    (0b101, Mnemonic::Andi),
    (0b110, Mnemonic::Xori),
    (0b111, Mnemonic::Li),
];

// keyed by imm7[6:4]
static SHIFT_TABLE: &[(u8, Mnemonic)] = &[
    (0b001, Mnemonic::Slli),
    (0b010, Mnemonic::Srli),
    (0b100, Mnemonic::Srai),
];

static B_TABLE: &[(u8, Mnemonic)] = &[
    (0b000, Mnemonic::Beq),
    (0b001, Mnemonic::Bne),
    (0b010, Mnemonic::Bz),
    (0b011, Mnemonic::Bnz),
    (0b100, Mnemonic::Blt),
    (0b101, Mnemonic::Bge),
    (0b110, Mnemonic::Bltu),
    (0b111, Mnemonic::Bgeu),
];

static S_TABLE: &[(u8, Mnemonic)] = &[(0b000, Mnemonic::Sb), (0b001, Mnemonic::Sw)];

static L_TABLE: &[(u8, Mnemonic)] = &[
    (0b000, Mnemonic::Lb),
    (0b001, Mnemonic::Lw),
    (0b100, Mnemonic::Lbu),
];

static J_TABLE: &[(bool, Mnemonic)] = &[(false, Mnemonic::J), (true, Mnemonic::Jal)];
static U_TABLE: &[(bool, Mnemonic)] = &[(false, Mnemonic::Lui), (true, Mnemonic::Auipc)];
static SYS_TABLE: &[(u8, Mnemonic)] = &[(0b000, Mnemonic::Ecall)];

fn find<K: PartialEq + Copy>(table: &[(K, Mnemonic)], key: K) -> Option<Mnemonic> {
    table.iter().find(|(k, _)| *k == key).map(|&(_, m)| m)
}

/// Looks up the mnemonic for a format class and its selector bits.
/// `None` means the combination is not part of the ISA.
pub fn lookup(format: Format, selector: Selector) -> Option<Mnemonic> {
    match (format, selector) {
        (Format::R, Selector::R { funct4, funct3 }) => R_TABLE
            .iter()
            .find(|&&(f4, f3, _)| f4 == funct4 && f3 == funct3)
            .map(|&(_, _, m)| m),
        (Format::I, Selector::I { funct3, imm7 }) if funct3 == I_SHIFT_GROUP => {
            find(SHIFT_TABLE, (imm7 >> 4) & 0b111)
        }
        (Format::I, Selector::I { funct3, .. }) => find(I_TABLE, funct3),
        (Format::B, Selector::Funct3(f3)) => find(B_TABLE, f3),
        (Format::S, Selector::Funct3(f3)) => find(S_TABLE, f3),
        (Format::L, Selector::Funct3(f3)) => find(L_TABLE, f3),
        (Format::J, Selector::Flag(flag)) => find(J_TABLE, flag),
        (Format::U, Selector::Flag(flag)) => find(U_TABLE, flag),
        (Format::Sys, Selector::Funct3(f3)) => find(SYS_TABLE, f3),
        _ => None,
    }
}

fn rfind<K: Copy>(table: &[(K, Mnemonic)], m: Mnemonic) -> Option<K> {
    table.iter().find(|(_, v)| *v == m).map(|&(k, _)| k)
}

/// Reverse lookup used by the encoder. For the shift group the returned
/// `imm7` carries only the three selector bits.
pub fn selector_of(m: Mnemonic) -> Option<(Format, Selector)> {
    if let Some(&(funct4, funct3, _)) = R_TABLE.iter().find(|(_, _, v)| *v == m) {
        return Some((Format::R, Selector::R { funct4, funct3 }));
    }
    if let Some(funct3) = rfind(I_TABLE, m) {
        return Some((Format::I, Selector::I { funct3, imm7: 0 }));
    }
    if let Some(prefix) = rfind(SHIFT_TABLE, m) {
        return Some((Format::I, Selector::I { funct3: I_SHIFT_GROUP, imm7: prefix << 4 }));
    }
    let funct3_tables = [
        (Format::B, B_TABLE),
        (Format::S, S_TABLE),
        (Format::L, L_TABLE),
        (Format::Sys, SYS_TABLE),
    ];
    for (format, table) in funct3_tables {
        if let Some(f3) = rfind(table, m) {
            return Some((format, Selector::Funct3(f3)));
        }
    }
    for (format, table) in [(Format::J, J_TABLE), (Format::U, U_TABLE)] {
        if let Some(flag) = rfind(table, m) {
            return Some((format, Selector::Flag(flag)));
        }
    }
    None
}
