use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::{bits, sext};

pub(super) fn decode(word:u16)->Result<Instruction,Z16Error>{
    let rs2 = bits(word, 11, 9) as u8;
    let rs1 = bits(word, 8, 6) as u8;
    let funct3 = bits(word, 5, 3) as u8;
    // B-imm: [4:1] with an implicit 0, a byte offset; halved into words
    let offset = sext(bits(word, 15, 12) << 1, 5) / 2;
    let invalid = Z16Error::Decode{ word, reason: "invalid branch" };

    let m = lookup(Format::B, Selector::Funct3(funct3)).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Beq  => Instruction::Beq{rs1,rs2,offset},
        Mnemonic::Bne  => Instruction::Bne{rs1,rs2,offset},
        Mnemonic::Bz   => Instruction::Bz{rs1,rs2,offset},
        Mnemonic::Bnz  => Instruction::Bnz{rs1,rs2,offset},
        Mnemonic::Blt  => Instruction::Blt{rs1,rs2,offset},
        Mnemonic::Bge  => Instruction::Bge{rs1,rs2,offset},
        Mnemonic::Bltu => Instruction::Bltu{rs1,rs2,offset},
        Mnemonic::Bgeu => Instruction::Bgeu{rs1,rs2,offset},
        _ => return Err(invalid),
    })
}
