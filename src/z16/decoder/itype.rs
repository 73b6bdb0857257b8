use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::{bits, sext};

pub(super) fn decode(word:u16)->Result<Instruction,Z16Error>{
    let imm7 = bits(word, 15, 9);
    let rd = bits(word, 8, 6) as u8;
    let funct3 = bits(word, 5, 3) as u8;
    let imm = sext(imm7, 7);
    // shift variants drop the 3-bit selector prefix
    let shamt = (imm7 & 0xF) as u8;
    let invalid = Z16Error::Decode{ word, reason: "invalid I-type" };

    let m = lookup(Format::I, Selector::I{ funct3, imm7: imm7 as u8 }).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Addi  => Instruction::Addi{rd,imm},
        Mnemonic::Slti  => Instruction::Slti{rd,imm},
        Mnemonic::Sltui => Instruction::Sltui{ rd, imm: imm7 as u8 },
        Mnemonic::Ori   => Instruction::Ori{rd,imm},
        Mnemonic::Andi  => Instruction::Andi{rd,imm},
        Mnemonic::Xori  => Instruction::Xori{rd,imm},
        Mnemonic::Li    => Instruction::Li{rd,imm},
        Mnemonic::Slli  => Instruction::Slli{rd,shamt},
        Mnemonic::Srli  => Instruction::Srli{rd,shamt},
        Mnemonic::Srai  => Instruction::Srai{rd,shamt},
        _ => return Err(invalid),
    })
}
