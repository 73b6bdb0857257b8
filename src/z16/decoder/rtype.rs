use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::bits;

pub(super) fn decode(word:u16)->Result<Instruction,Z16Error>{
    let funct4 = bits(word, 15, 12) as u8;
    let rs = bits(word, 11, 9) as u8;
    let rd = bits(word, 8, 6) as u8;
    let funct3 = bits(word, 5, 3) as u8;
    let invalid = Z16Error::Decode{ word, reason: "invalid R-type" };

    let m = lookup(Format::R, Selector::R{ funct4, funct3 }).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Add  => Instruction::Add{rd,rs},
        Mnemonic::Sub  => Instruction::Sub{rd,rs},
        Mnemonic::Slt  => Instruction::Slt{rd,rs},
        Mnemonic::Sltu => Instruction::Sltu{rd,rs},
        Mnemonic::Sll  => Instruction::Sll{rd,rs},
        Mnemonic::Srl  => Instruction::Srl{rd,rs},
        Mnemonic::Sra  => Instruction::Sra{rd,rs},
        Mnemonic::Or   => Instruction::Or{rd,rs},
        Mnemonic::And  => Instruction::And{rd,rs},
        Mnemonic::Xor  => Instruction::Xor{rd,rs},
        Mnemonic::Mv   => Instruction::Mv{rd,rs},
        // JR names its target in the rd/rs1 slot
        Mnemonic::Jr   => Instruction::Jr{ rs: rd },
        Mnemonic::Jalr => Instruction::Jalr{rd,rs},
        _ => return Err(invalid),
    })
}
