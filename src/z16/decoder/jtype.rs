use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::{bits, sext};

pub(super) fn decode_jump(word:u16)->Result<Instruction,Z16Error>{
    let flag = bits(word, 15, 15) == 1;
    let rd = bits(word, 8, 6) as u8;
    // J-imm: [9:4|3:1] << 1; the flag bit falls outside the 10-bit window
    let imm_bits = (bits(word, 14, 9) << 4) | (bits(word, 5, 3) << 1);
    let offset = sext(imm_bits, 10) / 2;
    let invalid = Z16Error::Decode{ word, reason: "invalid jump" };

    let m = lookup(Format::J, Selector::Flag(flag)).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::J   => Instruction::J{offset},
        Mnemonic::Jal => Instruction::Jal{rd,offset},
        _ => return Err(invalid),
    })
}

pub(super) fn decode_upper(word:u16)->Result<Instruction,Z16Error>{
    let flag = bits(word, 15, 15) == 1;
    let rd = bits(word, 8, 6) as u8;
    let imm = (bits(word, 14, 9) << 3) | bits(word, 5, 3);
    let invalid = Z16Error::Decode{ word, reason: "invalid upper-immediate" };

    let m = lookup(Format::U, Selector::Flag(flag)).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Lui   => Instruction::Lui{rd,imm},
        Mnemonic::Auipc => Instruction::Auipc{rd,imm},
        _ => return Err(invalid),
    })
}
