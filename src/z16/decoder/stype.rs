use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::{bits, sext};

pub(super) fn decode_store(word:u16)->Result<Instruction,Z16Error>{
    let offset = sext(bits(word, 15, 12), 4) as i8;
    let base = bits(word, 11, 9) as u8;
    let rs = bits(word, 8, 6) as u8;
    let funct3 = bits(word, 5, 3) as u8;
    let invalid = Z16Error::Decode{ word, reason: "invalid store" };

    let m = lookup(Format::S, Selector::Funct3(funct3)).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Sb => Instruction::Sb{rs,base,offset},
        Mnemonic::Sw => Instruction::Sw{rs,base,offset},
        _ => return Err(invalid),
    })
}

pub(super) fn decode_load(word:u16)->Result<Instruction,Z16Error>{
    let offset = sext(bits(word, 15, 12), 4) as i8;
    let base = bits(word, 11, 9) as u8;
    let rd = bits(word, 8, 6) as u8;
    let funct3 = bits(word, 5, 3) as u8;
    let invalid = Z16Error::Decode{ word, reason: "invalid load" };

    let m = lookup(Format::L, Selector::Funct3(funct3)).ok_or(invalid.clone())?;
    Ok(match m {
        Mnemonic::Lb  => Instruction::Lb{rd,base,offset},
        Mnemonic::Lw  => Instruction::Lw{rd,base,offset},
        Mnemonic::Lbu => Instruction::Lbu{rd,base,offset},
        _ => return Err(invalid),
    })
}
