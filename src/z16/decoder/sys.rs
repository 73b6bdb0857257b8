use crate::z16::{errors::Z16Error, instruction::Instruction};
use crate::z16::table::{lookup, Format, Mnemonic, Selector};
use super::bits;

pub(super) fn decode(word:u16)->Result<Instruction,Z16Error>{
    let service = bits(word, 15, 6);
    let funct3 = bits(word, 5, 3) as u8;

    match lookup(Format::Sys, Selector::Funct3(funct3)) {
        Some(Mnemonic::Ecall) => Ok(Instruction::Ecall{service}),
        _ => Err(Z16Error::Decode{ word, reason: "invalid system call" }),
    }
}
