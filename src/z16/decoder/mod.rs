mod btype;
mod itype;
mod jtype;
mod rtype;
mod stype;
mod sys;

use tracing::debug;

use crate::z16::arch::{EXIT_SERVICE, OPC_SYS};
use crate::z16::bits::{bits, sext};
use crate::z16::errors::Z16Error;
use crate::z16::instruction::Instruction;
use crate::z16::table::Format;

/// Decodes one 16-bit word. The opcode is bits [2:0].
pub fn decode(word: u16) -> Result<Instruction, Z16Error> {
    let opcode = bits(word, 2, 0) as u8;
    match Format::from_opcode(opcode) {
        Some(Format::R) => rtype::decode(word),
        Some(Format::I) => itype::decode(word),
        Some(Format::B) => btype::decode(word),
        Some(Format::S) => stype::decode_store(word),
        Some(Format::L) => stype::decode_load(word),
        Some(Format::J) => jtype::decode_jump(word),
        Some(Format::U) => jtype::decode_upper(word),
        Some(Format::Sys) => sys::decode(word),
        None => Err(Z16Error::Decode { word, reason: "unknown opcode" }),
    }
}

/// Like [`decode`], but turns a decode failure into [`Instruction::Unknown`].
pub fn decode_lossy(word: u16) -> Instruction {
    decode(word).unwrap_or_else(|e| {
        debug!("undecodable word 0x{word:04X}: {e}");
        Instruction::Unknown { word }
    })
}

/// A SYS-class word carrying the exit service code, whatever its funct3.
/// Disassembly ends at such a word.
pub fn is_exit_word(word: u16) -> bool {
    bits(word, 2, 0) as u8 == OPC_SYS && bits(word, 15, 6) == EXIT_SERVICE
}
