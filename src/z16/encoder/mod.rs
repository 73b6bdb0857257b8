// src/z16/encoder/mod.rs
use crate::z16::arch::REGISTER_COUNT;
use crate::z16::errors::Z16Error;
use crate::z16::instruction::Instruction;
use crate::z16::table::{selector_of, Selector};

#[inline] fn r(funct4:u16, rs2:u16, rd:u16, funct3:u16, opc:u16) -> u16 {
    (funct4<<12) | (rs2<<9) | (rd<<6) | (funct3<<3) | opc
}
#[inline] fn i(imm7:u16, rd:u16, funct3:u16, opc:u16) -> u16 {
    (imm7<<9) | (rd<<6) | (funct3<<3) | opc
}
#[inline] fn j(flag:bool, imm_bytes:u16, rd:u16, opc:u16) -> u16 {
    // J-imm in bytes: [9:4] -> bits 14:9, [3:1] -> bits 5:3
    ((flag as u16)<<15) | (((imm_bytes>>4) & 0x3F)<<9) | (rd<<6) | (((imm_bytes>>1) & 0x7)<<3) | opc
}
#[inline] fn u(flag:bool, imm9:u16, rd:u16, opc:u16) -> u16 {
    ((flag as u16)<<15) | ((imm9>>3)<<9) | (rd<<6) | ((imm9 & 0x7)<<3) | opc
}

fn reg(r: u8) -> Result<u16, Z16Error> {
    if (r as usize) < REGISTER_COUNT { Ok(r as u16) } else { Err(Z16Error::Encode("register out of range")) }
}

fn signed(v: i16, bits: u32, ctx: &'static str) -> Result<u16, Z16Error> {
    let min = -(1i16 << (bits - 1));
    let max = (1i16 << (bits - 1)) - 1;
    if v < min || v > max {
        return Err(Z16Error::Encode(ctx));
    }
    Ok((v as u16) & ((1u16 << bits) - 1))
}

fn unsigned(v: u16, bits: u32, ctx: &'static str) -> Result<u16, Z16Error> {
    if v >> bits != 0 { Err(Z16Error::Encode(ctx)) } else { Ok(v) }
}

/// Encodes an instruction back into its 16-bit word.
pub fn encode(inst: Instruction) -> Result<u16, Z16Error> {
    use Instruction::*;
    let Some(m) = inst.mnemonic() else {
        // UNKNOWN keeps the word it was decoded from
        if let Unknown { word } = inst { return Ok(word); }
        return Err(Z16Error::Encode("no mnemonic"));
    };
    let (format, selector) = selector_of(m).ok_or(Z16Error::Encode("mnemonic missing from table"))?;
    let opc = format.opcode() as u16;

    Ok(match (inst, selector) {
        // R-type
        (Add{rd,rs} | Sub{rd,rs} | Slt{rd,rs} | Sltu{rd,rs} | Sll{rd,rs} | Srl{rd,rs}
        | Sra{rd,rs} | Or{rd,rs} | And{rd,rs} | Xor{rd,rs} | Mv{rd,rs} | Jalr{rd,rs},
         Selector::R{funct4,funct3}) => r(funct4 as u16, reg(rs)?, reg(rd)?, funct3 as u16, opc),
        (Jr{rs}, Selector::R{funct4,funct3}) => r(funct4 as u16, 0, reg(rs)?, funct3 as u16, opc),

        // I-type
        (Addi{rd,imm} | Slti{rd,imm} | Ori{rd,imm} | Andi{rd,imm} | Xori{rd,imm} | Li{rd,imm},
         Selector::I{funct3,..}) => i(signed(imm, 7, "I-imm must fit 7 signed bits")?, reg(rd)?, funct3 as u16, opc),
        (Sltui{rd,imm}, Selector::I{funct3,..}) =>
            i(unsigned(imm as u16, 7, "SLTUI imm must fit 7 bits")?, reg(rd)?, funct3 as u16, opc),
        (Slli{rd,shamt} | Srli{rd,shamt} | Srai{rd,shamt}, Selector::I{funct3,imm7}) => {
            let shamt = unsigned(shamt as u16, 4, "shift amount must be 0..=15")?;
            i(imm7 as u16 | shamt, reg(rd)?, funct3 as u16, opc)
        }

        // B-type (offset in words)
        (Beq{rs1,rs2,offset} | Bne{rs1,rs2,offset} | Bz{rs1,rs2,offset} | Bnz{rs1,rs2,offset}
        | Blt{rs1,rs2,offset} | Bge{rs1,rs2,offset} | Bltu{rs1,rs2,offset} | Bgeu{rs1,rs2,offset},
         Selector::Funct3(f3)) => {
            let imm = signed(offset, 4, "branch offset must be -8..=7 words")?;
            r(imm, reg(rs2)?, reg(rs1)?, f3 as u16, opc)
        }

        // S-type / L-type
        (Sb{rs,base,offset} | Sw{rs,base,offset}, Selector::Funct3(f3))
        | (Lb{rd:rs,base,offset} | Lw{rd:rs,base,offset} | Lbu{rd:rs,base,offset}, Selector::Funct3(f3)) => {
            let imm = signed(offset as i16, 4, "memory offset must be -8..=7")?;
            r(imm, reg(base)?, reg(rs)?, f3 as u16, opc)
        }

        // J-type
        (J{offset}, Selector::Flag(flag)) => {
            let bytes = signed(offset, 9, "jump offset must be -256..=255 words")?.wrapping_shl(1);
            j(flag, bytes, 0, opc)
        }
        (Jal{rd,offset}, Selector::Flag(flag)) => {
            let bytes = signed(offset, 9, "jump offset must be -256..=255 words")?.wrapping_shl(1);
            j(flag, bytes, reg(rd)?, opc)
        }

        // U-type
        (Lui{rd,imm} | Auipc{rd,imm}, Selector::Flag(flag)) =>
            u(flag, unsigned(imm, 9, "upper immediate must fit 9 bits")?, reg(rd)?, opc),

        (Ecall{service}, Selector::Funct3(f3)) =>
            (unsigned(service, 10, "service code must fit 10 bits")?<<6) | ((f3 as u16)<<3) | opc,

        _ => return Err(Z16Error::Encode("selector does not match instruction format")),
    })
}

/// Little-endian byte image of a word sequence.
pub fn to_bytes(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::z16::decoder::decode;

    fn round_trip(inst: Instruction) {
        let word = encode(inst).unwrap();
        assert_eq!(decode(word).unwrap(), inst, "word 0x{word:04X}");
    }

    #[test]
    fn one_per_format_class() {
        round_trip(Instruction::Xor { rd: 7, rs: 6 });
        round_trip(Instruction::Jr { rs: 3 });
        round_trip(Instruction::Li { rd: 4, imm: -64 });
        round_trip(Instruction::Slli { rd: 2, shamt: 15 });
        round_trip(Instruction::Bltu { rs1: 5, rs2: 6, offset: -8 });
        round_trip(Instruction::Sb { rs: 1, base: 2, offset: 7 });
        round_trip(Instruction::Lw { rd: 3, base: 0, offset: -8 });
        round_trip(Instruction::J { offset: -256 });
        round_trip(Instruction::Jal { rd: 1, offset: 255 });
        round_trip(Instruction::Lui { rd: 6, imm: 0x155 });
        round_trip(Instruction::Ecall { service: 0x3FF });
    }

    #[test]
    fn fields_out_of_range_are_rejected() {
        assert!(encode(Instruction::Addi { rd: 1, imm: 64 }).is_err());
        assert!(encode(Instruction::Add { rd: 8, rs: 0 }).is_err());
        assert!(encode(Instruction::Beq { rs1: 0, rs2: 0, offset: 8 }).is_err());
        assert!(encode(Instruction::Srai { rd: 0, shamt: 16 }).is_err());
        assert!(encode(Instruction::Ecall { service: 0x400 }).is_err());
    }

    #[test]
    fn bytes_are_little_endian() {
        assert_eq!(to_bytes(&[0x1234, 0xABCD]), vec![0x34, 0x12, 0xCD, 0xAB]);
    }
}
