// z16/registers.rs
use crate::z16::arch::{abi_name, REGISTER_COUNT, WORD_BITS};
use crate::z16::bits::decimal_to_binary;
use crate::z16::errors::Z16Error;

/// The eight 16-bit general-purpose registers. Every register is writable.
/// Register numbers are taken modulo 8, the width of a register field.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    x: [u16; REGISTER_COUNT],
}

impl Registers {
    #[inline] pub fn read(&self, r: u8) -> u16 { self.x[slot(r)] }
    #[inline] pub fn read_signed(&self, r: u8) -> i16 { self.x[slot(r)] as i16 }
    #[inline] pub fn write(&mut self, r: u8, v: u16) { self.x[slot(r)] = v; }

    pub fn values(&self) -> [u16; REGISTER_COUNT] {
        self.x
    }

    /// Register contents as a 16-character bit string, MSB first.
    pub fn as_bits(&self, r: u8) -> Result<String, Z16Error> {
        decimal_to_binary(self.read(r) as i64, WORD_BITS)
    }

    pub fn clear(&mut self) {
        self.x = [0; REGISTER_COUNT];
    }

    /// `x<N> (<abi>) = 0x<hex>` per register.
    pub fn dump(&self) -> Vec<String> {
        (0..REGISTER_COUNT as u8)
            .map(|r| format!("x{r} ({}) = 0x{:04X}", abi_name(r), self.read(r)))
            .collect()
    }
}

#[inline]
fn slot(r: u8) -> usize {
    r as usize % REGISTER_COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x0_is_an_ordinary_register() {
        let mut regs = Registers::default();
        regs.write(0, 0xFFFF);
        assert_eq!(regs.read(0), 0xFFFF);
        assert_eq!(regs.read_signed(0), -1);
    }

    #[test]
    fn bit_view_and_dump() {
        let mut regs = Registers::default();
        regs.write(6, 5);
        assert_eq!(regs.as_bits(6).unwrap(), "0000000000000101");
        assert_eq!(regs.dump()[6], "x6 (a0) = 0x0005");
        regs.clear();
        assert_eq!(regs.values(), [0; 8]);
    }

    #[test]
    fn out_of_field_numbers_wrap() {
        let mut regs = Registers::default();
        regs.write(9, 0x1234);
        assert_eq!(regs.read(1), 0x1234);
        assert_eq!(regs.read(255), 0);
    }
}
