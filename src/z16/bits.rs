//! Bit-field helpers: fixed-width slices of an instruction word and the
//! two's-complement conversions between integers and bit strings.
//!
//! The integer helpers (`bits`, `sext`) are what the decoder runs on; the
//! string codec backs register views that show fixed-width bit strings.

use crate::z16::errors::Z16Error;

/// Extracts bits `hi..=lo` of `v`, right-aligned.
#[inline]
pub fn bits(v: u16, hi: u8, lo: u8) -> u16 {
    (v >> lo) & (((1u32 << (hi - lo + 1)) - 1) as u16)
}

/// Sign-extends the low `n` bits of `v`.
#[inline]
pub fn sext(v: u16, n: u8) -> i16 {
    let shift = 16 - n as u32;
    ((v << shift) as i16) >> shift
}

fn validate(bin: &str) -> Result<(), Z16Error> {
    if bin.is_empty() || !bin.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(Z16Error::MalformedBits(bin.to_string()));
    }
    Ok(())
}

fn check_width(width: u32) -> Result<(), Z16Error> {
    if (1..=32).contains(&width) {
        Ok(())
    } else {
        Err(Z16Error::InvalidWidth(width))
    }
}

#[inline]
fn mask(width: u32) -> u64 {
    (1u64 << width) - 1
}

fn twos_complement(raw: u64, width: u32) -> i64 {
    if (raw >> (width - 1)) & 1 == 1 {
        raw as i64 - (1i64 << width)
    } else {
        raw as i64
    }
}

/// Interprets `bin` as a `width`-bit two's-complement value.
///
/// Shorter strings are padded on the left with copies of their own leading
/// bit; longer strings keep only their `width` least-significant bits.
pub fn sign_extend(bin: &str, width: u32) -> Result<i64, Z16Error> {
    validate(bin)?;
    check_width(width)?;
    let len = bin.len();
    let w = width as usize;
    let raw = if len >= w {
        u64::from_str_radix(&bin[len - w..], 2).map_err(|_| Z16Error::MalformedBits(bin.to_string()))?
    } else {
        let low = u64::from_str_radix(bin, 2).map_err(|_| Z16Error::MalformedBits(bin.to_string()))?;
        if bin.starts_with('1') {
            low | (mask(width) ^ mask(len as u32))
        } else {
            low
        }
    };
    Ok(twos_complement(raw, width))
}

/// Converts a bit string to an integer; the string length is the width.
pub fn binary_to_decimal(bin: &str, signed: bool) -> Result<i64, Z16Error> {
    validate(bin)?;
    let width = bin.len() as u32;
    check_width(width)?;
    let raw = u64::from_str_radix(bin, 2).map_err(|_| Z16Error::MalformedBits(bin.to_string()))?;
    Ok(if signed { twos_complement(raw, width) } else { raw as i64 })
}

/// Renders `value` as exactly `width` bits, wrapping negatives.
pub fn decimal_to_binary(value: i64, width: u32) -> Result<String, Z16Error> {
    check_width(width)?;
    let masked = (value as u64) & mask(width);
    Ok(format!("{masked:0w$b}", w = width as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_extend_examples() {
        assert_eq!(sign_extend("1000", 4).unwrap(), -8);
        assert_eq!(sign_extend("0111", 4).unwrap(), 7);
        assert_eq!(sign_extend("1", 1).unwrap(), -1);
    }

    #[test]
    fn sign_extend_pads_with_leading_bit() {
        assert_eq!(sign_extend("10", 8).unwrap(), -2);
        assert_eq!(sign_extend("01", 8).unwrap(), 1);
    }

    #[test]
    fn sign_extend_truncates_to_low_bits() {
        // "1" ++ "0111" keeps only the low four bits
        assert_eq!(sign_extend("10111", 4).unwrap(), 7);
        assert_eq!(sign_extend("011110", 5).unwrap(), -2);
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert_eq!(
            sign_extend("10a1", 4),
            Err(Z16Error::MalformedBits("10a1".into()))
        );
        assert!(binary_to_decimal("", false).is_err());
        assert!(binary_to_decimal("0x10", true).is_err());
        assert_eq!(sign_extend("1", 0), Err(Z16Error::InvalidWidth(0)));
    }

    #[test]
    fn unsigned_and_signed_views_differ() {
        assert_eq!(binary_to_decimal("1111111111111111", false).unwrap(), 65535);
        assert_eq!(binary_to_decimal("1111111111111111", true).unwrap(), -1);
    }

    #[test]
    fn decimal_to_binary_wraps_negatives() {
        assert_eq!(decimal_to_binary(-1, 4).unwrap(), "1111");
        assert_eq!(decimal_to_binary(5, 8).unwrap(), "00000101");
        assert_eq!(decimal_to_binary(65536 + 3, 16).unwrap(), "0000000000000011");
    }

    #[test]
    fn sixteen_bit_round_trip() {
        for v in -32768i64..=32767 {
            let s = decimal_to_binary(v, 16).unwrap();
            assert_eq!(binary_to_decimal(&s, true).unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn word_slices() {
        let w = 0b1010_0110_1100_1011u16;
        assert_eq!(bits(w, 2, 0), 0b011);
        assert_eq!(bits(w, 15, 12), 0b1010);
        assert_eq!(bits(w, 15, 15), 1);
        assert_eq!(sext(0b1000, 4), -8);
        assert_eq!(sext(0b0111, 4), 7);
        assert_eq!(sext(0x7F, 7), -1);
    }
}
