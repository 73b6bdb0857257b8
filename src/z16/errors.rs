use thiserror::Error;

/// Errors that can occur within the Z16 simulator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Z16Error {
    /// Opcode/selector combination missing from the format table.
    #[error("Decode error: {reason} (word 0x{word:04X})")]
    Decode { word: u16, reason: &'static str },

    /// A bit string containing something other than `0`/`1`.
    #[error("Malformed bit string: {0:?}")]
    MalformedBits(String),

    /// Width outside 1..=32 handed to the bit codec.
    #[error("Invalid bit width: {0}")]
    InvalidWidth(u32),

    /// Execution requested for an index outside the decoded program.
    #[error("Index {index} out of range (program has {len} instructions)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Binary larger than the 64 KiB address space.
    #[error("Image of {0} bytes does not fit in memory")]
    ImageTooLarge(usize),

    /// Field value that does not fit its encoding slot.
    #[error("Encode error: {0}")]
    Encode(&'static str),

    /// Shared machine state became unusable (a lock holder panicked).
    #[error("Machine state poisoned")]
    Poisoned,

    /// Clock asked to run at a non-positive or non-finite frequency.
    #[error("Invalid clock frequency: {0} Hz")]
    InvalidFrequency(f64),
}
