use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::z16::arch::*;
use crate::z16::errors::Z16Error;

/// Byte-addressed access to the 64 KiB Z16 address space.
pub trait Bus {
    fn load8(&self, addr: u16) -> u8;
    fn store8(&mut self, addr: u16, value: u8);

    fn load16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.load8(addr), self.load8(addr.wrapping_add(1))])
    }

    fn store16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.store8(addr, lo);
        self.store8(addr.wrapping_add(1), hi);
    }
}

/// Address-range classification of the Z16 memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    InterruptVector,
    ProgramCode,
    Mmio,
}

impl Region {
    pub fn of(addr: u16) -> Region {
        match addr {
            INTERRUPT_VECTOR_START..=INTERRUPT_VECTOR_END => Region::InterruptVector,
            PROGRAM_START..=PROGRAM_END => Region::ProgramCode,
            MMIO_START..=MMIO_END => Region::Mmio,
        }
    }
}

/// A loaded binary. Immutable once built; the engine shares it by `Arc`.
#[derive(Clone)]
pub struct MemoryImage {
    bytes: Box<[u8]>,
    loaded: usize,
}

impl MemoryImage {
    /// Places `data` at address 0. Bytes past the end of `data` read as zero
    /// but are not part of the program.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Z16Error> {
        if data.len() > MEMORY_SIZE {
            return Err(Z16Error::ImageTooLarge(data.len()));
        }
        let mut bytes = vec![0u8; MEMORY_SIZE].into_boxed_slice();
        bytes[..data.len()].copy_from_slice(data);
        Ok(Self { bytes, loaded: data.len() })
    }

    /// Image with an empty interrupt vector and `words` at the start of the
    /// program-code region.
    pub fn with_program(words: &[u16]) -> Result<Self, Z16Error> {
        let mut data = vec![0u8; PROGRAM_START as usize];
        data.extend(words.iter().flat_map(|w| w.to_le_bytes()));
        Self::from_bytes(&data)
    }

    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[addr as usize]
    }

    pub fn loaded_len(&self) -> usize {
        self.loaded
    }

    pub fn interrupt_vector(&self) -> &[u8] {
        &self.bytes[INTERRUPT_VECTOR_START as usize..=INTERRUPT_VECTOR_END as usize]
    }

    /// The loaded part of the program-code region.
    pub fn program_code(&self) -> &[u8] {
        let start = PROGRAM_START as usize;
        let end = self.loaded.min(PROGRAM_END as usize + 1);
        if end <= start { &[] } else { &self.bytes[start..end] }
    }

    pub fn mmio(&self) -> &[u8] {
        &self.bytes[MMIO_START as usize..]
    }

    /// Program words, little-endian: the lower address supplies bits [7:0].
    /// A trailing odd byte is dropped.
    pub fn program_words(&self) -> Vec<u16> {
        self.program_code()
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }
}

/// Data view used by loads and stores: the shared image plus an
/// engine-owned write overlay. The image itself never changes.
pub struct DataMemory {
    image: Arc<MemoryImage>,
    writes: HashMap<u16, u8>,
}

impl DataMemory {
    pub fn new(image: Arc<MemoryImage>) -> Self {
        Self { image, writes: HashMap::new() }
    }

    pub fn image(&self) -> &Arc<MemoryImage> {
        &self.image
    }

    /// Drops every store made since load.
    pub fn reset(&mut self) {
        self.writes.clear();
    }
}

impl Bus for DataMemory {
    fn load8(&self, addr: u16) -> u8 {
        self.writes.get(&addr).copied().unwrap_or_else(|| self.image.read(addr))
    }

    fn store8(&mut self, addr: u16, value: u8) {
        if Region::of(addr) != Region::ProgramCode {
            trace!("store to {:?} at 0x{addr:04X}", Region::of(addr));
        }
        self.writes.insert(addr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_boundaries() {
        assert_eq!(Region::of(0x0000), Region::InterruptVector);
        assert_eq!(Region::of(0x001F), Region::InterruptVector);
        assert_eq!(Region::of(0x0020), Region::ProgramCode);
        assert_eq!(Region::of(0xEFFF), Region::ProgramCode);
        assert_eq!(Region::of(0xF000), Region::Mmio);
        assert_eq!(Region::of(0xFFFF), Region::Mmio);
    }

    #[test]
    fn words_are_assembled_little_endian() {
        let mut data = vec![0u8; 32];
        data.extend([0x34, 0x12, 0xCD, 0xAB, 0xFF]);
        let image = MemoryImage::from_bytes(&data).unwrap();
        assert_eq!(image.program_words(), vec![0x1234, 0xABCD]);
    }

    #[test]
    fn region_slices() {
        let image = MemoryImage::from_bytes(&[7u8; 40]).unwrap();
        assert_eq!(image.interrupt_vector().len(), 32);
        assert_eq!(image.program_code().len(), 8);
        assert_eq!(image.mmio().len(), 4096);
        assert!(MemoryImage::from_bytes(&[0u8; 10]).unwrap().program_code().is_empty());
        assert_eq!(
            MemoryImage::from_bytes(&vec![0u8; MEMORY_SIZE + 1]).err(),
            Some(Z16Error::ImageTooLarge(MEMORY_SIZE + 1))
        );
    }

    #[test]
    fn overlay_shadows_image_and_resets() {
        let image = Arc::new(MemoryImage::with_program(&[0xBEEF]).unwrap());
        let mut mem = DataMemory::new(image.clone());
        assert_eq!(mem.load16(0x20), 0xBEEF);
        mem.store16(0x20, 0x1234);
        assert_eq!(mem.load16(0x20), 0x1234);
        assert_eq!(image.read(0x20), 0xEF);
        mem.reset();
        assert_eq!(mem.load16(0x20), 0xBEEF);
    }

    #[test]
    fn word_access_wraps_at_top_of_memory() {
        let image = Arc::new(MemoryImage::from_bytes(&[0xAA]).unwrap());
        let mut mem = DataMemory::new(image);
        mem.store8(0xFFFF, 0x55);
        assert_eq!(mem.load16(0xFFFF), 0xAA55);
    }
}
