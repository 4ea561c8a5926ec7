//! Free-space bitmap: one bit per logical block, kept in memory and
//! serialised to block 0 MSB-first (bit 0 is the high bit of byte 0).

use log::debug;

use crate::config::*;
use crate::error::FsError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitmap(u64);

const fn mask(block_id: usize) -> u64 {
    1 << (BITMAP_BITS - 1 - block_id)
}

impl Bitmap {
    /// A bitmap with only the permanently reserved metadata blocks set.
    pub fn new() -> Self {
        let mut bitmap = Self(0);
        bitmap.set_range(0, RESERVED_BLOCKS);
        bitmap
    }

    pub fn is_set(&self, block_id: usize) -> bool {
        block_id < BITMAP_BITS && self.0 & mask(block_id) != 0
    }

    pub fn set(&mut self, block_id: usize) {
        if block_id < BITMAP_BITS {
            self.0 |= mask(block_id);
        }
    }

    fn set_range(&mut self, start: usize, end: usize) {
        for block_id in start..end.min(BITMAP_BITS) {
            self.set(block_id);
        }
    }

    /// Clears the bit of a data block. Reserved blocks stay set.
    pub fn free(&mut self, block_id: usize) {
        if block_id >= RESERVED_BLOCKS && block_id < BITMAP_BITS {
            self.0 &= !mask(block_id);
            debug!("freed data block {}", block_id);
        }
    }

    /// Sets the first clear bit in `[RESERVED_BLOCKS, num_blocks)`.
    /// Returns the block ID of the bit that was set.
    pub fn alloc_data_block(&mut self, num_blocks: usize) -> Result<usize> {
        let block_id = (RESERVED_BLOCKS..num_blocks.min(BITMAP_BITS))
            .find(|&i| !self.is_set(i))
            .ok_or(FsError::NoSpace)?;
        self.set(block_id);
        debug!("allocated data block {}", block_id);
        Ok(block_id)
    }

    /// Number of set bits among the first `num_blocks`.
    pub fn used(&self, num_blocks: usize) -> usize {
        (0..num_blocks.min(BITMAP_BITS)).filter(|&i| self.is_set(i)).count()
    }

    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        buf[..8].copy_from_slice(&self.0.to_be_bytes());
        buf
    }

    /// Reads the bitmap back from block 0. The reserved bits are forced on.
    pub fn from_block(buf: &[u8]) -> Self {
        let mut bits = [0u8; 8];
        for (dst, src) in bits.iter_mut().zip(buf) {
            *dst = *src;
        }
        let mut bitmap = Self(u64::from_be_bytes(bits));
        bitmap.set_range(0, RESERVED_BLOCKS);
        bitmap
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_msb_first() {
        let mut bitmap = Bitmap(0);
        bitmap.set(0);
        bitmap.set(9);
        bitmap.set(63);
        let block = bitmap.to_block();
        assert_eq!(block[0], 0x80);
        assert_eq!(block[1], 0x40);
        assert_eq!(block[7], 0x01);
        assert!(block[8..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_reserved_never_allocated() {
        let mut bitmap = Bitmap::new();
        assert_eq!(bitmap.to_block()[0], 0xff);
        bitmap.free(3);
        assert!(bitmap.is_set(3));
        assert_eq!(bitmap.alloc_data_block(64).unwrap(), RESERVED_BLOCKS);
    }
}
