//! Open-file table: per-open-file cursor plus a one-block write-back buffer.
//! The buffer is the only cache of a data block while its file is open.

use log::{debug, trace};

use crate::bitmap::Bitmap;
use crate::config::*;
use crate::descriptor::Descriptor;
use crate::error::FsError;
use crate::{BlockDevice, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    pub descriptor: usize,
    pub position: usize,
    pub buf: [u8; BLOCK_SIZE],
    /// Index inside the file (not on disk) of the block held by `buf`.
    pub buf_block: Option<usize>,
    pub dirty: bool,
}

impl OpenFile {
    pub fn new(descriptor: usize) -> Self {
        Self {
            descriptor,
            position: 0,
            buf: [0; BLOCK_SIZE],
            buf_block: None,
            dirty: false,
        }
    }

    /// Offset of `position` inside the buffered block.
    pub fn cursor(&self) -> usize {
        self.position % BLOCK_SIZE
    }

    /// Reads file block `file_block` of `descriptor` into the buffer.
    pub fn load(
        &mut self,
        device: &impl BlockDevice,
        descriptor: &Descriptor,
        file_block: usize,
    ) -> Result<()> {
        let block_id = descriptor
            .blocks
            .get(file_block)
            .copied()
            .flatten()
            .ok_or_else(|| {
                FsError::InvalidImage(format!(
                    "descriptor {} has no block {}",
                    self.descriptor, file_block
                ))
            })?;
        device.read_block(block_id, &mut self.buf)?;
        self.buf_block = Some(file_block);
        self.dirty = false;
        Ok(())
    }

    /// Writes a dirty buffer back to the disk block it mirrors.
    pub fn flush(&mut self, device: &mut impl BlockDevice, descriptor: &Descriptor) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(block_id) = self.buf_block.and_then(|b| descriptor.blocks[b]) {
            device.write_block(block_id, &self.buf)?;
            trace!("flushed descriptor {} block {}", self.descriptor, block_id);
        }
        self.dirty = false;
        Ok(())
    }

    /// Makes the buffer hold the block under `position`, flushing the old one
    /// and allocating the new one if the file does not reach that far yet.
    pub fn reconcile(
        &mut self,
        device: &mut impl BlockDevice,
        bitmap: &mut Bitmap,
        descriptor: &mut Descriptor,
    ) -> Result<()> {
        let Some(current) = self.buf_block else {
            return Ok(());
        };
        let target = self.position / BLOCK_SIZE;
        if target == current {
            return Ok(());
        }
        if target >= NUM_DIRECT_PTRS {
            return Err(FsError::PositionOutOfRange { pos: self.position, len: descriptor.length });
        }

        self.flush(device, descriptor)?;

        if descriptor.blocks[target].is_none() {
            let block_id = bitmap.alloc_data_block(device.num_blocks())?;
            descriptor.blocks[target] = Some(block_id);
            descriptor.length += BLOCK_SIZE;
        }
        self.load(device, descriptor, target)?;
        debug!(
            "descriptor {}: buffer moved from file block {} to {}",
            self.descriptor, current, target
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFileTable {
    slots: [Option<OpenFile>; OFT_SIZE],
}

impl OpenFileTable {
    /// Empty table with slot 0 taken by the directory.
    pub fn new() -> Self {
        let mut slots: [Option<OpenFile>; OFT_SIZE] = core::array::from_fn(|_| None);
        slots[0] = Some(OpenFile::new(DIRECTORY_DESCRIPTOR));
        Self { slots }
    }

    /// Slot holding `descriptor`, ignoring the directory slot.
    pub fn find_open(&self, descriptor: usize) -> Option<usize> {
        (1..OFT_SIZE).find(|&i| matches!(&self.slots[i], Some(f) if f.descriptor == descriptor))
    }

    /// Lowest free user slot.
    pub fn alloc_slot(&self) -> Option<usize> {
        (1..OFT_SIZE).find(|&i| self.slots[i].is_none())
    }

    pub fn insert(&mut self, index: usize, file: OpenFile) {
        self.slots[index] = Some(file);
    }

    pub fn free_slot(&mut self, index: usize) -> Option<OpenFile> {
        if index == 0 {
            return None;
        }
        self.slots.get_mut(index)?.take()
    }

    pub fn get(&self, index: usize) -> Result<&OpenFile> {
        if index == 0 {
            return Err(FsError::InvalidIndex(index));
        }
        self.slots
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(FsError::InvalidIndex(index))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut OpenFile> {
        if index == 0 {
            return Err(FsError::InvalidIndex(index));
        }
        self.slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidIndex(index))
    }

    /// Indices of the occupied user slots.
    pub fn open_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (1..OFT_SIZE).filter(|&i| self.slots[i].is_some())
    }

    pub fn directory(&self) -> Option<&OpenFile> {
        self.slots[0].as_ref()
    }
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}
