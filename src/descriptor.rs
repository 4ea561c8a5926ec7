//! File descriptors and the fixed descriptor table stored in blocks 1..=6.
//!
//! On disk every descriptor is four little-endian `i32`s:
//! `(length, blocks[0], blocks[1], blocks[2])`, with `-1` standing for an
//! unallocated pointer and an all `-1` record for a free slot.

use log::debug;

use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result};

const FREE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Descriptor {
    /// Bytes covered by allocated blocks; always a multiple of `BLOCK_SIZE`.
    pub length: usize,
    pub blocks: [Option<usize>; NUM_DIRECT_PTRS],
}

impl Descriptor {
    pub fn new(length: usize, blocks: [Option<usize>; NUM_DIRECT_PTRS]) -> Self {
        Self { length, blocks }
    }

    /// Descriptor 0: the directory file and its fixed data blocks.
    pub fn directory() -> Self {
        Self::new(0, DIRECTORY_BLOCKS.map(Some))
    }

    /// Data blocks currently linked into the file.
    pub fn allocated(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().flatten().copied()
    }

    fn encode(&self, out: &mut [u8]) {
        write_i32(out, 0, self.length as i32);
        for (i, block) in self.blocks.iter().enumerate() {
            write_i32(out, 4 * (i + 1), block.map_or(FREE, |b| b as i32));
        }
    }

    fn decode(raw: &[u8]) -> Result<Option<Self>> {
        let length = read_i32(raw, 0);
        if length == FREE {
            return Ok(None);
        }
        if length < 0 || length as usize > MAX_FILE_SIZE {
            return Err(FsError::InvalidImage(format!("descriptor length {}", length)));
        }
        let mut blocks = [None; NUM_DIRECT_PTRS];
        for (i, slot) in blocks.iter_mut().enumerate() {
            let block = read_i32(raw, 4 * (i + 1));
            *slot = match block {
                FREE => None,
                b if b >= 0 && (b as usize) < BITMAP_BITS => Some(b as usize),
                b => return Err(FsError::InvalidImage(format!("block pointer {}", b))),
            };
        }
        Ok(Some(Self::new(length as usize, blocks)))
    }
}

fn read_i32(buf: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}

fn write_i32(buf: &mut [u8], offset: usize, value: i32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTable {
    slots: [Option<Descriptor>; NUM_DESCRIPTORS],
}

impl DescriptorTable {
    /// A table with every slot free.
    pub fn new() -> Self {
        Self { slots: [None; NUM_DESCRIPTORS] }
    }

    pub fn get(&self, index: usize) -> Option<&Descriptor> {
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Descriptor> {
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn install(&mut self, index: usize, descriptor: Descriptor) {
        self.slots[index] = Some(descriptor);
    }

    /// Lowest free descriptor index.
    pub fn alloc_descriptor(&self) -> Result<usize> {
        self.slots
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::NoDescriptor)
    }

    pub fn free_descriptor(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            debug!("freed descriptor {}", index);
            *slot = None;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Descriptor)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|d| (i, d)))
    }

    pub fn serialize_to(&self, device: &mut impl BlockDevice) -> Result<()> {
        for (i, chunk) in self.slots.chunks(DESCRIPTORS_PER_BLOCK).enumerate() {
            let mut buf = [0u8; BLOCK_SIZE];
            for (j, slot) in chunk.iter().enumerate() {
                let raw = &mut buf[j * DESCRIPTOR_SIZE..(j + 1) * DESCRIPTOR_SIZE];
                match slot {
                    Some(descriptor) => descriptor.encode(raw),
                    None => raw.fill(0xff), // -1 in every field
                }
            }
            device.write_block(DESCRIPTOR_TABLE_START + i, &buf)?;
        }
        Ok(())
    }

    pub fn deserialize_from(device: &impl BlockDevice) -> Result<Self> {
        let mut table = Self::new();
        let mut buf = [0u8; BLOCK_SIZE];
        for i in 0..DESCRIPTOR_TABLE_BLOCKS {
            device.read_block(DESCRIPTOR_TABLE_START + i, &mut buf)?;
            for j in 0..DESCRIPTORS_PER_BLOCK {
                let raw = &buf[j * DESCRIPTOR_SIZE..(j + 1) * DESCRIPTOR_SIZE];
                table.slots[i * DESCRIPTORS_PER_BLOCK + j] = Descriptor::decode(raw)?;
            }
        }
        Ok(table)
    }
}

impl Default for DescriptorTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_record_encoding() {
        let mut raw = [0u8; DESCRIPTOR_SIZE];
        Descriptor::new(128, [Some(10), Some(33), None]).encode(&mut raw);
        assert_eq!(&raw[..4], &128i32.to_le_bytes());
        assert_eq!(&raw[12..], &[0xff; 4]);
        assert_eq!(
            Descriptor::decode(&raw).unwrap(),
            Some(Descriptor::new(128, [Some(10), Some(33), None]))
        );
        assert_eq!(Descriptor::decode(&[0xff; DESCRIPTOR_SIZE]).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut raw = [0u8; DESCRIPTOR_SIZE];
        raw[..4].copy_from_slice(&500i32.to_le_bytes());
        assert!(Descriptor::decode(&raw).is_err());
        raw[..4].copy_from_slice(&0i32.to_le_bytes());
        raw[4..8].copy_from_slice(&64i32.to_le_bytes());
        assert!(Descriptor::decode(&raw).is_err());
    }

    #[test]
    fn test_lowest_free_slot() {
        let mut table = DescriptorTable::new();
        table.install(0, Descriptor::directory());
        assert_eq!(table.alloc_descriptor().unwrap(), 1);
        table.install(1, Descriptor::default());
        table.install(2, Descriptor::default());
        table.free_descriptor(1);
        assert_eq!(table.alloc_descriptor().unwrap(), 1);
        for i in 1..NUM_DESCRIPTORS {
            table.install(i, Descriptor::default());
        }
        assert!(matches!(table.alloc_descriptor(), Err(FsError::NoDescriptor)));
    }
}
