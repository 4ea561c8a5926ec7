use serde::{Deserialize, Serialize};

pub const BLOCK_SIZE: usize = 64;

pub const NUM_DESCRIPTORS: usize = 24;
pub const DESCRIPTOR_SIZE: usize = 16; // length + 3 block pointers, 4 bytes each
pub const DESCRIPTORS_PER_BLOCK: usize = BLOCK_SIZE / DESCRIPTOR_SIZE;
pub const DESCRIPTOR_TABLE_START: usize = 1;
pub const DESCRIPTOR_TABLE_BLOCKS: usize = NUM_DESCRIPTORS / DESCRIPTORS_PER_BLOCK;
pub const DIRECTORY_DESCRIPTOR: usize = 0; // Descriptor of the directory file itself

pub const NUM_DIRECT_PTRS: usize = 3;
pub const MAX_FILE_SIZE: usize = NUM_DIRECT_PTRS * BLOCK_SIZE;

pub const FILE_NAME_LEN: usize = 4;
pub const DIR_ENTRY_SIZE: usize = FILE_NAME_LEN + 4; // name + descriptor index
pub const DIR_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE;
pub const MAX_DIR_ENTRIES: usize = NUM_DESCRIPTORS - 1;
pub const NAME_PAD: u8 = b' ';

pub const OFT_SIZE: usize = 4; // Slot 0 belongs to the directory

pub const BITMAP_BLOCK: usize = 0;
pub const BITMAP_BITS: usize = 64;
pub const RESERVED_BLOCKS: usize = 8; // Blocks [0, 8) are never handed out
pub const DIRECTORY_BLOCKS: [usize; NUM_DIRECT_PTRS] = [
    DESCRIPTOR_TABLE_START + DESCRIPTOR_TABLE_BLOCKS,
    DESCRIPTOR_TABLE_START + DESCRIPTOR_TABLE_BLOCKS + 1,
    DESCRIPTOR_TABLE_START + DESCRIPTOR_TABLE_BLOCKS + 2,
];
pub const DATA_START: usize = DIRECTORY_BLOCKS[NUM_DIRECT_PTRS - 1] + 1;

/// Physical shape of the simulated disk.
/// Bytes are addressed cylinder-major: a block starts at `n * BLOCK_SIZE`
/// and rolls over sector, track and cylinder boundaries as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Geometry {
    pub cylinders: usize,
    pub tracks: usize,  // per cylinder
    pub sectors: usize, // per track
    pub sector_size: usize,
}

impl Geometry {
    pub const fn new(cylinders: usize, tracks: usize, sectors: usize, sector_size: usize) -> Self {
        Self { cylinders, tracks, sectors, sector_size }
    }

    pub const fn sector_bytes(&self) -> usize {
        self.sector_size
    }

    pub const fn track_bytes(&self) -> usize {
        self.sectors * self.sector_bytes()
    }

    pub const fn cylinder_bytes(&self) -> usize {
        self.tracks * self.track_bytes()
    }

    /// Total capacity in bytes.
    pub const fn capacity(&self) -> usize {
        self.cylinders * self.cylinder_bytes()
    }

    /// `capacity` for geometries read from untrusted images; `None` on overflow.
    pub const fn checked_capacity(&self) -> Option<usize> {
        match self.sector_size.checked_mul(self.sectors) {
            Some(track) => match track.checked_mul(self.tracks) {
                Some(cylinder) => cylinder.checked_mul(self.cylinders),
                None => None,
            },
            None => None,
        }
    }

    pub const fn num_blocks(&self) -> usize {
        self.capacity() / BLOCK_SIZE
    }
}

impl Default for Geometry {
    /// 4 cylinders, 2 tracks, 8 sectors of 64 bytes: 4 KiB, 64 logical blocks.
    fn default() -> Self {
        Self::new(4, 2, 8, 64)
    }
}
