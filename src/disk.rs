//! The simulated disk: a cylinder/track/sector/byte geometry stored as one
//! contiguous byte vector, addressed by logical block through `BlockLocator`.

use alloc::vec;
use alloc::vec::Vec;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::config::{Geometry, BLOCK_SIZE};
use crate::error::FsError;
use crate::{BlockDevice, Result};

/// Position of a single byte on the disk.
/// Created for the first byte of a logical block and advanced one byte at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocator {
    geometry: Geometry,
    pub cylinder: usize,
    pub track: usize,
    pub sector: usize,
    pub byte: usize,
}

impl BlockLocator {
    pub fn new(geometry: Geometry, block_id: usize) -> Result<Self> {
        let count = geometry.num_blocks();
        if block_id >= count {
            return Err(FsError::BlockOutOfRange { block: block_id, count });
        }

        let mut rest = block_id * BLOCK_SIZE;
        let cylinder = rest / geometry.cylinder_bytes();
        rest -= cylinder * geometry.cylinder_bytes();
        let track = rest / geometry.track_bytes();
        rest -= track * geometry.track_bytes();
        let sector = rest / geometry.sector_bytes();
        let byte = rest - sector * geometry.sector_bytes();

        Ok(Self { geometry, cylinder, track, sector, byte })
    }

    /// Offset of the current byte inside the flat storage.
    pub fn offset(&self) -> usize {
        self.cylinder * self.geometry.cylinder_bytes()
            + self.track * self.geometry.track_bytes()
            + self.sector * self.geometry.sector_bytes()
            + self.byte
    }

    /// Moves to the next byte, rolling into the next sector, track and cylinder.
    /// Wraps to the first cylinder past the end of the disk.
    pub fn next_byte(&mut self) {
        let g = self.geometry;
        self.byte += 1;
        if self.byte < g.sector_size {
            return;
        }
        self.byte = 0;
        self.sector += 1;
        if self.sector < g.sectors {
            return;
        }
        self.sector = 0;
        self.track += 1;
        if self.track < g.tracks {
            return;
        }
        self.track = 0;
        self.cylinder += 1;
        if self.cylinder >= g.cylinders {
            trace!("locator wrapped past the last cylinder");
            self.cylinder = 0;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disk {
    geometry: Geometry,
    bytes: Vec<u8>,
}

impl Disk {
    /// Creates a zeroed disk.
    pub fn new(geometry: Geometry) -> Self {
        Self { geometry, bytes: vec![0; geometry.capacity()] }
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Rejects images whose contents do not match their own geometry.
    /// Must pass before any block arithmetic runs on a loaded disk.
    pub fn validate(&self) -> Result<()> {
        let g = self.geometry;
        if g.cylinders == 0 || g.tracks == 0 || g.sectors == 0 || g.sector_size == 0 {
            return Err(FsError::InvalidImage(format!("degenerate geometry {:?}", g)));
        }
        let capacity = g
            .checked_capacity()
            .ok_or_else(|| FsError::InvalidImage(format!("geometry {:?} overflows", g)))?;
        if capacity % BLOCK_SIZE != 0 {
            return Err(FsError::InvalidImage(format!(
                "capacity {} is not a multiple of the block size",
                capacity
            )));
        }
        if self.bytes.len() != capacity {
            return Err(FsError::InvalidImage(format!(
                "expected {} bytes, found {}",
                capacity,
                self.bytes.len()
            )));
        }
        Ok(())
    }
}

impl Default for Disk {
    fn default() -> Self {
        Self::new(Geometry::default())
    }
}

impl BlockDevice for Disk {
    fn num_blocks(&self) -> usize {
        self.geometry.num_blocks()
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<()> {
        self.check_access(block_id, buf.len())?;
        let mut locator = BlockLocator::new(self.geometry, block_id)?;
        for byte in buf.iter_mut() {
            *byte = self.bytes[locator.offset()];
            locator.next_byte();
        }
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<()> {
        self.check_access(block_id, buf.len())?;
        let mut locator = BlockLocator::new(self.geometry, block_id)?;
        for &byte in buf {
            self.bytes[locator.offset()] = byte;
            locator.next_byte();
        }
        Ok(())
    }
}
