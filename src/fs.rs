use alloc::string::String;
use alloc::vec::Vec;

use log::{debug, info, warn};

use crate::bitmap::Bitmap;
use crate::config::*;
use crate::descriptor::{Descriptor, DescriptorTable};
use crate::directory::{pad_name, Directory};
use crate::disk::Disk;
use crate::oft::{OpenFile, OpenFileTable};
use crate::snapshot::ImageStore;
use crate::{BlockDevice, Error, Result};

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub name: String,
    pub length: usize,
}

#[derive(Debug)]
pub struct FileSystem<D: BlockDevice> {
    device: D,
    bitmap: Bitmap,
    descriptors: DescriptorTable,
    directory: Directory,
    oft: OpenFileTable,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Empty in-memory state: reserved bitmap bits, no descriptors, no
    /// entries, and only the directory slot of the OFT taken.
    fn init_fs(device: D) -> Result<Self> {
        if device.num_blocks() < DATA_START {
            return Err(Error::InvalidImage(format!(
                "device has {} blocks, metadata alone needs {}",
                device.num_blocks(),
                DATA_START
            )));
        }
        Ok(Self {
            device,
            bitmap: Bitmap::new(),
            descriptors: DescriptorTable::new(),
            directory: Directory::new(),
            oft: OpenFileTable::new(),
        })
    }

    /// Builds a fresh filesystem on `device`. Nothing is written until `sync`.
    pub fn format(device: D) -> Result<Self> {
        let mut fs = Self::init_fs(device)?;
        fs.descriptors.install(DIRECTORY_DESCRIPTOR, Descriptor::directory());
        for block_id in DIRECTORY_BLOCKS {
            fs.bitmap.set(block_id);
        }
        info!("formatted filesystem on {} blocks", fs.device.num_blocks());
        Ok(fs)
    }

    /// Loads bitmap, descriptor table and directory from `device`.
    pub fn mount(device: D) -> Result<Self> {
        let mut fs = Self::init_fs(device)?;

        let mut buf = [0u8; BLOCK_SIZE];
        fs.device.read_block(BITMAP_BLOCK, &mut buf)?;
        fs.bitmap = Bitmap::from_block(&buf);
        fs.descriptors = DescriptorTable::deserialize_from(&fs.device)?;

        let dir_blocks = fs.directory_blocks()?;
        for block_id in dir_blocks {
            fs.bitmap.set(block_id);
        }
        fs.directory = Directory::deserialize_from(&fs.device, &dir_blocks)?;
        fs.check()?;

        info!(
            "mounted filesystem: {} files, {} of {} blocks used",
            fs.directory.len(),
            fs.bitmap.used(fs.device.num_blocks()),
            fs.device.num_blocks()
        );
        Ok(fs)
    }

    /// Closes every open file and writes bitmap, descriptors and directory
    /// to the device. Returns the OFT indices that were closed.
    pub fn sync(&mut self) -> Result<Vec<usize>> {
        let open: Vec<usize> = self.oft.open_indices().collect();
        for &index in &open {
            self.close(index)?;
        }

        self.device.write_block(BITMAP_BLOCK, &self.bitmap.to_block())?;
        self.descriptors.serialize_to(&mut self.device)?;
        let dir_blocks = self.directory_blocks()?;
        self.directory.serialize_to(&mut self.device, &dir_blocks)?;
        debug!("metadata synced, closed {:?}", open);
        Ok(open)
    }

    /// Tears the mount down without syncing.
    pub fn into_device(self) -> D {
        self.device
    }

    fn directory_blocks(&self) -> Result<[usize; NUM_DIRECT_PTRS]> {
        let descriptor = self
            .descriptors
            .get(DIRECTORY_DESCRIPTOR)
            .ok_or_else(|| Error::InvalidImage("directory descriptor is free".into()))?;
        let mut blocks = [0; NUM_DIRECT_PTRS];
        for (dst, src) in blocks.iter_mut().zip(descriptor.blocks) {
            *dst = src.ok_or_else(|| Error::InvalidImage("directory block missing".into()))?;
        }
        Ok(blocks)
    }

    pub fn create(&mut self, name: &str) -> Result<()> {
        let padded = pad_name(name)?;
        if self.directory.is_full() {
            return Err(Error::DirFull);
        }
        let index = self.descriptors.alloc_descriptor()?;
        if self.directory.lookup(&padded).is_some() {
            return Err(Error::AlreadyExists(name.into()));
        }

        self.directory.add(padded, index)?;
        self.descriptors.install(index, Descriptor::default());
        debug!("created {} with descriptor {}", name, index);
        Ok(())
    }

    pub fn destroy(&mut self, name: &str) -> Result<()> {
        let index = self.resolve(name)?;
        if let Some(oft_index) = self.oft.find_open(index) {
            self.close(oft_index)?;
        }

        let descriptor = self.descriptor(index)?;
        let zero = [0u8; BLOCK_SIZE];
        for block_id in descriptor.allocated() {
            self.device.write_block(block_id, &zero)?;
            self.bitmap.free(block_id);
        }
        self.directory.remove_by_descriptor(index);
        self.descriptors.free_descriptor(index);
        debug!("destroyed {} (descriptor {})", name, index);
        Ok(())
    }

    /// Opens `name` and returns its OFT index.
    pub fn open(&mut self, name: &str) -> Result<usize> {
        let index = self.resolve(name)?;
        if self.oft.find_open(index).is_some() {
            return Err(Error::AlreadyOpen);
        }
        let oft_index = self.oft.alloc_slot().ok_or(Error::TooManyOpen)?;

        let descriptor = self.descriptor(index)?;
        let mut file = OpenFile::new(index);
        if descriptor.length > 0 {
            file.load(&self.device, &descriptor, 0)?;
        }
        self.oft.insert(oft_index, file);
        debug!("opened {} (descriptor {}) at slot {}", name, index, oft_index);
        Ok(oft_index)
    }

    /// Flushes the buffer if dirty and releases the slot.
    pub fn close(&mut self, oft_index: usize) -> Result<()> {
        let file = self.oft.get_mut(oft_index)?;
        let descriptor = self
            .descriptors
            .get(file.descriptor)
            .ok_or(Error::InvalidIndex(oft_index))?;
        if descriptor.length > 0 {
            // The buffer is written back to the block it mirrors, which is
            // the block before `position` when the cursor sits at EOF.
            file.flush(&mut self.device, descriptor)?;
        }
        self.oft.free_slot(oft_index);
        debug!("closed slot {}", oft_index);
        Ok(())
    }

    /// Moves the cursor. The buffer follows lazily on the next read or write.
    pub fn seek(&mut self, oft_index: usize, pos: usize) -> Result<usize> {
        let file = self.oft.get_mut(oft_index)?;
        let len = self
            .descriptors
            .get(file.descriptor)
            .ok_or(Error::InvalidIndex(oft_index))?
            .length;
        if pos > len {
            return Err(Error::PositionOutOfRange { pos, len });
        }
        file.position = pos;
        Ok(pos)
    }

    /// Reads up to `dst.len()` bytes from the cursor.
    /// Fails with `EmptyRead` on an empty file or at end of file.
    pub fn read(&mut self, oft_index: usize, dst: &mut [u8]) -> Result<usize> {
        let file = self.oft.get_mut(oft_index)?;
        if dst.is_empty() {
            return Ok(0);
        }
        let descriptor = self
            .descriptors
            .get_mut(file.descriptor)
            .ok_or(Error::InvalidIndex(oft_index))?;
        if descriptor.length == 0 || file.position == descriptor.length {
            return Err(Error::EmptyRead);
        }

        file.reconcile(&mut self.device, &mut self.bitmap, descriptor)?;

        let mut cursor = file.cursor();
        let mut count = 0;
        while count < dst.len() && file.position < descriptor.length {
            if cursor == BLOCK_SIZE {
                file.reconcile(&mut self.device, &mut self.bitmap, descriptor)?;
                cursor = 0;
            }
            dst[count] = file.buf[cursor];
            cursor += 1;
            count += 1;
            file.position += 1;
        }
        Ok(count)
    }

    /// Writes up to `src.len()` bytes at the cursor, growing the file one
    /// block at a time. Stops at `MAX_FILE_SIZE`.
    pub fn write(&mut self, oft_index: usize, src: &[u8]) -> Result<usize> {
        let file = self.oft.get_mut(oft_index)?;
        if src.is_empty() || file.position == MAX_FILE_SIZE {
            return Ok(0);
        }
        let descriptor = self
            .descriptors
            .get_mut(file.descriptor)
            .ok_or(Error::InvalidIndex(oft_index))?;

        file.reconcile(&mut self.device, &mut self.bitmap, descriptor)?;

        if descriptor.length == 0 {
            let block_id = self.bitmap.alloc_data_block(self.device.num_blocks())?;
            descriptor.blocks[0] = Some(block_id);
            descriptor.length += BLOCK_SIZE;
            file.buf.fill(0);
            file.buf_block = Some(0);
        }

        let mut cursor = file.cursor();
        let mut count = 0;
        for &byte in src {
            if cursor == BLOCK_SIZE {
                if !file.buf_block.is_some_and(|b| b < NUM_DIRECT_PTRS - 1) {
                    break;
                }
                match file.reconcile(&mut self.device, &mut self.bitmap, descriptor) {
                    Ok(()) => cursor = 0,
                    Err(Error::NoSpace) => {
                        warn!("disk full, short write of {} bytes", count);
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
            file.buf[cursor] = byte;
            file.dirty = true;
            cursor += 1;
            count += 1;
            file.position += 1;
        }
        Ok(count)
    }

    /// Every file with its length, in creation order.
    pub fn list(&self) -> Vec<FileStat> {
        self.directory
            .entries()
            .iter()
            .filter_map(|entry| {
                let descriptor = self.descriptors.get(entry.descriptor)?;
                Some(FileStat { name: entry.display_name(), length: descriptor.length })
            })
            .collect()
    }

    fn resolve(&self, name: &str) -> Result<usize> {
        let padded = pad_name(name)?;
        self.directory
            .lookup(&padded)
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    fn descriptor(&self, index: usize) -> Result<Descriptor> {
        self.descriptors
            .get(index)
            .copied()
            .ok_or_else(|| Error::InvalidImage(format!("descriptor {} is free", index)))
    }

    /// Verifies the cross-structure invariants: bitmap against block
    /// pointers, directory against descriptors, and OFT cursors.
    pub fn check(&self) -> Result<()> {
        let num_blocks = self.device.num_blocks().min(BITMAP_BITS);
        let mut owner: [Option<usize>; BITMAP_BITS] = [None; BITMAP_BITS];

        for (index, descriptor) in self.descriptors.iter() {
            if index != DIRECTORY_DESCRIPTOR
                && descriptor.length != descriptor.allocated().count() * BLOCK_SIZE
            {
                return Err(Error::InvalidImage(format!(
                    "descriptor {} has length {} but {} blocks",
                    index,
                    descriptor.length,
                    descriptor.allocated().count()
                )));
            }
            for block_id in descriptor.allocated() {
                if block_id >= num_blocks || (index != DIRECTORY_DESCRIPTOR && block_id < RESERVED_BLOCKS) {
                    return Err(Error::InvalidImage(format!(
                        "descriptor {} points at block {}",
                        index, block_id
                    )));
                }
                if !self.bitmap.is_set(block_id) {
                    return Err(Error::InvalidImage(format!("block {} is used but free in the bitmap", block_id)));
                }
                if let Some(other) = owner[block_id].replace(index) {
                    return Err(Error::InvalidImage(format!(
                        "block {} is shared by descriptors {} and {}",
                        block_id, other, index
                    )));
                }
            }
            if index != DIRECTORY_DESCRIPTOR
                && !self.directory.entries().iter().any(|e| e.descriptor == index)
            {
                return Err(Error::InvalidImage(format!("descriptor {} has no directory entry", index)));
            }
        }

        for block_id in RESERVED_BLOCKS..num_blocks {
            if self.bitmap.is_set(block_id) && owner[block_id].is_none() {
                return Err(Error::InvalidImage(format!("block {} is allocated but unused", block_id)));
            }
        }

        let mut seen = [false; NUM_DESCRIPTORS];
        for entry in self.directory.entries() {
            if self.descriptors.get(entry.descriptor).is_none() {
                return Err(Error::InvalidImage(format!(
                    "{} refers to free descriptor {}",
                    entry.display_name(),
                    entry.descriptor
                )));
            }
            if core::mem::replace(&mut seen[entry.descriptor], true) {
                return Err(Error::InvalidImage(format!(
                    "descriptor {} is linked twice",
                    entry.descriptor
                )));
            }
        }

        let mut open = [false; NUM_DESCRIPTORS];
        for oft_index in self.oft.open_indices() {
            let file = self.oft.get(oft_index)?;
            let length = self.descriptor(file.descriptor)?.length;
            if file.position > length || file.buf_block.is_some_and(|b| b >= NUM_DIRECT_PTRS) {
                return Err(Error::InvalidImage(format!("slot {} is out of bounds", oft_index)));
            }
            if core::mem::replace(&mut open[file.descriptor], true) {
                return Err(Error::InvalidImage(format!(
                    "descriptor {} is open twice",
                    file.descriptor
                )));
            }
        }
        Ok(())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn descriptors(&self) -> &DescriptorTable {
        &self.descriptors
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn open_file(&self, oft_index: usize) -> Result<&OpenFile> {
        self.oft.get(oft_index)
    }

    pub fn open_files(&self) -> &OpenFileTable {
        &self.oft
    }
}

impl FileSystem<Disk> {
    /// Mounts the image called `name`.
    pub fn load(store: &ImageStore, name: &str) -> Result<Self> {
        Self::mount(store.load(name)?)
    }

    /// Syncs and snapshots the whole disk to `name`.
    /// Returns the OFT indices closed by the sync.
    pub fn save(&mut self, store: &ImageStore, name: &str) -> Result<Vec<usize>> {
        let closed = self.sync()?;
        store.save(&self.device, name)?;
        info!("filesystem saved as {}", name);
        Ok(closed)
    }
}
