//! The single flat directory, stored in the data blocks of descriptor 0.
//!
//! Entries are 8 bytes: a 4-byte space-padded name followed by the
//! descriptor index as a little-endian `i32`. A zero leading byte ends the
//! list within a block.

use alloc::string::String;
use alloc::vec::Vec;

use crate::config::*;
use crate::error::FsError;
use crate::{BlockDevice, Result};

pub type FileName = [u8; FILE_NAME_LEN];

/// Right-pads `name` with spaces to `FILE_NAME_LEN` bytes.
pub fn pad_name(name: &str) -> Result<FileName> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || !bytes.iter().all(u8::is_ascii_graphic) {
        return Err(FsError::InvalidName(name.into()));
    }
    if bytes.len() > FILE_NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    let mut padded = [NAME_PAD; FILE_NAME_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(padded)
}

/// The name without its space padding.
pub fn trim_pad(name: &[u8]) -> &[u8] {
    let mut end = name.len();
    while end > 0 && name[end - 1] == NAME_PAD {
        end -= 1;
    }
    &name[..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name: FileName,
    pub descriptor: usize,
}

impl DirEntry {
    pub fn new(name: FileName, descriptor: usize) -> Self {
        Self { name, descriptor }
    }

    pub fn display_name(&self) -> String {
        String::from_utf8_lossy(trim_pad(&self.name)).into_owned()
    }

    fn encode(&self, out: &mut [u8]) {
        out[..FILE_NAME_LEN].copy_from_slice(&self.name);
        out[FILE_NAME_LEN..DIR_ENTRY_SIZE].copy_from_slice(&(self.descriptor as i32).to_le_bytes());
    }

    fn decode(raw: &[u8]) -> Result<Self> {
        let mut name = [0u8; FILE_NAME_LEN];
        name.copy_from_slice(&raw[..FILE_NAME_LEN]);
        let index = i32::from_le_bytes([
            raw[FILE_NAME_LEN],
            raw[FILE_NAME_LEN + 1],
            raw[FILE_NAME_LEN + 2],
            raw[FILE_NAME_LEN + 3],
        ]);
        if index <= DIRECTORY_DESCRIPTOR as i32 || index as usize >= NUM_DESCRIPTORS {
            return Err(FsError::InvalidImage(format!(
                "directory entry {:?} points at descriptor {}",
                String::from_utf8_lossy(&name),
                index
            )));
        }
        Ok(Self::new(name, index as usize))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directory {
    entries: Vec<DirEntry>,
}

impl Directory {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_DIR_ENTRIES
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    pub fn lookup(&self, name: &FileName) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| &entry.name == name)
            .map(|entry| entry.descriptor)
    }

    /// Appends a new entry. Names must be unique.
    pub fn add(&mut self, name: FileName, descriptor: usize) -> Result<()> {
        if self.is_full() {
            return Err(FsError::DirFull);
        }
        if self.lookup(&name).is_some() {
            return Err(FsError::AlreadyExists(
                String::from_utf8_lossy(trim_pad(&name)).into_owned(),
            ));
        }
        self.entries.push(DirEntry::new(name, descriptor));
        Ok(())
    }

    /// Removes the first entry referring to `descriptor`, keeping the order of the rest.
    pub fn remove_by_descriptor(&mut self, descriptor: usize) -> Option<DirEntry> {
        let index = self.entries.iter().position(|entry| entry.descriptor == descriptor)?;
        Some(self.entries.remove(index))
    }

    /// Writes every directory block; space past the last entry is zeroed,
    /// which leaves the terminating zero byte after it.
    pub fn serialize_to(
        &self,
        device: &mut impl BlockDevice,
        blocks: &[usize; NUM_DIRECT_PTRS],
    ) -> Result<()> {
        let mut chunks = self.entries.chunks(DIR_ENTRIES_PER_BLOCK);
        for &block_id in blocks {
            let mut buf = [0u8; BLOCK_SIZE];
            if let Some(chunk) = chunks.next() {
                for (j, entry) in chunk.iter().enumerate() {
                    entry.encode(&mut buf[j * DIR_ENTRY_SIZE..(j + 1) * DIR_ENTRY_SIZE]);
                }
            }
            device.write_block(block_id, &buf)?;
        }
        Ok(())
    }

    pub fn deserialize_from(
        device: &impl BlockDevice,
        blocks: &[usize; NUM_DIRECT_PTRS],
    ) -> Result<Self> {
        let mut directory = Self::new();
        let mut buf = [0u8; BLOCK_SIZE];
        'blocks: for &block_id in blocks {
            device.read_block(block_id, &mut buf)?;
            for raw in buf.chunks_exact(DIR_ENTRY_SIZE) {
                if raw[0] == 0 {
                    break 'blocks;
                }
                let entry = DirEntry::decode(raw)?;
                directory.add(entry.name, entry.descriptor)?;
            }
        }
        Ok(directory)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pad_name() {
        assert_eq!(&pad_name("foo").unwrap(), b"foo ");
        assert_eq!(&pad_name("abcd").unwrap(), b"abcd");
        assert!(matches!(pad_name("abcde"), Err(FsError::NameTooLong)));
        assert!(matches!(pad_name(""), Err(FsError::InvalidName(_))));
        assert!(matches!(pad_name("é"), Err(FsError::InvalidName(_))));
    }

    #[test]
    fn test_trim_pad() {
        assert_eq!(trim_pad(b"ab  "), b"ab");
        assert_eq!(trim_pad(b"abcd"), b"abcd");
        assert_eq!(trim_pad(b"    "), b"");
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut dir = Directory::new();
        dir.add(pad_name("a").unwrap(), 1).unwrap();
        dir.add(pad_name("b").unwrap(), 2).unwrap();
        dir.add(pad_name("c").unwrap(), 3).unwrap();
        assert_eq!(dir.remove_by_descriptor(2).map(|e| e.descriptor), Some(2));
        assert_eq!(dir.remove_by_descriptor(2), None);
        let names: Vec<_> = dir.entries().iter().map(DirEntry::display_name).collect();
        assert_eq!(names, ["a", "c"]);
    }
}
