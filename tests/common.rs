//! Common utilities for tests
#![allow(unused)]

use std::path::PathBuf;

use lepton::{BlockDevice, Error, ImageStore, Shell, Geometry, BLOCK_SIZE};

pub const ORANGE: &str = "\x1b[38;5;214m";
pub const RESET: &str = "\x1b[0m";

/// Provides a macro for logging messages during tests.
/// e.g. log!("placeholder") -> println!("[test] placeholder");
#[macro_export]
macro_rules! log {
    ($msg:expr) => {
        println!("{}[test] {}{}", crate::common::ORANGE, $msg, crate::common::RESET)
    };
    ($msg:expr, $($arg:tt)*) => {
        println!("{}[test] {}{}", crate::common::ORANGE, format!($msg, $($arg)*), crate::common::RESET)
    };
}

/// A flat block device with no geometry behind it.
pub struct RamDisk {
    data: Vec<u8>,
    num_blocks: usize,
}

impl RamDisk {
    /// Creates a new RamDisk with the specified number of blocks.
    /// Each block is BLOCK_SIZE bytes.
    pub fn new(num_blocks: usize) -> Self {
        RamDisk { data: vec![0u8; num_blocks * BLOCK_SIZE], num_blocks }
    }

    pub fn block(&self, block_id: usize) -> &[u8] {
        &self.data[block_id * BLOCK_SIZE..(block_id + 1) * BLOCK_SIZE]
    }
}

impl BlockDevice for RamDisk {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), Error> {
        self.check_access(block_id, buf.len())?;
        buf.copy_from_slice(self.block(block_id));
        Ok(())
    }

    fn write_block(&mut self, block_id: usize, buf: &[u8]) -> Result<(), Error> {
        self.check_access(block_id, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        self.data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}

/// An empty image directory private to one test.
pub fn temp_store(tag: &str) -> ImageStore {
    let dir: PathBuf = std::env::temp_dir().join(format!("lepton-{}-{}", tag, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    ImageStore::new(dir, "img")
}

/// Feeds `lines` to a fresh shell over `store` and returns everything it printed.
pub fn session(store: ImageStore, lines: &[&str]) -> String {
    let mut shell = Shell::new(store, Geometry::default(), Vec::new());
    shell.run(lines.join("\n").as_bytes()).unwrap();
    String::from_utf8(shell.into_output()).unwrap()
}

/// Writes an image file by hand: four geometry fields, then the byte vector,
/// all in the fixed-width little-endian layout the store uses.
pub fn write_raw_image(store: &ImageStore, name: &str, geometry: [u64; 4], bytes: &[u8]) {
    let mut raw = Vec::new();
    for field in geometry {
        raw.extend_from_slice(&field.to_le_bytes());
    }
    raw.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    raw.extend_from_slice(bytes);
    std::fs::write(store.path_of(name), raw).unwrap();
}
