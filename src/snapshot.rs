//! Whole-disk images on the host filesystem.
//! A snapshot is always the complete `Disk`; there are no partial images.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::disk::Disk;
use crate::Result;

pub const DEFAULT_EXTENSION: &str = "img";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStore {
    dir: PathBuf,
    extension: String,
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self { dir: dir.into(), extension: extension.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Host path of the image called `name`.
    pub fn path_of(&self, name: &str) -> PathBuf {
        if self.extension.is_empty() {
            self.dir.join(name)
        } else {
            self.dir.join(format!("{}.{}", name, self.extension))
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_of(name).is_file()
    }

    /// Writes the disk to `name`. The disk itself is never touched.
    pub fn save(&self, disk: &Disk, name: &str) -> Result<()> {
        let path = self.path_of(name);
        let bytes = bincode::serde::encode_to_vec(disk, bincode_config())?;
        fs::write(&path, &bytes)?;
        info!("saved disk image {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<Disk> {
        let path = self.path_of(name);
        let bytes = fs::read(&path)?;
        let (disk, used): (Disk, usize) = bincode::serde::decode_from_slice(&bytes, bincode_config())?;
        if used != bytes.len() {
            debug!("{} trailing bytes ignored in {}", bytes.len() - used, path.display());
        }
        disk.validate()?;
        info!("restored disk image {}", path.display());
        Ok(disk)
    }

    /// Deletes the image called `name`.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_of(name);
        fs::remove_file(&path)?;
        info!("dropped disk image {}", path.display());
        Ok(())
    }
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new(".", DEFAULT_EXTENSION)
    }
}
