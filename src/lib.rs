//! Lepton is a tiny single-directory file system over a simulated disk.
//! No nested directories, permissions, or timestamps; files hold at most
//! three direct blocks.
//!
//! Lepton's linear layout (64-byte blocks):
//! - Block 0: Free-space bitmap
//! - Blocks 1..=6: Descriptor table (24 descriptors)
//! - Blocks 7..=9: Directory (data blocks of descriptor 0)
//! - Blocks 10..: Data blocks
//!
//! Lepton's layers (from bottom to top):
//! 1. Disk: cylinder/track/sector geometry behind a `BlockDevice`.        | Snapshot to host image files
//! 2. Bitmap / Descriptors / Directory: metadata kept in memory.          | Serialised on sync
//! 3. Open file table: per-file cursor and one-block write-back buffer.   | Flushed on close
//! 4. FileSystem: create, destroy, open, close, read, write, seek, list.  |
//! 5. Shell: the text command interface.                                  | Binary `lepton`

extern crate alloc;

mod config;
mod block_dev;
mod disk;
mod snapshot;
mod bitmap;
mod descriptor;
mod directory;
mod oft;
mod fs;
mod error;
mod shell;

pub use block_dev::BlockDevice;
pub use config::*;
pub use disk::*;
pub use snapshot::*;
pub use bitmap::*;
pub use descriptor::*;
pub use directory::*;
pub use oft::*;
pub use fs::*;
pub use shell::*;
pub use error::{status, STATUS_ERR, STATUS_OK};
pub use error::FsError as Error;
pub use error::Result;
