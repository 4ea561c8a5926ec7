use thiserror::Error;

use crate::config::FILE_NAME_LEN;

/// Status code handed to callers that still expect integer sentinels.
pub const STATUS_OK: i32 = 1;
pub const STATUS_ERR: i32 = -3;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("File name must be at most {} bytes long", FILE_NAME_LEN)]
    NameTooLong,

    #[error("File name {0:?} is not a printable ASCII name")]
    InvalidName(String),

    #[error("{0}")]
    InvalidArgument(&'static str),

    #[error("No disk is mounted")]
    NotMounted,

    #[error("Open file index {0} does not exist")]
    InvalidIndex(usize),

    #[error("No such file {0}")]
    NotFound(String),

    #[error("File {0} already exists")]
    AlreadyExists(String),

    #[error("File has been already opened.")]
    AlreadyOpen,

    #[error("Too many open files")]
    TooManyOpen,

    #[error("No more files can be created")]
    NoDescriptor,

    #[error("No free data blocks left on disk")]
    NoSpace,

    #[error("Directory is full")]
    DirFull,

    #[error("File is empty")]
    EmptyRead,

    #[error("Pos value overflow {pos} of [0..{len}]")]
    PositionOutOfRange { pos: usize, len: usize },

    #[error("Block {block} is out of range [0..{count})")]
    BlockOutOfRange { block: usize, count: usize },

    #[error("Block buffer must be exactly {expected} bytes, got {got}")]
    BadBufferSize { expected: usize, got: usize },

    #[error("Invalid disk image: {0}")]
    InvalidImage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode disk image: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Failed to decode disk image: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

impl FsError {
    /// True for failures of the host side (image files), as opposed to
    /// failures of the filesystem logic.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Encode(_) | Self::Decode(_))
    }
}

pub type Result<T> = core::result::Result<T, FsError>;

/// Collapses a result to the legacy `1` / `-3` status pair.
pub fn status<T>(result: &Result<T>) -> i32 {
    match result {
        Ok(_) => STATUS_OK,
        Err(_) => STATUS_ERR,
    }
}
