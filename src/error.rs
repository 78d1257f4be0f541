use std::io;

use thiserror::Error;

/// Errors produced while opening a map file or answering a tile query.
///
/// Header failures abort [`MapFile::open`](crate::MapFile::open) entirely.
/// Failures during a tile query abort that query but leave the handle usable
/// for further queries.
#[derive(Debug, Error)]
pub enum MapFileError {
    /// Malformed header or block content, including offsets and sizes that
    /// fall outside their valid ranges.
    #[error("invalid map file format: {0}")]
    Format(String),

    /// A read would have crossed the end of the loaded byte window.
    #[error("buffer underrun: {wanted} bytes at position {position}, buffer holds {size}")]
    BufferUnderrun {
        wanted: usize,
        position: usize,
        size: usize,
    },

    /// The file declares a version or projection this reader does not handle.
    #[error("unsupported map file: {0}")]
    Unsupported(String),

    /// A block number outside the sub-file's block grid was requested.
    #[error("invalid block number {block_number}, sub-file has {number_of_blocks} blocks")]
    InvalidBlockNumber {
        block_number: u64,
        number_of_blocks: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<std::string::FromUtf8Error> for MapFileError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        MapFileError::Format(format!("invalid UTF-8 string: {err}"))
    }
}
