use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening a region file or walking its allocation table.
#[derive(Error, Debug)]
pub enum ContainerError {
    /// None of the candidate file names (`.mca`, then `.mcr`) exist.
    #[error("region file not found (tried {})", display_paths(.tried))]
    NotFound { tried: Vec<PathBuf> },

    /// Open, stat or mmap failed for a reason other than a missing file.
    #[error("I/O error on region '{}': {source}", .path.display())]
    Io { source: io::Error, path: PathBuf },

    /// The file ends before the two 4 KiB header tables.
    #[error("region '{}' is truncated: {len} bytes, header needs {needed}", .path.display())]
    ShortRead { path: PathBuf, len: u64, needed: u64 },

    /// An allocation entry points outside of the mapped file.
    #[error("slot {slot}: block [{offset}, {offset}+{length}) exceeds file length {file_len}")]
    BlockOutOfBounds {
        slot: usize,
        offset: u64,
        length: u64,
        file_len: u64,
    },
}

/// Errors from turning one block payload into an NBT tree.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("unknown chunk compression tag {0}")]
    UnknownCompression(u8),

    #[error("decompression failed: {0}")]
    Decompress(#[from] io::Error),

    #[error("malformed NBT: {0}")]
    Nbt(#[from] fastnbt::error::Error),

    #[error("chunk has no block entity list")]
    MissingEntities,
}

/// Errors from the record formatter.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("unknown format directive '%{}'", directive_char(.0))]
    UnknownDirective(u8),

    #[error("format string ends with a lone '%'")]
    DanglingPercent,

    #[error("sign entity has no '{0}' field")]
    MissingField(&'static str),

    #[error("sign field '{name}' is not {expected}")]
    FieldType {
        name: &'static str,
        expected: &'static str,
    },

    #[error("rendered field is {len} bytes, too wide for the {capacity}-byte staging buffer")]
    FieldTooWide { len: usize, capacity: usize },

    #[error("write to output failed: {0}")]
    Sink(#[source] io::Error),
}

/// The primary error type for a whole run.
#[derive(Error, Debug)]
pub enum SignError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Format(#[from] FormatError),

    /// I/O on a path we own (output files, directories).
    #[error("I/O error on path '{}': {source}", .path.display())]
    Io { source: io::Error, path: PathBuf },

    /// Reading standard input failed.
    #[error("reading input failed: {0}")]
    Input(#[source] io::Error),

    /// A token could not be turned into a unit of work.
    #[error("invalid input token '{0}'")]
    InvalidInput(String),

    /// The worker pool could not be created or fed.
    #[error("worker pool failure: {0}")]
    Pool(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SignError>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("'{}'", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn directive_char(byte: &u8) -> char {
    char::from(*byte)
}
