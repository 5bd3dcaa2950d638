//! Chunk decoding: decompression plus NBT parsing.
//!
//! The heavy lifting is done by `flate2` and `fastnbt`; this module only picks
//! the right decompressor for a block's compression tag and offers a couple of
//! tree helpers (`find`, `walk`) used by the sign filter.

use std::collections::HashMap;
use std::io::Read;

use fastnbt::Value;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::DecodeError;
use crate::region::Block;

pub const COMPRESSION_GZIP: u8 = 1;
pub const COMPRESSION_ZLIB: u8 = 2;
pub const COMPRESSION_NONE: u8 = 3;

/// NBT compound payload.
pub type Compound = HashMap<String, Value>;

/// Turns one stored block into a decoded NBT tree.
///
/// Implementations are shared by all worker threads.
pub trait ChunkDecoder: Send + Sync {
    fn decode(&self, block: &Block<'_>) -> Result<Value, DecodeError>;
}

/// The standard decoder: gzip / zlib / raw, then `fastnbt`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NbtDecoder;

impl ChunkDecoder for NbtDecoder {
    fn decode(&self, block: &Block<'_>) -> Result<Value, DecodeError> {
        let data = block.compressed();
        let raw = match block.compression {
            COMPRESSION_GZIP => inflate(GzDecoder::new(data), data.len())?,
            COMPRESSION_ZLIB => inflate(ZlibDecoder::new(data), data.len())?,
            COMPRESSION_NONE => return Ok(fastnbt::from_bytes(data)?),
            other => return Err(DecodeError::UnknownCompression(other)),
        };
        Ok(fastnbt::from_bytes(&raw)?)
    }
}

fn inflate<R: Read>(mut reader: R, size_hint: usize) -> std::io::Result<Vec<u8>> {
    // Chunk NBT usually compresses around 4-8x.
    let mut out = Vec::with_capacity(size_hint.saturating_mul(6));
    reader.read_to_end(&mut out)?;
    Ok(out)
}

/// Direct child `name` of a compound.
pub fn find<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    match value {
        Value::Compound(map) => map.get(name),
        _ => None,
    }
}

/// Pre-order traversal of `value` and everything nested in it.
pub fn walk<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(&'a Value),
{
    visit(value);
    match value {
        Value::Compound(map) => {
            for child in map.values() {
                walk(child, visit);
            }
        }
        Value::List(items) => {
            for item in items {
                walk(item, visit);
            }
        }
        _ => {}
    }
}

/// The block-entity list of a chunk.
///
/// Pre-1.18 chunks keep it under `Level.TileEntities`; newer ones store
/// `block_entities` at the root.
pub fn block_entities(root: &Value) -> Result<&[Value], DecodeError> {
    let list = find(root, "Level")
        .and_then(|level| find(level, "TileEntities"))
        .or_else(|| find(root, "block_entities"));
    match list {
        Some(Value::List(items)) => Ok(items),
        _ => Err(DecodeError::MissingEntities),
    }
}
