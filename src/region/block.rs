//! Byte-range computation for a single chunk stored in a region file.
//!
//! An allocation entry packs `(sector_offset << 8) | sector_count`. The block
//! it points at starts with a 5-byte sub-header:
//!
//! ```text
//! [u32 BE declared length] [u8 compression tag] [compressed bytes ...]
//! ```
//!
//! The declared length counts the tag byte plus the compressed bytes.

use super::HEADER_LEN;
use crate::error::ContainerError;

/// Allocation granularity of region files.
pub const SECTOR_SIZE: u64 = 4096;

/// Declared length (4 bytes) plus compression tag (1 byte).
pub const BLOCK_HEADER_LEN: usize = 5;

/// Location of one block, derived from an allocation-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub slot: usize,
    pub offset: u64,
    pub length: u64,
}

impl BlockRef {
    /// Decodes a (host-order) allocation entry. Returns `None` for empty slots.
    pub fn from_entry(slot: usize, entry: u32) -> Option<Self> {
        let sector_offset = u64::from(entry >> 8);
        if sector_offset == 0 {
            return None;
        }
        let sector_count = u64::from(entry & 0xff);
        Some(BlockRef {
            slot,
            offset: sector_offset * SECTOR_SIZE,
            length: sector_count * SECTOR_SIZE,
        })
    }

    /// Resolves this reference against the mapped file.
    ///
    /// The range must start past the two header tables, lie entirely inside
    /// `mapped` and be large enough to hold the sub-header, otherwise
    /// `BlockOutOfBounds` is returned and nothing is read.
    pub fn extract<'a>(&self, mapped: &'a [u8], timestamp: u32) -> Result<Block<'a>, ContainerError> {
        let file_len = mapped.len() as u64;
        let end = self
            .offset
            .checked_add(self.length)
            .filter(|&end| {
                self.offset >= HEADER_LEN as u64 && end <= file_len && self.length >= BLOCK_HEADER_LEN as u64
            });
        let Some(end) = end else {
            return Err(ContainerError::BlockOutOfBounds {
                slot: self.slot,
                offset: self.offset,
                length: self.length,
                file_len,
            });
        };

        let bytes = &mapped[self.offset as usize..end as usize];
        let declared_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        Ok(Block {
            slot: self.slot,
            timestamp,
            declared_len,
            compression: bytes[4],
            payload: &bytes[BLOCK_HEADER_LEN..],
        })
    }
}

/// A validated view of one stored chunk, borrowed from the region mapping.
#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    /// Allocation-table index (0..1024).
    pub slot: usize,
    /// Last-modified Unix timestamp from the second header table.
    pub timestamp: u32,
    /// Length field of the sub-header (tag byte included). Informational.
    pub declared_len: u32,
    /// Compression tag: 1 = gzip, 2 = zlib, 3 = uncompressed.
    pub compression: u8,
    /// Everything after the sub-header up to the end of the last sector.
    pub payload: &'a [u8],
}

impl<'a> Block<'a> {
    /// Payload trimmed to the declared length when that length is plausible.
    ///
    /// Sector padding follows the compressed stream; decoders that are strict
    /// about trailing bytes should use this instead of `payload`.
    pub fn compressed(&self) -> &'a [u8] {
        let declared = self.declared_len as usize;
        if declared >= 1 && declared - 1 <= self.payload.len() {
            &self.payload[..declared - 1]
        } else {
            self.payload
        }
    }

    /// Chunk coordinates relative to the region, as `(x, z)` in `0..32`.
    pub fn local_coords(&self) -> (usize, usize) {
        (self.slot % 32, self.slot / 32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sectors(count: usize) -> Vec<u8> {
        vec![0u8; count * SECTOR_SIZE as usize]
    }

    #[test]
    fn empty_entry_is_skipped() {
        assert_eq!(BlockRef::from_entry(3, 0), None);
        // A sector count without an offset is still an empty slot.
        assert_eq!(BlockRef::from_entry(3, 0x0000_0001), None);
    }

    #[test]
    fn entry_unpacks_offset_and_size() {
        let r = BlockRef::from_entry(7, (2 << 8) | 3).unwrap();
        assert_eq!(r.slot, 7);
        assert_eq!(r.offset, 2 * 4096);
        assert_eq!(r.length, 3 * 4096);

        let wide = BlockRef::from_entry(0, 0xffff_ff01).unwrap();
        assert_eq!(wide.offset, 0x00ff_ffff * 4096);
        assert_eq!(wide.length, 4096);
    }

    #[test]
    fn extract_reads_sub_header() {
        let mut file = sectors(3);
        let base = 2 * 4096;
        file[base..base + 4].copy_from_slice(&6u32.to_be_bytes());
        file[base + 4] = 2;
        file[base + 5..base + 10].copy_from_slice(b"hello");

        let block = BlockRef::from_entry(0, (2 << 8) | 1)
            .unwrap()
            .extract(&file, 1234)
            .unwrap();
        assert_eq!(block.compression, 2);
        assert_eq!(block.declared_len, 6);
        assert_eq!(block.timestamp, 1234);
        assert_eq!(block.payload.len(), 4096 - 5);
        assert_eq!(block.compressed(), b"hello");
    }

    #[test]
    fn implausible_declared_length_falls_back_to_payload() {
        let mut file = sectors(3);
        let base = 2 * 4096;
        file[base..base + 4].copy_from_slice(&u32::MAX.to_be_bytes());
        let block = BlockRef::from_entry(0, (2 << 8) | 1)
            .unwrap()
            .extract(&file, 0)
            .unwrap();
        assert_eq!(block.compressed().len(), block.payload.len());
    }

    #[test]
    fn range_past_end_of_file_is_rejected() {
        let file = sectors(3);
        // Starts inside the file but runs two sectors past its end.
        let err = BlockRef::from_entry(9, (2 << 8) | 3)
            .unwrap()
            .extract(&file, 0)
            .unwrap_err();
        match err {
            ContainerError::BlockOutOfBounds { slot, offset, length, file_len } => {
                assert_eq!(slot, 9);
                assert_eq!(offset, 8192);
                assert_eq!(length, 3 * 4096);
                assert_eq!(file_len, 3 * 4096);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_length_block_is_rejected() {
        let file = sectors(3);
        let err = BlockRef::from_entry(1, 2 << 8).unwrap().extract(&file, 0);
        assert!(matches!(err, Err(ContainerError::BlockOutOfBounds { .. })));
    }

    #[test]
    fn block_inside_the_header_tables_is_rejected() {
        let file = sectors(4);
        // Sector 1 is the timestamp table.
        let err = BlockRef::from_entry(6, (1 << 8) | 1).unwrap().extract(&file, 0);
        assert!(matches!(
            err,
            Err(ContainerError::BlockOutOfBounds { slot: 6, offset: 4096, .. })
        ));
    }

    #[test]
    fn local_coords_follow_slot_layout() {
        let file = sectors(3);
        let block = BlockRef::from_entry(33, (2 << 8) | 1).unwrap().extract(&file, 0).unwrap();
        assert_eq!(block.local_coords(), (1, 1));
        let block = BlockRef::from_entry(1023, (2 << 8) | 1).unwrap().extract(&file, 0).unwrap();
        assert_eq!(block.local_coords(), (31, 31));
    }

    #[test]
    fn block_ending_exactly_at_eof_is_accepted() {
        let file = sectors(4);
        let block = BlockRef::from_entry(0, (2 << 8) | 2).unwrap().extract(&file, 0);
        assert!(block.is_ok());
    }
}
