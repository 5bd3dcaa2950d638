//! # Region files
//!
//! A region file stores up to 1024 chunks. Its layout is:
//!
//! 1.  **Locations** (4096 bytes): 1024 big-endian `u32`, each packing the
//!     chunk's sector offset (high 24 bits) and sector count (low 8 bits).
//!     An offset of zero marks an empty slot.
//! 2.  **Timestamps** (4096 bytes): 1024 big-endian `u32` Unix timestamps.
//! 3.  **Sectors**: 4096-byte aligned chunk blocks, see [`block`].
//!
//! Two naming dialects exist: `.mca` (Anvil) and the older `.mcr`. Opening
//! tries the Anvil name first and falls back to the classic one.

pub mod block;

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::ContainerError;
pub use block::{Block, BlockRef, SECTOR_SIZE};

/// Number of slots in each header table.
pub const ENTRY_COUNT: usize = 1024;

/// Size in bytes of one header table.
pub const TABLE_LEN: usize = ENTRY_COUNT * 4;

/// Locations + timestamps.
pub const HEADER_LEN: usize = 2 * TABLE_LEN;

/// On-disk dialect, selected by which file name resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFormat {
    /// `.mcr`
    Classic,
    /// `.mca`
    Anvil,
}

/// What a unit of work points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Region coordinates, resolved against a world directory.
    Region { x: i32, z: i32 },
    /// An explicit region file path.
    Path(PathBuf),
}

impl Locator {
    /// The preferred (Anvil) file name for this locator.
    pub fn region_path(&self, world: Option<&Path>) -> PathBuf {
        match self {
            Locator::Region { x, z } => world
                .unwrap_or_else(|| Path::new("."))
                .join("region")
                .join(format!("r.{x}.{z}.mca")),
            Locator::Path(path) => path.clone(),
        }
    }

    /// Region coordinates, either given directly or parsed from an
    /// `r.<x>.<z>.mc[ar]` file name.
    pub fn coords(&self) -> Option<(i32, i32)> {
        match self {
            Locator::Region { x, z } => Some((*x, *z)),
            Locator::Path(path) => {
                let name = path.file_name()?.to_str()?;
                let mut parts = name.split('.');
                if parts.next()? != "r" {
                    return None;
                }
                let x = parts.next()?.parse().ok()?;
                let z = parts.next()?.parse().ok()?;
                match (parts.next()?, parts.next()) {
                    ("mca" | "mcr", None) => Some((x, z)),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Region { x, z } => write!(f, "region {x} {z}"),
            Locator::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// An open, memory-mapped region file.
///
/// Block views handed out by [`RegionFile::blocks`] borrow the region, so
/// they cannot outlive [`RegionFile::close`].
pub struct RegionFile {
    path: PathBuf,
    format: RegionFormat,
    locations: Box<[u32; ENTRY_COUNT]>,
    timestamps: Box<[u32; ENTRY_COUNT]>,
    mmap: Mmap,
    // Held for the lifetime of the mapping.
    _file: File,
}

impl RegionFile {
    /// Opens `path`, trying the `.mca` spelling first and then `.mcr`.
    ///
    /// Paths that end in neither extension are opened as given and treated
    /// as Anvil.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let mut tried = Vec::with_capacity(2);

        for (candidate, format) in candidates(path) {
            match File::open(&candidate) {
                Ok(file) => {
                    debug!(path = %candidate.display(), ?format, "opened region");
                    return Self::from_file(file, candidate, format);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %candidate.display(), "no such region file");
                    tried.push(candidate);
                }
                Err(source) => {
                    return Err(ContainerError::Io {
                        source,
                        path: candidate,
                    })
                }
            }
        }

        Err(ContainerError::NotFound { tried })
    }

    fn from_file(mut file: File, path: PathBuf, format: RegionFormat) -> Result<Self, ContainerError> {
        let io_err = |source: io::Error, path: &Path| ContainerError::Io {
            source,
            path: path.to_path_buf(),
        };

        let mut header = vec![0u8; HEADER_LEN];
        if let Err(e) = file.read_exact(&mut header) {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                let len = file.metadata().map(|m| m.len()).unwrap_or(0);
                return Err(ContainerError::ShortRead {
                    path,
                    len,
                    needed: HEADER_LEN as u64,
                });
            }
            return Err(io_err(e, &path));
        }
        let locations = decode_table(&header[..TABLE_LEN]);
        let timestamps = decode_table(&header[TABLE_LEN..]);

        // SAFETY: read-only mapping. Truncation by another process while the
        // map is alive is not guarded against.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_err(e, &path))?;

        Ok(RegionFile {
            path,
            format,
            locations,
            timestamps,
            mmap,
            _file: file,
        })
    }

    /// Unmaps the file and releases its handle.
    pub fn close(self) {
        debug!(path = %self.path.display(), "closing region");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> RegionFormat {
        self.format
    }

    /// Length of the mapped file in bytes.
    pub fn mapped_len(&self) -> u64 {
        self.mmap.len() as u64
    }

    /// Number of non-empty allocation slots.
    pub fn chunk_count(&self) -> usize {
        (0..ENTRY_COUNT)
            .filter(|&slot| BlockRef::from_entry(slot, self.locations[slot]).is_some())
            .count()
    }

    /// Iterates non-empty slots in ascending slot order.
    ///
    /// Slots whose range does not fit in the file yield
    /// [`ContainerError::BlockOutOfBounds`]; iteration carries on after them.
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            region: self,
            slot: 0,
        }
    }

    /// Visitor form of [`RegionFile::blocks`].
    pub fn for_each_block<F>(&self, mut visit: F)
    where
        F: FnMut(Result<Block<'_>, ContainerError>),
    {
        for block in self.blocks() {
            visit(block);
        }
    }
}

impl fmt::Debug for RegionFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionFile")
            .field("path", &self.path)
            .field("format", &self.format)
            .field("len", &self.mmap.len())
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over the stored blocks of a [`RegionFile`].
pub struct Blocks<'a> {
    region: &'a RegionFile,
    slot: usize,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = Result<Block<'a>, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < ENTRY_COUNT {
            let slot = self.slot;
            self.slot += 1;
            if let Some(block_ref) = BlockRef::from_entry(slot, self.region.locations[slot]) {
                return Some(block_ref.extract(&self.region.mmap, self.region.timestamps[slot]));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(ENTRY_COUNT - self.slot))
    }
}

/// File names to try, in preference order.
fn candidates(path: &Path) -> Vec<(PathBuf, RegionFormat)> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mca") | Some("mcr") => vec![
            (path.with_extension("mca"), RegionFormat::Anvil),
            (path.with_extension("mcr"), RegionFormat::Classic),
        ],
        _ => vec![(path.to_path_buf(), RegionFormat::Anvil)],
    }
}

fn decode_table(bytes: &[u8]) -> Box<[u32; ENTRY_COUNT]> {
    let mut table = Box::new([0u32; ENTRY_COUNT]);
    for (dst, word) in table.iter_mut().zip(bytes.chunks_exact(4)) {
        *dst = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// Lays chunks out back to back starting at sector 2.
    fn build_region(chunks: &[(usize, &[u8])]) -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];
        let mut sector = 2u32;
        for &(slot, body) in chunks {
            let needed = body.len() + block::BLOCK_HEADER_LEN;
            let count = needed.div_ceil(SECTOR_SIZE as usize) as u32;
            let entry = (sector << 8) | count;
            out[slot * 4..slot * 4 + 4].copy_from_slice(&entry.to_be_bytes());
            let ts = 1_600_000_000u32 + slot as u32;
            out[TABLE_LEN + slot * 4..TABLE_LEN + slot * 4 + 4].copy_from_slice(&ts.to_be_bytes());

            let start = out.len();
            out.extend_from_slice(&(body.len() as u32 + 1).to_be_bytes());
            out.push(3);
            out.extend_from_slice(body);
            out.resize(start + count as usize * SECTOR_SIZE as usize, 0);
            sector += count;
        }
        out
    }

    fn set_entry(bytes: &mut [u8], slot: usize, entry: u32) {
        bytes[slot * 4..slot * 4 + 4].copy_from_slice(&entry.to_be_bytes());
    }

    #[test]
    fn prefers_anvil_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("r.0.0.mca"), build_region(&[(0, b"anvil")])).unwrap();
        fs::write(dir.path().join("r.0.0.mcr"), build_region(&[(0, b"classic")])).unwrap();

        let region = RegionFile::open(dir.path().join("r.0.0.mca")).unwrap();
        assert_eq!(region.format(), RegionFormat::Anvil);
        let block = region.blocks().next().unwrap().unwrap();
        assert_eq!(block.compressed(), b"anvil");
    }

    #[test]
    fn falls_back_to_classic_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("r.1.-2.mcr"), build_region(&[(5, b"old")])).unwrap();

        let region = RegionFile::open(dir.path().join("r.1.-2.mca")).unwrap();
        assert_eq!(region.format(), RegionFormat::Classic);
        assert!(region.path().ends_with("r.1.-2.mcr"));
        assert_eq!(region.chunk_count(), 1);
    }

    #[test]
    fn missing_region_lists_both_names() {
        let dir = tempdir().unwrap();
        let err = RegionFile::open(dir.path().join("r.9.9.mca")).unwrap_err();
        match err {
            ContainerError::NotFound { tried } => {
                assert_eq!(tried.len(), 2);
                assert!(tried[0].ends_with("r.9.9.mca"));
                assert!(tried[1].ends_with("r.9.9.mcr"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncated_header_is_a_short_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        fs::write(&path, vec![0u8; 5000]).unwrap();
        let err = RegionFile::open(&path).unwrap_err();
        assert!(matches!(err, ContainerError::ShortRead { len: 5000, .. }), "{err}");
    }

    #[test]
    fn blocks_visit_occupied_slots_in_slot_order() {
        // Physical order differs from slot order on purpose.
        let bytes = build_region(&[(1023, b"last"), (0, b"first"), (512, b"middle")]);
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        fs::write(&path, bytes).unwrap();

        let region = RegionFile::open(&path).unwrap();
        let mut seen = Vec::new();
        region.for_each_block(|block| {
            let block = block.unwrap();
            seen.push((block.slot, block.compressed().to_vec(), block.timestamp));
        });
        assert_eq!(
            seen,
            vec![
                (0, b"first".to_vec(), 1_600_000_000),
                (512, b"middle".to_vec(), 1_600_000_512),
                (1023, b"last".to_vec(), 1_600_001_023),
            ]
        );
        region.close();
    }

    #[test]
    fn out_of_range_entry_is_reported_and_skipped() {
        let mut bytes = build_region(&[(2, b"ok"), (4, b"also ok")]);
        // Slot 3 points far beyond the end of the file.
        set_entry(&mut bytes, 3, (0x00ff_0000 << 8) | 1);
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        fs::write(&path, bytes).unwrap();

        let region = RegionFile::open(&path).unwrap();
        let results: Vec<_> = region.blocks().collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().slot, 2);
        assert!(matches!(
            results[1],
            Err(ContainerError::BlockOutOfBounds { slot: 3, .. })
        ));
        assert_eq!(results[2].as_ref().unwrap().slot, 4);
    }

    #[test]
    fn header_only_region_has_no_blocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.0.0.mca");
        fs::write(&path, vec![0u8; HEADER_LEN]).unwrap();
        let region = RegionFile::open(&path).unwrap();
        assert_eq!(region.mapped_len(), HEADER_LEN as u64);
        assert_eq!(region.chunk_count(), 0);
        assert_eq!(region.blocks().count(), 0);
    }

    #[test]
    fn locator_coordinates() {
        assert_eq!(Locator::Region { x: -1, z: 4 }.coords(), Some((-1, 4)));
        assert_eq!(Locator::Path("w/region/r.3.-7.mcr".into()).coords(), Some((3, -7)));
        assert_eq!(Locator::Path("w/region/r.3.mca".into()).coords(), None);
        assert_eq!(Locator::Path("w/region/x.3.4.mca".into()).coords(), None);
        assert_eq!(Locator::Path("w/region/r.3.4.dat".into()).coords(), None);

        let path = Locator::Region { x: 2, z: -3 }.region_path(Some(Path::new("world")));
        assert_eq!(path, Path::new("world/region/r.2.-3.mca"));
    }
}
