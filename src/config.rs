//! Run configuration.
//!
//! Built once at startup (see [`crate::cli`]) and shared read-only by the
//! dispatcher and all workers.

use std::path::{Path, PathBuf};

use crate::error::{Result, SignError};
use crate::format::{self, DEFAULT_PATTERN};
use crate::region::Locator;
use crate::signs::DEFAULT_MARKER;
use crate::tokenizer::Delimiter;

/// Work descriptors kept in circulation per worker thread.
pub const DESCRIPTORS_PER_WORKER: usize = 10;

/// How input tokens are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Each token is a region file path.
    Paths,
    /// Tokens come in `x z` pairs resolved under `<world>/region/`.
    World(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub delimiter: Delimiter,
    /// Directory receiving one output file per region with matches.
    pub output_dir: PathBuf,
    /// Record pattern, see [`crate::format`].
    pub pattern: Vec<u8>,
    /// First sign line that marks a sign for export.
    pub marker: String,
    pub workers: usize,
}

impl Config {
    /// Defaults: path input, whitespace delimited, legacy pattern, `#map`
    /// marker, one worker per CPU.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Config {
            source: Source::Paths,
            delimiter: Delimiter::Whitespace,
            output_dir: output_dir.into(),
            pattern: DEFAULT_PATTERN.as_bytes().to_vec(),
            marker: DEFAULT_MARKER.to_string(),
            workers: num_cpus::get(),
        }
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<Vec<u8>>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Rejects configurations that would only fail later, inside a worker.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(SignError::Config("worker count must be at least 1".into()));
        }
        format::validate(&self.pattern)?;
        Ok(())
    }

    pub fn descriptor_capacity(&self) -> usize {
        self.workers * DESCRIPTORS_PER_WORKER
    }

    pub fn world(&self) -> Option<&Path> {
        match &self.source {
            Source::World(world) => Some(world),
            Source::Paths => None,
        }
    }

    /// Region file (Anvil spelling) a locator refers to.
    pub fn region_path(&self, locator: &Locator) -> PathBuf {
        locator.region_path(self.world())
    }

    /// Output file for a unit: `signs.<x>.<z>.in`, or `signs.<stem>.in` for
    /// paths that do not follow the `r.<x>.<z>` naming.
    pub fn output_path(&self, locator: &Locator) -> PathBuf {
        let name = match (locator.coords(), locator) {
            (Some((x, z)), _) => format!("signs.{x}.{z}.in"),
            (None, Locator::Path(path)) => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "region".to_string());
                format!("signs.{stem}.in")
            }
            (None, Locator::Region { x, z }) => format!("signs.{x}.{z}.in"),
        };
        self.output_dir.join(name)
    }
}
