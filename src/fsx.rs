//! Output-file helpers.
//!
//! Each unit of work owns exactly one output path. The file is only created
//! once the first record is ready, and a unit that ends up with no records
//! removes whatever an earlier run left at that path, so re-runs over
//! unchanged input converge on the same set of files.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::SignError;

/// Creates the output directory (and parents) if needed.
pub fn ensure_dir(path: &Path) -> Result<(), SignError> {
    fs::create_dir_all(path).map_err(|source| SignError::Io {
        source,
        path: path.to_path_buf(),
    })
}

/// Removes `path`; a file that is already gone is not an error.
///
/// Returns whether something was removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Output file created on first use.
#[derive(Debug)]
pub struct LazyOutput {
    path: PathBuf,
    file: Option<File>,
}

impl LazyOutput {
    pub fn new(path: PathBuf) -> Self {
        LazyOutput { path, file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The open file, truncating or creating it on the first call.
    pub fn get(&mut self) -> Result<&mut File, SignError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => {
                let file = File::create(&self.path).map_err(|source| SignError::Io {
                    source,
                    path: self.path.clone(),
                })?;
                debug!(path = %self.path.display(), "created output file");
                file
            }
        };
        Ok(self.file.insert(file))
    }

    /// Closes the file, or deletes a stale one if nothing was written.
    pub fn finish(self) -> Result<(), SignError> {
        match self.file {
            Some(file) => {
                drop(file);
                Ok(())
            }
            None => match remove_if_exists(&self.path) {
                Ok(true) => {
                    debug!(path = %self.path.display(), "removed stale output file");
                    Ok(())
                }
                Ok(false) => Ok(()),
                Err(source) => Err(SignError::Io {
                    source,
                    path: self.path,
                }),
            },
        }
    }
}
