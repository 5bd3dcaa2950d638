use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{Config, Source};
use crate::error::{Result, SignError};
use crate::format::DEFAULT_PATTERN;
use crate::signs::DEFAULT_MARKER;
use crate::tokenizer::Delimiter;

/// Exports `#map` signs from Minecraft region files.
///
/// Units of work are read from standard input: region file paths by default,
/// or `x z` region coordinate pairs when `--world` is given. Every region with
/// at least one map sign gets `<OUTPUT_DIR>/signs.<x>.<z>.in`.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory receiving the per-region output files. Created if missing.
    pub output: PathBuf,

    /// Read `x z` coordinate pairs and resolve them under `<WORLD>/region/`.
    #[arg(long, value_name = "WORLD")]
    pub world: Option<PathBuf>,

    /// Input items are separated by NUL bytes instead of whitespace.
    #[arg(short = '0', long)]
    pub null: bool,

    /// Number of worker threads. [0 = one per CPU core]
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Record pattern. Directives: %x %y %z, %1..%4 for sign lines, %% for a
    /// literal percent. `\n`, `\t` and `\\` are unescaped.
    #[arg(short, long, value_name = "PATTERN")]
    pub format: Option<String>,

    /// First sign line that marks a sign for export.
    #[arg(long, default_value = DEFAULT_MARKER)]
    pub marker: String,

    /// More logging (repeatable).
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Default log level selected by `-v` / `-q`.
    pub fn log_level(&self) -> tracing::Level {
        match (self.quiet, self.verbose) {
            (true, _) => tracing::Level::ERROR,
            (false, 0) => tracing::Level::INFO,
            (false, 1) => tracing::Level::DEBUG,
            (false, _) => tracing::Level::TRACE,
        }
    }

    /// Builds the run configuration. The pattern is validated here so a bad
    /// `--format` fails before any input is read.
    pub fn into_config(self) -> Result<Config> {
        let workers = if self.jobs == 0 { num_cpus::get() } else { self.jobs };
        let pattern = match &self.format {
            Some(raw) => unescape(raw)?,
            None => DEFAULT_PATTERN.as_bytes().to_vec(),
        };
        let source = match self.world {
            Some(world) => Source::World(world),
            None => Source::Paths,
        };
        let delimiter = if self.null { Delimiter::Nul } else { Delimiter::Whitespace };

        let config = Config::new(self.output)
            .with_source(source)
            .with_delimiter(delimiter)
            .with_pattern(pattern)
            .with_marker(self.marker)
            .with_workers(workers);
        config.validate()?;
        Ok(config)
    }
}

/// Replaces `\n`, `\t` and `\\` in a command-line pattern.
pub fn unescape(raw: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut bytes = raw.bytes();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        match bytes.next() {
            Some(b'n') => out.push(b'\n'),
            Some(b't') => out.push(b'\t'),
            Some(b'\\') => out.push(b'\\'),
            Some(other) => {
                return Err(SignError::Config(format!(
                    "unsupported escape `\\{}` in format",
                    char::from(other)
                )))
            }
            None => return Err(SignError::Config("format ends with a lone `\\`".into())),
        }
    }
    Ok(out)
}
