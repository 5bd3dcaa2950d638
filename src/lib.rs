//! # mcsign
//!
//! Extracts "map signs" from Minecraft region files: signs whose first line is
//! a marker (`#map` by default). Each region with matches produces one output
//! file holding one formatted record per sign.
//!
//! ## Key Modules
//!
//! - [`region`]: memory-mapped region files and bounds-checked chunk blocks.
//! - [`nbt`]: chunk decompression and NBT decoding.
//! - [`signs`]: map-sign recognition.
//! - [`format`]: the `%`-directive record formatter.
//! - [`tokenizer`]: streaming input tokenizer.
//! - [`workers`]: the dispatcher and the bounded worker pool.
//!
//! ## Examples
//!
//! ```no_run
//! use mcsign::{workers, Config, NbtDecoder, Source};
//!
//! let config = Config::new("out").with_source(Source::World("world".into()));
//! let summary = workers::run(&config, std::io::stdin().lock(), &NbtDecoder)?;
//! println!("{} records", summary.records);
//! # Ok::<(), mcsign::SignError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod fsx;
pub mod logging;
pub mod nbt;
pub mod progress;
pub mod region;
pub mod signs;
pub mod tokenizer;
pub mod workers;

pub use config::{Config, Source};
pub use error::SignError;
pub use nbt::{ChunkDecoder, NbtDecoder};
pub use progress::RunSummary;
