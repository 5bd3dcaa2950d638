//! Processing of one unit of work: a single region file.

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::Result;
use crate::format::RecordFormatter;
use crate::fsx::LazyOutput;
use crate::nbt::ChunkDecoder;
use crate::progress::RunMetrics;
use crate::region::{Locator, RegionFile};
use crate::signs::{SignFilter, SignRecord};

/// How a unit ended when it did not hit a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// The region could not be opened; nothing was written or removed.
    Skipped,
    /// The region was scanned; `records` records were written.
    Done { records: u64 },
}

/// Everything a worker needs besides the locator. Shared by reference.
pub struct UnitContext<'a, D: ?Sized> {
    pub config: &'a Config,
    pub decoder: &'a D,
    pub filter: &'a SignFilter,
    pub metrics: &'a RunMetrics,
}

/// Scans one region and writes its map signs.
///
/// Open failures and per-chunk problems are logged and tolerated. Errors
/// returned from here (output file creation, formatting, writes) are fatal
/// for the whole run.
pub fn process_unit<D>(ctx: &UnitContext<'_, D>, locator: &Locator, formatter: &mut RecordFormatter) -> Result<UnitOutcome>
where
    D: ChunkDecoder + ?Sized,
{
    let mut output = LazyOutput::new(ctx.config.output_path(locator));

    let region = match RegionFile::open(ctx.config.region_path(locator)) {
        Ok(region) => region,
        Err(e) => {
            warn!(unit = %locator, error = %e, "skipping region");
            ctx.metrics.record_skipped();
            return Ok(UnitOutcome::Skipped);
        }
    };

    debug!(
        unit = %locator,
        path = %region.path().display(),
        bytes = region.mapped_len(),
        chunks = region.chunk_count(),
        "scanning region"
    );

    let mut records = 0u64;
    for block in region.blocks() {
        let block = match block {
            Ok(block) => block,
            Err(e) => {
                warn!(unit = %locator, error = %e, "skipping chunk");
                ctx.metrics.record_bad_block();
                continue;
            }
        };
        debug!(
            unit = %locator,
            slot = block.slot,
            local = ?block.local_coords(),
            timestamp = block.timestamp,
            compression = block.compression,
            len = block.payload.len(),
            "chunk"
        );

        let chunk = match ctx.decoder.decode(&block) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(unit = %locator, slot = block.slot, error = %e, "could not decode chunk");
                ctx.metrics.record_bad_block();
                continue;
            }
        };
        let signs = match ctx.filter.matches(&chunk) {
            Ok(signs) => signs,
            Err(e) => {
                warn!(unit = %locator, slot = block.slot, error = %e, "unexpected chunk layout");
                continue;
            }
        };

        for sign in signs {
            let file = output.get()?;
            formatter.format_record(&ctx.config.pattern, &SignRecord::new(sign), file)?;
            records += 1;
        }
    }

    if records > 0 {
        debug!(unit = %locator, output = %output.path().display(), "output written");
    }
    output.finish()?;
    region.close();

    ctx.metrics.record_completed(records);
    Ok(UnitOutcome::Done { records })
}
