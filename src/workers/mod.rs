//! Bounded worker pool.
//!
//! The calling thread is the dispatcher: it pulls units from the tokenizer,
//! loads each into a [`WorkDescriptor`] drawn from a fixed [`DescriptorPool`]
//! and sends it over a bounded channel to N scoped worker threads. A worker
//! hands the descriptor back as soon as it has taken the locator out, then
//! does the (slow) region I/O. When every descriptor is out, the dispatcher
//! blocks, so at most `10 * N` units are ever queued.
//!
//! A panic while processing a unit is a fatal error like any other. When the
//! last worker exits for whatever reason, the pool is closed so a dispatcher
//! waiting for a descriptor gives up instead of waiting forever.

mod pool;
mod unit;

pub use pool::{DescriptorPool, WorkDescriptor};
pub use unit::{process_unit, UnitContext, UnitOutcome};

use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

use crossbeam_channel::{bounded, Receiver, SendError, Sender};
use tracing::{debug, error, info, warn};

use crate::config::{Config, Source};
use crate::error::{Result, SignError};
use crate::format::RecordFormatter;
use crate::nbt::ChunkDecoder;
use crate::progress::{RunMetrics, RunSummary};
use crate::region::Locator;
use crate::signs::SignFilter;
use crate::tokenizer::Tokenizer;

/// First fatal error raised by any thread; once set, no new units start.
#[derive(Debug, Default)]
struct AbortSignal {
    tripped: AtomicBool,
    first: Mutex<Option<SignError>>,
}

impl AbortSignal {
    fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    fn trip(&self, err: SignError) {
        let mut first = self.first.lock().unwrap_or_else(PoisonError::into_inner);
        if first.is_none() {
            error!(error = %err, "fatal error, stopping");
            *first = Some(err);
        }
        self.tripped.store(true, Ordering::Release);
    }

    fn into_error(self) -> Option<SignError> {
        self.first.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Runs the whole pipeline over `input` and returns the run counters.
///
/// Fails on the first fatal error (bad configuration, pool failure, unreadable
/// input, output write failure, malformed sign). Regions that cannot be
/// opened only show up in [`RunSummary::skipped`].
pub fn run<R, D>(config: &Config, input: R, decoder: &D) -> Result<RunSummary>
where
    R: Read,
    D: ChunkDecoder + ?Sized,
{
    config.validate()?;

    let pool = DescriptorPool::new(config.descriptor_capacity());
    let metrics = RunMetrics::new();
    let abort = AbortSignal::default();
    let live = AtomicUsize::new(0);
    let filter = SignFilter::new(config.marker.clone());
    let ctx = UnitContext {
        config,
        decoder,
        filter: &filter,
        metrics: &metrics,
    };

    info!(workers = config.workers, descriptors = pool.capacity(), "starting");
    let (sender, receiver) = bounded::<WorkDescriptor>(pool.capacity());

    thread::scope(|s| {
        // Owned here so every exit path closes the channel before the scope
        // joins the workers.
        let sender = sender;
        for id in 0..config.workers {
            let receiver = receiver.clone();
            let exit = WorkerExit {
                live: &live,
                pool: &pool,
                abort: &abort,
            };
            live.fetch_add(1, Ordering::AcqRel);
            let ctx = &ctx;
            let spawned = thread::Builder::new()
                .name(format!("mcsign-worker-{id}"))
                .spawn_scoped(s, move || worker_loop(ctx, exit, receiver));
            if let Err(e) = spawned {
                // The closure (and its guard) was dropped unrun.
                abort.trip(SignError::Pool(format!("failed to spawn worker {id}: {e}")));
                return;
            }
        }
        drop(receiver);

        if let Err(e) = dispatch(config, input, &pool, &sender, &abort, &metrics) {
            abort.trip(e);
        }
    });

    if let Some(err) = abort.into_error() {
        return Err(err);
    }
    debug_assert_eq!(pool.circulation(), pool.capacity());
    Ok(metrics.snapshot())
}

/// Held by each worker thread. Dropping the last one closes the pool; a drop
/// during unwinding also aborts the run.
struct WorkerExit<'a> {
    live: &'a AtomicUsize,
    pool: &'a DescriptorPool,
    abort: &'a AbortSignal,
}

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.abort.trip(SignError::Pool("worker thread panicked".into()));
        }
        if self.live.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pool.close();
        }
    }
}

fn worker_loop<D>(ctx: &UnitContext<'_, D>, exit: WorkerExit<'_>, receiver: Receiver<WorkDescriptor>)
where
    D: ChunkDecoder + ?Sized,
{
    let (pool, abort) = (exit.pool, exit.abort);
    let mut formatter = RecordFormatter::new();
    for mut descriptor in receiver {
        let locator = descriptor.take();
        pool.release(descriptor);

        let Some(locator) = locator else { continue };
        if abort.is_tripped() {
            continue;
        }
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| process_unit(ctx, &locator, &mut formatter)));
        match outcome {
            Ok(Ok(UnitOutcome::Skipped)) => debug!(unit = %locator, "unit skipped"),
            Ok(Ok(UnitOutcome::Done { records })) => debug!(unit = %locator, records, "unit done"),
            Ok(Err(e)) => abort.trip(e),
            Err(_) => abort.trip(SignError::Pool(format!("worker panicked while processing {locator}"))),
        }
    }
    drop(exit);
}

fn dispatch<R: Read>(
    config: &Config,
    input: R,
    pool: &DescriptorPool,
    sender: &Sender<WorkDescriptor>,
    abort: &AbortSignal,
    metrics: &RunMetrics,
) -> Result<()> {
    let mut tokens = Tokenizer::new(input, config.delimiter);

    while !abort.is_tripped() {
        let Some(locator) = next_locator(&mut tokens, &config.source)? else {
            break;
        };
        debug!(unit = %locator, "dispatching");

        let Some(mut descriptor) = pool.acquire() else {
            return Err(SignError::Pool("all workers have exited".into()));
        };
        descriptor.load(locator);
        if let Err(SendError(descriptor)) = sender.send(descriptor) {
            pool.release(descriptor);
            return Err(SignError::Pool("no worker is accepting work".into()));
        }
        metrics.record_dispatched();
    }
    Ok(())
}

/// Reads the next unit from the token stream.
///
/// Paths mode uses one token per unit; world mode uses an `x z` pair.
pub fn next_locator<R: Read>(tokens: &mut Tokenizer<R>, source: &Source) -> Result<Option<Locator>> {
    let Some(first) = tokens.next_token().map_err(SignError::Input)? else {
        return Ok(None);
    };
    match source {
        Source::Paths => Ok(Some(Locator::Path(token_path(first)))),
        Source::World(_) => {
            let x = parse_coord(&first)?;
            let Some(second) = tokens.next_token().map_err(SignError::Input)? else {
                warn!(x, "ignoring region coordinate without a partner at end of input");
                return Ok(None);
            };
            let z = parse_coord(&second)?;
            Ok(Some(Locator::Region { x, z }))
        }
    }
}

fn parse_coord(token: &[u8]) -> Result<i32> {
    std::str::from_utf8(token)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SignError::InvalidInput(String::from_utf8_lossy(token).into_owned()))
}

#[cfg(unix)]
fn token_path(token: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;
    PathBuf::from(OsString::from_vec(token))
}

#[cfg(not(unix))]
fn token_path(token: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&token).into_owned())
}
