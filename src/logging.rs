//! Log setup. Everything goes to stderr so stdout stays free.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Environment variable that overrides the level chosen on the command line,
/// using `EnvFilter` directive syntax (`MCSIGN_LOG=mcsign=trace`).
pub const LOG_ENV: &str = "MCSIGN_LOG";

/// Installs the global subscriber. Calling it twice is harmless.
pub fn init(default: Level) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default.as_str().to_ascii_lowercase()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
