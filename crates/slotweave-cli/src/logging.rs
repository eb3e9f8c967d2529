//! Log output for the weaver's `tracing` events.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding an `EnvFilter` directive
pub const LOG_ENV: &str = "SLOTWEAVE_LOG";

/// Install a stderr subscriber.
///
/// `SLOTWEAVE_LOG` wins when set; otherwise `--verbose` selects `debug` and
/// the default is `warn`.
pub fn init(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    let stderr = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    // Keeps an already-installed global subscriber.
    let _ = Registry::default().with(filter).with(stderr).try_init();
}
