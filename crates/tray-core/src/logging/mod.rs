use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global JSON subscriber.
///
/// `RUST_LOG` wins when set. Otherwise the level is `info`, or `error` when
/// `quiet` is true. Safe to call more than once; later calls are no-ops.
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
