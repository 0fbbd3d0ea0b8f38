use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialises console logging. `verbose` raises this crate to `debug`;
/// `RUST_LOG` still takes precedence for anything it names.
pub fn init_logging(verbose: bool) {
    let level = if verbose { "rblrdox=debug" } else { "rblrdox=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
