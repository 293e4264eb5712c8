//! Tracing setup for test binaries and the CLI

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber writing to stderr
///
/// `RUST_LOG` wins over `level` when set. Returns `false` if a global
/// subscriber was already installed, which makes repeated calls from
/// several tests harmless.
pub fn init_tracing(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
