//! Tracing setup for the demo programs.

use tracing_subscriber::EnvFilter;

/// Initialise a fmt subscriber honouring `RUST_LOG`, defaulting to
/// `refrain=info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("refrain=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
