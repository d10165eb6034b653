use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. RUST_LOG wins over `default_directive`.
/// A second call is a no-op.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
