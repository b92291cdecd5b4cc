use tracing_subscriber::EnvFilter;

/// Environment variable holding a `tracing` filter directive
pub const LOG_ENV: &str = "TREESUM_LOG";

/// Install the stderr subscriber
///
/// The filter comes from `TREESUM_LOG`, then `fallback`, then `info`
/// Stdout is left alone since the worker speaks its protocol there
pub fn init_logging(fallback: Option<&str>) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .ok()
        .or_else(|| fallback.and_then(|directive| EnvFilter::try_new(directive).ok()))
        .unwrap_or_else(|| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
