/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Library code only emits events; binaries and tests opt in by calling this once.
/// Repeated calls are ignored.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
