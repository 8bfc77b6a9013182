use env_logger::Env;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the process-wide logger once. Defaults to Info; `RUST_LOG`
/// overrides.
pub fn init() {
    LOGGER_INIT.get_or_init(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    });
}
