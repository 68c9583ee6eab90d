use std::sync::Once;

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` syntax, e.g. "info" or
/// "tiamat_engine=debug,wgpu=warn". When unset, `RUST_LOG` wins, then an
/// info-level default.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
}

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored. Call early
/// in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Some(filter) = config.env_filter {
            builder.parse_filters(&filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        builder.init();

        log::debug!("logging initialized");
    });
}
