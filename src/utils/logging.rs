//! Logger setup.
//!
//! `RUST_LOG` always wins; otherwise the filter defaults to `info`, or `debug`
//! when the app runs with `debug` enabled (`LEAFSCAN_DEBUG=1`).

use log::LevelFilter;

pub fn default_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs `env_logger` as the global logger. Later calls are ignored so
/// tests and embedders can call this freely.
pub fn init(debug: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level(debug));
    if let Ok(spec) = std::env::var("RUST_LOG") {
        builder.parse_filters(&spec);
    }

    if builder.try_init().is_ok() {
        log::debug!("Logger initialized");
    }
}
