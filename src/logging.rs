use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the global logger once; later calls are ignored.
///
/// An explicit `filter` wins over `RUST_LOG`; with neither, `info` is used.
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Some(filter) = filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }
        builder.format_timestamp_millis();
        builder.init();
        log::debug!("logging initialized");
    });
}
