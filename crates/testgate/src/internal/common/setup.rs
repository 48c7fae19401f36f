use env_logger::DEFAULT_FILTER_ENV;
use log::LevelFilter;

/// Sets the behavior of the logger, based on passed environment variables
/// such as `RUST_LOG`.
///
/// Test binaries call this from many threads, so an already installed logger
/// is left in place.
pub fn setup_logging(verbose: bool) {
    let mut builder = env_logger::Builder::default();
    builder.filter_level(if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    });

    let has_debug = std::env::var(DEFAULT_FILTER_ENV)
        .map(|v| v.contains("debug") || v.contains("trace"))
        .unwrap_or(false);
    if verbose || has_debug {
        builder.format_timestamp_millis();
    } else {
        builder.format_timestamp(None).format_target(false);
    }

    // Overwrite the defaults from env
    builder.parse_default_env();
    builder.is_test(true);
    let _ = builder.try_init();
}
