//! Log backend setup.
//!
//! Library code only uses the `log` macros. On Android records go to logcat,
//! elsewhere they are bridged into a `tracing-subscriber` fmt writer.

use log::LevelFilter;
use std::sync::Once;

static INIT: Once = Once::new();

/// Install the log backend once. Later calls are ignored.
///
/// `filter` accepts `EnvFilter` syntax off Android (e.g. "info" or
/// "mamu_prefilter=debug"); `RUST_LOG` takes precedence when set. logcat has a
/// single global level, so on Android the filter is reduced with `max_level`.
pub fn init_logging(filter: &str) {
    INIT.call_once(|| install(filter));
}

/// Most verbose level named by an `EnvFilter`-style directive list.
///
/// Target prefixes are dropped, so "warn,mamu_prefilter=debug" gives `Debug`.
/// Falls back to `Info` when no directive names a level.
pub fn max_level(filter: &str) -> LevelFilter {
    filter
        .split(',')
        .filter_map(|directive| {
            let level = directive.rsplit('=').next()?.trim();
            level.parse::<LevelFilter>().ok()
        })
        .max()
        .unwrap_or(LevelFilter::Info)
}

#[cfg(target_os = "android")]
fn install(filter: &str) {
    use android_logger::Config;

    let level = max_level(filter);
    android_logger::init_once(Config::default().with_max_level(level).with_tag("MamuPrefilter"));
}

#[cfg(not(target_os = "android"))]
fn install(filter: &str) {
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // The host binary may have installed its own subscriber already.
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
}
