//! Logging setup.
use chihaya_configuration::Threshold;
use tracing_subscriber::filter::LevelFilter;

/// Installs the global tracing subscriber.
///
/// The `--debug` switch overrides the configured threshold; `--json`
/// switches to line-delimited JSON output and `--nocolors` disables ANSI
/// styling for plain log files.
pub fn setup(threshold: Threshold, debug: bool, json: bool, nocolors: bool) {
    let level = if debug { LevelFilter::DEBUG } else { map_threshold(threshold) };

    if level == LevelFilter::OFF {
        return;
    }

    let builder = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(!nocolors);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::info!(%level, "logging initialized");
}

fn map_threshold(threshold: Threshold) -> LevelFilter {
    match threshold {
        Threshold::Off => LevelFilter::OFF,
        Threshold::Error => LevelFilter::ERROR,
        Threshold::Warn => LevelFilter::WARN,
        Threshold::Info => LevelFilter::INFO,
        Threshold::Debug => LevelFilter::DEBUG,
        Threshold::Trace => LevelFilter::TRACE,
    }
}
