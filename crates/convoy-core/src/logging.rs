//! Logging initialization using the `tracing` ecosystem.
//!
//! - Console output (colored, human-readable)
//! - Optional file output (daily rotation via `tracing-appender`), plain text
//!   or one JSON object per line for log shippers
//! - Level from `RUST_LOG`, falling back to the configured default

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging settings, usually assembled from CLI flags and the config file.
#[derive(Debug, Clone, Copy)]
pub struct LogOptions<'a> {
    /// Default level if `RUST_LOG` is not set (e.g. `"info"`).
    pub level: &'a str,
    /// Directory for daily-rotating log files.
    pub dir: Option<&'a str>,
    /// Log file prefix (e.g. `"convoy-runner"`).
    pub module_name: &'a str,
    /// Write the file log as JSON lines.
    pub json: bool,
}

/// Initialize the global tracing subscriber. Call once at program start.
pub fn init_logging(opts: &LogOptions<'_>) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.level));

    let console_layer = fmt::layer().with_target(true).with_ansi(true);

    let (text_file, json_file) = match opts.dir {
        Some(dir) if opts.json => {
            let appender = tracing_appender::rolling::daily(dir, opts.module_name);
            (None, Some(fmt::layer().json().with_writer(appender).with_current_span(false)))
        }
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, opts.module_name);
            (Some(fmt::layer().with_writer(appender).with_ansi(false).with_target(true)), None)
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(text_file)
        .with(json_file)
        .init();
}
