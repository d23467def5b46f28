//! Logging bootstrap for the dashboard backend.
//!
//! All crates log through `tracing` macros; the binary calls one of the
//! `init*` functions once at startup to install the subscriber.

use clinicbot_config::LoggingConfig;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber at INFO.
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` is honoured on top of the given level. Calling this twice is harmless.
pub fn init_with_level(level: Level) {
    let result = tracing_subscriber::registry()
        .with(stdout_layer())
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

/// Initialize logging from the `logging` config section.
///
/// When `file_dir` is set, a daily rolling file is written next to stdout. The
/// returned guard flushes that file writer and must be kept alive by the caller.
pub fn init_with_config(config: &LoggingConfig) -> Option<WorkerGuard> {
    let level = config
        .level
        .as_deref()
        .and_then(|l| Level::from_str(l).ok())
        .unwrap_or(Level::INFO);

    let Some(dir) = config.file_dir.as_deref() else {
        init_with_level(level);
        return None;
    };

    let appender = tracing_appender::rolling::daily(dir, "clinicbot.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let result = tracing_subscriber::registry()
        .with(stdout_layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(build_filter(level))
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {} (file: {})", level, dir);
    }
    Some(guard)
}

fn build_filter(level: Level) -> EnvFilter {
    let directive: Directive = format!("clinicbot={}", level)
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    EnvFilter::from_default_env().add_directive(directive)
}

fn stdout_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
}
