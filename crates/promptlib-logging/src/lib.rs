//! # promptlib-logging
//!
//! Logging for promptlib.
//!
//! ## Key Types
//!
//! - [`Logger`] - Prints user-facing notices
//! - [`Notice`] - Notice types (saved, deleted, copied, failures)
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//!
//! Diagnostics go through `tracing`; [`init_tracing`] installs the subscriber.

mod events;

pub use events::{LogFormat, Logger, Notice, NoticeLevel};

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name of the rolling diagnostics log inside a log directory.
pub const DIAGNOSTICS_LOG_PREFIX: &str = "promptlib.log";

/// Initialize tracing for the application.
///
/// Diagnostics always go to stderr. With `log_dir`, they are also written to
/// a daily-rolling file there; keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init_tracing(level: &str, format: LogFormat, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, DIAGNOSTICS_LOG_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(fmt::layer().json().with_writer(std::io::stderr).with_target(false))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(file_layer)
                .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
                .init();
        }
    }

    guard
}
