//! Structured logging for scriptpack
//!
//! Every restore and cache decision is logged with structured fields so a run can be
//! reconstructed from the log alone.
//!
//! # Log Format Conventions
//!
//! - `operation`: What was attempted ("restore", "cache.read", "cache.write")
//! - `status`: The outcome ("success", "hit", "miss", "bypass", "error")
//! - `manifest`: Path of the manifest file involved
//! - `package`: Package shorthand (`Name@version`)
//!
//! # Examples
//!
//! ```rust,ignore
//! use tracing::info;
//!
//! info!(
//!     operation = operations::RESTORE,
//!     status = status::HIT,
//!     manifest = %manifest.path.display(),
//!     "restore skipped, manifest unchanged"
//! );
//! ```

use std::{fmt as std_fmt, io};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    fmt::{self, format::Writer},
    prelude::*,
    EnvFilter,
};

/// Environment variable selecting the log format
pub const LOG_FORMAT_ENV: &str = "SCRIPTPACK_LOG_FORMAT";

/// Formatter that tags lines with "(scriptpack)" instead of the module path
struct ScriptpackFormatter {
    with_ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ScriptpackFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std_fmt::Result {
        let meta = event.metadata();

        write!(
            writer,
            "{} ",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f")
        )?;

        if self.with_ansi {
            let level_style = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            };
            write!(
                writer,
                "{}{:5}(scriptpack)\x1b[0m: ",
                level_style,
                meta.level()
            )?;
        } else {
            write!(writer, "{:5}(scriptpack): ", meta.level())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Colored output for terminals
    Pretty,
    /// Plain output for CI and redirected stderr
    Compact,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "compact" => Some(Self::Compact),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// Read `SCRIPTPACK_LOG_FORMAT`, defaulting to compact in CI
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|v| Self::parse(&v))
            .unwrap_or_else(|| {
                if std::env::var("CI").is_ok() {
                    Self::Compact
                } else {
                    Self::Pretty
                }
            })
    }
}

/// Install the global subscriber, logging to stderr
///
/// `default_level` applies when `RUST_LOG` is unset. Calling this twice is a no-op.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let result = match LogFormat::from_env() {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptpackFormatter { with_ansi: true })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .event_format(ScriptpackFormatter { with_ansi: false })
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_ansi(false)
                    .with_writer(io::stderr)
                    .json(),
            )
            .try_init(),
    };

    // Already installed (tests, embedding hosts)
    let _ = result;
}

/// Operation names
pub mod operations {
    pub const RESTORE: &str = "restore";
    pub const CACHE_READ: &str = "cache.read";
    pub const CACHE_WRITE: &str = "cache.write";
    pub const CACHE_CLEAN: &str = "cache.clean";
}

/// Status values
pub mod status {
    pub const SUCCESS: &str = "success";
    /// Nothing to restore
    pub const EMPTY: &str = "empty";
    pub const HIT: &str = "hit";
    pub const MISS: &str = "miss";
    /// Cache not consulted (floating versions or cache disabled)
    pub const BYPASS: &str = "bypass";
    pub const ERROR: &str = "error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_format() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("verbose"), None);
    }
}
