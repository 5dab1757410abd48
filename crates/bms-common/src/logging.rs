//! ---
//! bms_section: "01-core-functionality"
//! bms_subsection: "module"
//! bms_type: "source"
//! bms_scope: "code"
//! bms_description: "Tracing bootstrap with selectable console stream and rolling file output."
//! bms_version: "v0.0.0-prealpha"
//! bms_owner: "tbd"
//! ---
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

const LOG_ENV: &str = "BMS_LOG";
const DEFAULT_DIRECTIVE: &str = "info";

static GUARDS: OnceCell<LogGuards> = OnceCell::new();

/// Keeps both non-blocking writers flushing until process exit.
struct LogGuards {
    _console: WorkerGuard,
    _file: WorkerGuard,
}

/// Console log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    StructuredJson,
    #[default]
    Pretty,
}

/// Stream the console layer writes to.
///
/// Anything that prints data on stdout (reports, `-` exports) must log to
/// `Stderr` so the data stays parseable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    #[default]
    Stdout,
    Stderr,
}

impl LogStream {
    fn writer(self) -> (NonBlocking, WorkerGuard) {
        match self {
            LogStream::Stdout => tracing_appender::non_blocking(std::io::stdout()),
            LogStream::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        }
    }
}

/// `BMS_LOG`, then `RUST_LOG`, then `info`. An unparsable directive falls
/// back to `info` with a note on stderr.
fn env_filter() -> EnvFilter {
    let directive = std::env::var(LOG_ENV).or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV));
    match directive {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid log directive '{directive}' ({err}); using {DEFAULT_DIRECTIVE}");
            EnvFilter::new(DEFAULT_DIRECTIVE)
        }),
        Err(_) => EnvFilter::new(DEFAULT_DIRECTIVE),
    }
}

fn console_layer<S>(
    format: LogFormat,
    writer: NonBlocking,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer);
    match format {
        LogFormat::StructuredJson => layer.with_target(false).json().boxed(),
        LogFormat::Pretty => layer.with_target(true).boxed(),
    }
}

/// Install the global subscriber: console output in the configured format
/// and stream, plus a daily rolling JSON file under `config.directory`.
///
/// Only the first call installs anything; later calls still create the log
/// directory and return `Ok`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    if GUARDS.get().is_some() {
        return Ok(());
    }

    let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = config.stream.writer();

    let file_layer = fmt::layer()
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .json()
        .with_writer(file_writer);

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer(config.format, console_writer))
        .with(file_layer)
        .try_init()
        .is_ok();
    if !installed {
        // Another subscriber owns the process; drop our writers.
        return Ok(());
    }
    let _ = GUARDS.set(LogGuards {
        _console: console_guard,
        _file: file_guard,
    });

    info!(
        service = %service_name,
        log_dir = %config.directory.display(),
        format = ?config.format,
        stream = ?config.stream,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn init_creates_log_directory_and_tolerates_reinit() {
        let dir = tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            stream: LogStream::Stderr,
            ..LoggingConfig::default()
        };
        init_tracing("bms-test", &config).unwrap();
        assert!(config.directory.is_dir());
        init_tracing("bms-test", &config).unwrap();
    }

    #[test]
    fn stream_deserializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            stream: LogStream,
        }
        let parsed: Wrapper = toml::from_str("stream = \"stderr\"").unwrap();
        assert_eq!(parsed.stream, LogStream::Stderr);
        assert_eq!(LogStream::default(), LogStream::Stdout);
    }
}
