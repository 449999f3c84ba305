//! Tracing setup for hosts that embed the routers
//!
//! The library only emits `tracing` events. Binaries and test harnesses call
//! [`init_logging`] once to get stdout output and, optionally, a daily rolling
//! log file.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::{time::ChronoUtc, MakeWriter};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const CRATE_TARGET: &str = "skew_router";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

type FilteredRegistry = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<FilteredRegistry> + Send + Sync>;

/// Line format of emitted events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One flattened JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Directory for the rolling log file; stdout only when unset
    pub log_dir: Option<PathBuf>,
    /// ANSI colors on stdout; files are always plain
    pub colorize: bool,
    pub log_file_name: String,
    /// Targets the level applies to; empty means this crate only
    pub log_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Text,
            log_dir: None,
            colorize: true,
            log_file_name: "skew-router".to_string(),
            log_targets: vec![CRATE_TARGET.to_string()],
        }
    }
}

/// Keeps the background file writer alive; drop it only at shutdown or
/// buffered lines are lost.
#[must_use]
pub struct LogGuard {
    file_guard: Option<WorkerGuard>,
}

impl LogGuard {
    pub fn has_file_output(&self) -> bool {
        self.file_guard.is_some()
    }
}

/// `target=level` directives used when `RUST_LOG` is not set
fn filter_directives(config: &LoggingConfig) -> String {
    let level = config.level.as_str().to_ascii_lowercase();
    if config.log_targets.is_empty() {
        return format!("{}={}", CRATE_TARGET, level);
    }
    config
        .log_targets
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_layer<W>(format: LogFormat, ansi: bool, writer: W) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()));

    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().flatten_event(true).boxed(),
    }
}

/// Install the global subscriber.
///
/// Never fails: if a subscriber is already installed it is kept, and if the
/// log directory cannot be created only stdout output is set up.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(&config)));

    let mut layers = vec![build_layer(config.format, config.colorize, std::io::stdout)];

    let file_guard = config.log_dir.as_ref().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            return None;
        }
        let appender = RollingFileAppender::new(Rotation::DAILY, dir, &config.log_file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(build_layer(config.format, false, writer));
        Some(guard)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard { file_guard }
}
