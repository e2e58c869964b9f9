use std::sync::Once;

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

static TRACING_INIT: Once = Once::new();

/// Target prefix shared by every fpx crate (`fpx.explorer`, `fpx.packages`, ...).
const FPX_TARGET: &str = "fpx";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level for all fpx crates: a simple level or an `EnvFilter` directive string.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json: bool,

    /// Write logs to stderr. When disabled, events are filtered but discarded.
    #[serde(default = "LoggingConfig::default_stderr")]
    pub stderr: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "warn".to_owned()
    }

    fn default_stderr() -> bool {
        true
    }

    /// Filter directives for the configured level. A bare level applies to the
    /// `fpx` targets only; anything else is taken as an `EnvFilter` directive string.
    fn directives(&self) -> String {
        let level = match self.level.trim() {
            "" => return Self::default_level(),
            level if level.eq_ignore_ascii_case("warning") => "warn",
            level => level,
        };
        match level.parse::<LevelFilter>() {
            Ok(level) => format!("warn,{FPX_TARGET}={level}"),
            Err(_) => level.to_owned(),
        }
    }

    /// The effective filter; `RUST_LOG`, when set, is appended to the configured
    /// directives. Unparseable directives are skipped.
    pub fn env_filter(&self) -> EnvFilter {
        let mut directives = self.directives();
        if let Some(env) = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
        {
            directives.push(',');
            directives.push_str(env.trim());
        }
        EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .parse_lossy(directives)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
            stderr: Self::default_stderr(),
        }
    }
}

/// Install the global tracing subscriber. Only the first call has an effect.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let writer = if config.stderr {
            BoxMakeWriter::new(std::io::stderr)
        } else {
            BoxMakeWriter::new(std::io::sink)
        };

        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_ok() {
            tracing::debug!(
                target: "fpx.config",
                level = %config.level,
                json = config.json,
                "tracing initialized"
            );
        }
    });
}
