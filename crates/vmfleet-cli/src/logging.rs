use anyhow::{Context, Result};
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, reload};

/// Level used until the settings file has been read.
pub const STARTUP_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact human-readable lines.
    Human,
    /// One JSON object per event, for log shipping.
    Json,
}

/// Default filter: `level` for vmfleet crates, warnings from dependencies.
pub fn default_filter(level: &str) -> String {
    format!("vmfleet={},warn", level)
}

fn level_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(default_filter(level))
        .with_context(|| format!("Invalid log level {:?}", level))
}

/// Handle to the installed subscriber's filter.
pub struct LogHandle {
    filter: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogHandle {
    /// Switch the vmfleet crates to `level`. No-op when `RUST_LOG` is set.
    pub fn set_level(&self, level: &str) -> Result<()> {
        if self.from_env {
            return Ok(());
        }
        let filter = level_filter(level)?;
        self.filter
            .reload(filter)
            .context("Failed to apply log level")
    }
}

/// Initialize the global tracing subscriber.
///
/// Call once at program startup, before anything logs. `RUST_LOG` takes
/// precedence; otherwise [`STARTUP_LEVEL`] applies until
/// [`LogHandle::set_level`] is called with the configured level.
pub fn init(format: LogFormat) -> LogHandle {
    let (env_filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(default_filter(STARTUP_LEVEL)), false),
    };
    let (env_filter, filter) = reload::Layer::new(env_filter);

    match format {
        LogFormat::Human => {
            let subscriber = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact();
            tracing_subscriber::registry()
                .with(env_filter)
                .with(subscriber)
                .init();
        }
        LogFormat::Json => {
            let subscriber = fmt::layer()
                .json()
                .with_target(true)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(subscriber)
                .init();
        }
    }
    LogHandle { filter, from_env }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter("debug"), "vmfleet=debug,warn");
    }

    #[test]
    fn test_level_filter_rejects_garbage() {
        assert!(level_filter("debug").is_ok());
        assert!(level_filter("trace").is_ok());
        assert!(level_filter("not a level!").is_err());
    }

    #[test]
    fn test_log_format_from_flag() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogFormat::from_str("human", true), Ok(LogFormat::Human));
        assert!(LogFormat::from_str("yaml", true).is_err());
    }
}
