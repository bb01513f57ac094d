//! Tracing setup: stderr console layer plus an optional daily log file.

use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use graphmem_config::{ConfigLoader, LoggingConfig};

static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// `RUST_LOG` wins, then the CLI flag, then the config file.
pub(crate) fn filter_directive(flag: Option<&str>, config: &LoggingConfig) -> String {
    std::env::var("RUST_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| flag.map(str::to_string))
        .unwrap_or_else(|| config.level.clone())
}

pub(crate) fn init_tracing(flag: Option<&str>, config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(filter_directive(flag, config))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match &config.directory {
        Some(dir) => {
            let dir = ConfigLoader::expand_path(&dir.to_string_lossy());
            std::fs::create_dir_all(&dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("graphmem")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&dir)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = GUARD.set(guard);
            Some(fmt::layer().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_config_level() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig::default();
        assert_eq!(filter_directive(Some("debug"), &config), "debug");
        assert_eq!(filter_directive(None, &config), "info");
    }
}
