//! Logging initialisation
//!
//! Library crates only emit `tracing` events; the binary installs the subscriber once.

use crate::config::DebugConfig;
use crate::error::RecompilerError;
use std::fs::File;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter for the configured level, letting `RUST_LOG` take precedence
pub fn env_filter(config: &DebugConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_directive()))
}

/// Install the global subscriber
pub fn init(config: &DebugConfig) -> Result<(), RecompilerError> {
    let filter = env_filter(config);

    let result = if config.log_to_file {
        let file = File::create(&config.log_path)?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| RecompilerError::Config(format!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_level_directives() {
        for (level, directive) in [
            (LogLevel::Off, "off"),
            (LogLevel::Error, "error"),
            (LogLevel::Warn, "warn"),
            (LogLevel::Info, "info"),
            (LogLevel::Debug, "debug"),
            (LogLevel::Trace, "trace"),
        ] {
            assert_eq!(level.as_directive(), directive);
        }
    }
}
