//! Configuration system for tegra-recomp

use crate::error::RecompilerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest guest shader binary that is scanned for its end (1 MiB)
pub const DEFAULT_MAX_SHADER_BYTECODE_SIZE: usize = 1024 * 1024;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub gpu: GpuConfig,
    pub debug: DebugConfig,
}

/// Host GPU and translation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuConfig {
    /// Vulkan extensions to treat as absent during capability probing
    pub disabled_extensions: Vec<String>,
    /// Constant buffer slot used to resolve bindless texture handles
    pub bindless_texture_buffer_index: u32,
    /// Upper bound when scanning guest memory for the end of a program
    pub max_shader_bytecode_size: usize,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_path: PathBuf,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            disabled_extensions: Vec::new(),
            bindless_texture_buffer_index: 0,
            max_shader_bytecode_size: DEFAULT_MAX_SHADER_BYTECODE_SIZE,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_to_file: false,
            log_path: PathBuf::from("tegra-recomp.log"),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, RecompilerError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing the defaults there if the file is missing
    pub fn load_from(path: &Path) -> Result<Self, RecompilerError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config = Self::from_toml_str(&content)?;
            tracing::info!("Loaded configuration from {}", path.display());
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default configuration at {}", path.display());
            Ok(config)
        }
    }

    /// Parse configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, RecompilerError> {
        toml::from_str(content).map_err(|e| RecompilerError::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), RecompilerError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), RecompilerError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| RecompilerError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tegra-recomp")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.gpu.disabled_extensions.is_empty());
        assert_eq!(config.gpu.bindless_texture_buffer_index, 0);
        assert_eq!(config.gpu.max_shader_bytecode_size, 1024 * 1024);
        assert_eq!(config.debug.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml_str(&toml_str).unwrap();
        assert_eq!(
            parsed.gpu.max_shader_bytecode_size,
            config.gpu.max_shader_bytecode_size
        );
    }

    #[test]
    fn test_partial_config() {
        let parsed = Config::from_toml_str(
            r#"
            [gpu]
            disabled_extensions = ["VK_KHR_spirv_1_4"]
            bindless_texture_buffer_index = 2
            "#,
        )
        .unwrap();
        assert_eq!(parsed.gpu.disabled_extensions, vec!["VK_KHR_spirv_1_4"]);
        assert_eq!(parsed.gpu.bindless_texture_buffer_index, 2);
        assert_eq!(parsed.gpu.max_shader_bytecode_size, DEFAULT_MAX_SHADER_BYTECODE_SIZE);
        assert_eq!(parsed.debug.log_level, LogLevel::Info);
    }

    #[test]
    fn test_load_creates_then_reads() {
        let dir = std::env::temp_dir().join(format!("tegra-recomp-config-{}", std::process::id()));
        let path = dir.join("config.toml");
        let _ = std::fs::remove_dir_all(&dir);

        let created = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.debug.log_level, LogLevel::Info);

        std::fs::write(&path, "[debug]\nlog_level = \"Trace\"\n").unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.debug.log_level, LogLevel::Trace);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_config() {
        let err = Config::from_toml_str("[gpu]\nbindless_texture_buffer_index = \"x\"").unwrap_err();
        assert!(matches!(err, RecompilerError::Config(_)));
    }
}
