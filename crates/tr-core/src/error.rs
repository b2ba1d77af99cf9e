//! Error types for the tegra-recomp shader translator

use crate::stage::Stage;
use thiserror::Error;

/// Main error type for shader translation
#[derive(Error, Debug)]
pub enum RecompilerError {
    #[error("Environment error: {0}")]
    Environment(#[from] EnvironmentError),

    #[error("Translation of {stage} program failed at 0x{address:08x}: {message}")]
    Translation {
        stage: Stage,
        address: u32,
        message: String,
    },

    #[error("Stage mismatch: expected a {expected} program, got {actual}")]
    StageMismatch { expected: Stage, actual: Stage },

    #[error("Program from translation session {program} used with session {session}")]
    SessionMismatch { program: u64, session: u64 },

    #[error("Shader module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a shader environment while the engine consults it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentError {
    #[error("Out of bounds instruction read at 0x{address:08x} (window 0x{base:08x}, 0x{size:x} bytes)")]
    OutOfBounds { address: u32, base: u32, size: usize },

    #[error("{operation} is not implemented by the {environment} environment")]
    NotImplemented {
        operation: &'static str,
        environment: &'static str,
    },

    #[error("Program header truncated: {len} bytes available, {required} required")]
    TruncatedHeader { len: usize, required: usize },
}

/// Failures reported by a translation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Environment(#[from] EnvironmentError),

    #[error("{message}")]
    Diagnostic {
        address: Option<u32>,
        message: String,
    },
}

impl EngineError {
    /// Create a diagnostic anchored at a guest address
    pub fn at(address: u32, message: impl Into<String>) -> Self {
        Self::Diagnostic {
            address: Some(address),
            message: message.into(),
        }
    }

    /// Create a diagnostic without a guest address
    pub fn diagnostic(message: impl Into<String>) -> Self {
        Self::Diagnostic {
            address: None,
            message: message.into(),
        }
    }
}

/// Errors wrapping emitted code into a host shader module
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("Vulkan error: {0}")]
    Vulkan(String),

    #[error("Empty SPIR-V code")]
    EmptyCode,

    #[error("Invalid SPIR-V magic: 0x{0:08x}")]
    BadMagic(u32),
}

/// Result type alias for translator operations
pub type Result<T> = std::result::Result<T, RecompilerError>;
