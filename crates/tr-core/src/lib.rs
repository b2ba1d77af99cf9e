//! Core types for the tegra-recomp shader translator
//!
//! This crate provides the shared stage tag, error handling,
//! configuration, and logging infrastructure used by the other crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod stage;

pub use config::Config;
pub use error::{EngineError, EnvironmentError, ModuleError, RecompilerError, Result};
pub use stage::Stage;
