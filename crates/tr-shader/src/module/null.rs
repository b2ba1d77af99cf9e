//! Null module factory for headless use

use super::{validate_code, vk_stage, ShaderModuleFactory};
use ash::vk;
use tr_core::{ModuleError, Stage};

/// The emitted words, unwrapped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NullModule {
    pub stage: vk::ShaderStageFlags,
    pub code: Vec<u32>,
}

impl NullModule {
    pub fn word_count(&self) -> usize {
        self.code.len()
    }

    /// SPIR-V version from the module header
    pub fn version(&self) -> Option<u32> {
        self.code.get(1).copied()
    }
}

/// Factory that keeps the code in memory instead of handing it to a driver
#[derive(Debug, Clone, Copy, Default)]
pub struct NullModuleFactory;

impl NullModuleFactory {
    pub fn new() -> Self {
        Self
    }
}

impl ShaderModuleFactory for NullModuleFactory {
    type Module = NullModule;

    fn create_shader_module(&self, stage: Stage, code: &[u32]) -> Result<NullModule, ModuleError> {
        validate_code(code)?;
        Ok(NullModule {
            stage: vk_stage(stage),
            code: code.to_vec(),
        })
    }
}
