//! Host shader module creation
//!
//! Emitted SPIR-V is wrapped into a host object through a [`ShaderModuleFactory`]. The Vulkan
//! factory needs a live device; the null factory just hands the words back and is what headless
//! tools and tests use.

mod null;
mod vulkan;

pub use null::{NullModule, NullModuleFactory};
pub use vulkan::{create_device, OwnedShaderModule, VulkanModuleFactory};

use crate::engine::spirv::SPIRV_MAGIC;
use ash::vk;
use tr_core::{ModuleError, Stage};

/// Wraps SPIR-V words into a host shader module
pub trait ShaderModuleFactory {
    type Module;

    /// Wrap `code` emitted for a program of `stage`
    fn create_shader_module(&self, stage: Stage, code: &[u32]) -> Result<Self::Module, ModuleError>;
}

/// Check that `code` at least looks like a SPIR-V module
pub fn validate_code(code: &[u32]) -> Result<(), ModuleError> {
    match code.first() {
        None => Err(ModuleError::EmptyCode),
        Some(&magic) if magic != SPIRV_MAGIC => Err(ModuleError::BadMagic(magic)),
        Some(_) => Ok(()),
    }
}

/// Vulkan pipeline stage a guest stage runs in
pub fn vk_stage(stage: Stage) -> vk::ShaderStageFlags {
    match stage {
        Stage::VertexA | Stage::VertexB => vk::ShaderStageFlags::VERTEX,
        Stage::TessellationControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        Stage::TessellationEval => vk::ShaderStageFlags::TESSELLATION_EVALUATION,
        Stage::Geometry => vk::ShaderStageFlags::GEOMETRY,
        Stage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        Stage::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert_eq!(validate_code(&[]), Err(ModuleError::EmptyCode));
        assert_eq!(validate_code(&[0xDEAD_BEEF, 0]), Err(ModuleError::BadMagic(0xDEAD_BEEF)));
        assert_eq!(validate_code(&[SPIRV_MAGIC, 0x0001_0000]), Ok(()));
    }

    #[test]
    fn test_vk_stage() {
        assert_eq!(vk_stage(Stage::VertexA), vk::ShaderStageFlags::VERTEX);
        assert_eq!(vk_stage(Stage::VertexB), vk::ShaderStageFlags::VERTEX);
        assert_eq!(vk_stage(Stage::TessellationControl), vk::ShaderStageFlags::TESSELLATION_CONTROL);
        assert_eq!(vk_stage(Stage::TessellationEval), vk::ShaderStageFlags::TESSELLATION_EVALUATION);
        assert_eq!(vk_stage(Stage::Geometry), vk::ShaderStageFlags::GEOMETRY);
        assert_eq!(vk_stage(Stage::Fragment), vk::ShaderStageFlags::FRAGMENT);
        assert_eq!(vk_stage(Stage::Compute), vk::ShaderStageFlags::COMPUTE);
    }
}
