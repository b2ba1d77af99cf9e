//! Vulkan shader module factory

use super::{validate_code, vk_stage, ShaderModuleFactory};
use crate::caps::EnabledFeatures;
use ash::vk;
use tr_core::{ModuleError, Stage};

/// Create a logical device with exactly the extensions and features the probe enabled
///
/// One queue is requested from the first graphics-capable family, falling back to family 0.
pub fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    enabled: &mut EnabledFeatures,
) -> Result<ash::Device, ModuleError> {
    let queue_family = unsafe { instance.get_physical_device_queue_family_properties(physical_device) }
        .iter()
        .position(|props| props.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .unwrap_or(0) as u32;

    let queue_priorities = [1.0f32];
    let queue_create_info = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(&queue_priorities);

    let extension_names = enabled.extension_names();
    let mut features2 = enabled.features2();

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(std::slice::from_ref(&queue_create_info))
        .enabled_extension_names(&extension_names)
        .push_next(&mut features2);

    tracing::debug!(
        "Creating device with {} extensions on queue family {}",
        extension_names.len(),
        queue_family
    );

    unsafe {
        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(|e| ModuleError::Vulkan(format!("Failed to create logical device: {:?}", e)))
    }
}

/// A shader module destroyed with its owner
pub struct OwnedShaderModule {
    device: ash::Device,
    handle: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
    word_count: usize,
}

impl OwnedShaderModule {
    pub fn handle(&self) -> vk::ShaderModule {
        self.handle
    }

    /// Pipeline stage the module is meant for
    pub fn stage(&self) -> vk::ShaderStageFlags {
        self.stage
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }
}

impl Drop for OwnedShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.handle, None);
        }
    }
}

/// Creates shader modules on a logical device
///
/// The device must outlive every module created through the factory.
#[derive(Clone)]
pub struct VulkanModuleFactory {
    device: ash::Device,
}

impl VulkanModuleFactory {
    pub fn new(device: ash::Device) -> Self {
        Self { device }
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }
}

impl ShaderModuleFactory for VulkanModuleFactory {
    type Module = OwnedShaderModule;

    fn create_shader_module(&self, stage: Stage, code: &[u32]) -> Result<OwnedShaderModule, ModuleError> {
        validate_code(code)?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(code);

        let handle = unsafe {
            self.device
                .create_shader_module(&create_info, None)
                .map_err(|e| ModuleError::Vulkan(format!("Failed to create shader module: {:?}", e)))?
        };

        Ok(OwnedShaderModule {
            device: self.device.clone(),
            handle,
            stage: vk_stage(stage),
            word_count: code.len(),
        })
    }
}
