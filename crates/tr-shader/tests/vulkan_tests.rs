//! Compiling through a real device
//!
//! These tests return early on machines without a Vulkan loader or device.

use ash::vk;
use tr_core::Stage;
use tr_shader::module::create_device;
use tr_shader::{
    Bindings, BuildMode, CapabilityProbe, DeviceQuery, LinearEngine, ProgramHeader, RuntimeInfo, ShaderManager,
    VulkanModuleFactory,
};

const SCHED: u64 = 0x001F_8000_FFE0_07F0;
const MOV: u64 = 0x5C98_0780_0000_0000;
const EXIT: u64 = 0xE300_0000_0007_000F;

struct Instance {
    _entry: ash::Entry,
    instance: ash::Instance,
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe { self.instance.destroy_instance(None) };
    }
}

fn instance() -> Option<Instance> {
    let entry = unsafe { ash::Entry::load() }.ok()?;
    let app_info = vk::ApplicationInfo::default().api_version(vk::API_VERSION_1_1);
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);
    let instance = unsafe { entry.create_instance(&create_info, None) }.ok()?;
    Some(Instance {
        _entry: entry,
        instance,
    })
}

#[test]
fn test_module_on_device_created_from_enabled_features() {
    let Some(vulkan) = instance() else {
        return;
    };
    let Some(&physical_device) = unsafe { vulkan.instance.enumerate_physical_devices() }
        .unwrap_or_default()
        .first()
    else {
        return;
    };

    let query = DeviceQuery::query(&vulkan.instance, physical_device);
    let mut result = CapabilityProbe::new().probe(&query);
    let device = create_device(&vulkan.instance, physical_device, &mut result.enabled).unwrap();

    {
        let manager = ShaderManager::new(
            result.record,
            BuildMode::Debug,
            LinearEngine::new(),
            VulkanModuleFactory::new(device.clone()),
        );

        let mut data = ProgramHeader::new().with_shader_type(1, 1).to_bytes().to_vec();
        for word in [SCHED, MOV, EXIT] {
            data.extend_from_slice(&word.to_le_bytes());
        }

        let parsed = manager.parse_graphics_shader(Stage::VertexB, &data, 0, 0).unwrap();
        let module = manager
            .compile_shader(&RuntimeInfo::default(), parsed, &mut Bindings::default())
            .unwrap();
        assert_ne!(module.handle(), vk::ShaderModule::null());
        assert_eq!(module.stage(), vk::ShaderStageFlags::VERTEX);
        assert!(module.word_count() > 5);
    }

    unsafe { device.destroy_device(None) };
}
