//! tegra-recomp - guest shader translation probe
//!
//! Probes the first Vulkan device, prints its capability summary and the derived translation
//! profile, and optionally translates one guest program:
//!
//! ```text
//! tegra-recomp [STAGE PROGRAM [VERTEX_A_PROGRAM]]
//! ```
//!
//! A VertexB program given together with its VertexA half is merged before compiling. The
//! program is compiled into a shader module on a device created with the probed extensions and
//! features; if the device cannot be created, the SPIR-V is kept in memory instead.

use anyhow::{bail, Context};
use ash::vk;
use std::ffi::CString;
use std::path::Path;
use tr_core::{Config, Stage};
use tr_shader::module::create_device;
use tr_shader::{
    Bindings, BuildMode, CapabilityProbe, CapabilityRecord, DeviceQuery, LinearEngine, NullModuleFactory,
    RuntimeInfo, ShaderBinary, ShaderManager, ShaderModuleFactory, TranslationProfile, VulkanModuleFactory,
};

/// Vulkan objects kept alive for the translation session
struct Host {
    _entry: ash::Entry,
    instance: ash::Instance,
    device: Option<ash::Device>,
}

impl Drop for Host {
    fn drop(&mut self) {
        unsafe {
            if let Some(device) = self.device.take() {
                device.destroy_device(None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

fn probe_host(config: &Config) -> anyhow::Result<(Host, CapabilityRecord)> {
    let entry = unsafe { ash::Entry::load() }.context("Failed to load Vulkan")?;

    let app_name = CString::new("tegra-recomp")?;
    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_1);
    let create_info = vk::InstanceCreateInfo::default().application_info(&app_info);

    let instance = unsafe { entry.create_instance(&create_info, None) }
        .map_err(|e| anyhow::anyhow!("Failed to create Vulkan instance: {:?}", e))?;
    let mut host = Host {
        _entry: entry,
        instance,
        device: None,
    };

    let devices = unsafe { host.instance.enumerate_physical_devices() }
        .map_err(|e| anyhow::anyhow!("Failed to enumerate physical devices: {:?}", e))?;
    let Some(&physical_device) = devices.first() else {
        bail!("No Vulkan-capable devices found");
    };

    let properties = unsafe { host.instance.get_physical_device_properties(physical_device) };
    let name = properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::info!("Probing {}", name);

    let query = DeviceQuery::query(&host.instance, physical_device);
    let probe = CapabilityProbe::new().with_disabled_extensions(&config.gpu.disabled_extensions);
    let mut result = probe.probe(&query);

    match create_device(&host.instance, physical_device, &mut result.enabled) {
        Ok(device) => host.device = Some(device),
        Err(e) => tracing::warn!("{}; compiling without a device", e),
    }

    Ok((host, result.record))
}

/// Parse, optionally merge, and compile one program; returns the guest instruction count
fn translate<F: ShaderModuleFactory>(
    manager: &ShaderManager<LinearEngine, F>,
    config: &Config,
    stage: Stage,
    path: &Path,
    vertex_a_path: Option<&Path>,
) -> anyhow::Result<(usize, F::Module)> {
    let load = |stage, path: &Path| -> anyhow::Result<ShaderBinary> {
        let window = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(ShaderBinary::scan(stage, 0, &window, config.gpu.max_shader_bytecode_size))
    };
    let bindless = config.gpu.bindless_texture_buffer_index;

    let binary = load(stage, path)?;
    let mut program = manager.parse_graphics_shader(stage, binary.as_bytes(), binary.base_offset, bindless)?;

    if let Some(vertex_a_path) = vertex_a_path {
        if stage != Stage::VertexB {
            bail!("Only a VertexB program can be combined with a VertexA program");
        }
        let vertex_a = load(Stage::VertexA, vertex_a_path)?;
        let vertex_a = manager.parse_graphics_shader(Stage::VertexA, vertex_a.as_bytes(), vertex_a.base_offset, bindless)?;
        program = manager.combine_vertex_shaders(vertex_a, program, binary.as_bytes())?;
    }

    let instructions = program.program().instructions.len();
    let mut bindings = Bindings::default();
    let module = manager.compile_shader(&RuntimeInfo::default(), program, &mut bindings)?;
    Ok((instructions, module))
}

fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    tr_core::logging::init(&config.debug)?;

    tracing::info!("Starting tegra-recomp");
    tracing::debug!("Configuration at {}", Config::config_path().display());

    let (host, caps) = probe_host(&config)?;
    println!("{}", caps.summary());

    let profile = TranslationProfile::from_capabilities(&caps);
    println!("{:#?}", profile);

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [] => Ok(()),
        [stage_name, path, rest @ ..] if rest.len() <= 1 => {
            let Some(stage) = Stage::from_name(stage_name) else {
                bail!("Unknown stage {:?}", stage_name);
            };
            let path = Path::new(path);
            let vertex_a_path = rest.first().map(Path::new);

            match host.device.as_ref() {
                Some(device) => {
                    let factory = VulkanModuleFactory::new(device.clone());
                    let manager = ShaderManager::new(caps, BuildMode::current(), LinearEngine::new(), factory);
                    let (instructions, module) = translate(&manager, &config, stage, path, vertex_a_path)?;
                    println!(
                        "{} program: {} guest instructions -> {:?} module {:?} ({} SPIR-V words)",
                        stage,
                        instructions,
                        module.stage(),
                        module.handle(),
                        module.word_count()
                    );
                }
                None => {
                    let manager =
                        ShaderManager::new(caps, BuildMode::current(), LinearEngine::new(), NullModuleFactory::new());
                    let (instructions, module) = translate(&manager, &config, stage, path, vertex_a_path)?;
                    println!(
                        "{} program: {} guest instructions -> {} SPIR-V words",
                        stage,
                        instructions,
                        module.word_count()
                    );
                }
            }
            Ok(())
        }
        _ => bail!("Usage: tegra-recomp [STAGE PROGRAM [VERTEX_A_PROGRAM]]"),
    }
}
