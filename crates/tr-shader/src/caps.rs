//! Host GPU capability probing
//!
//! Checks and stores the quirks of the host GPU discovered at runtime, and decides which
//! extensions and features are requested when the device is created. Nothing here fails:
//! anything that isn't reported by the host is treated as unsupported.

use ash::vk;
use bitflags::bitflags;
use std::ffi::{c_char, CStr};
use std::fmt;

bitflags! {
    /// Boolean host capabilities, in summary order
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HostCapabilities: u32 {
        /// uint8 indices in index buffers (VK_EXT_index_type_uint8)
        const UINT8_INDICES = 1 << 0;
        /// Last vertex as the provoking vertex (VK_EXT_provoking_vertex)
        const LAST_PROVOKING_VERTEX = 1 << 1;
        /// Framebuffer logical operations during blending
        const LOGIC_OP = 1 << 2;
        /// Divisor for instance-rate vertex attributes (VK_EXT_vertex_attribute_divisor)
        const VERTEX_ATTRIBUTE_DIVISOR = 1 << 3;
        /// Zero divisor for instance-rate vertex attributes
        const VERTEX_ATTRIBUTE_ZERO_DIVISOR = 1 << 4;
        /// More than one viewport
        const MULTIPLE_VIEWPORTS = 1 << 5;
        /// Viewport index and layer outside geometry shaders (VK_EXT_shader_viewport_index_layer)
        const SHADER_VIEWPORT_INDEX_LAYER = 1 << 6;
        /// SPIR-V 1.4 modules (VK_KHR_spirv_1_4)
        const SPIRV_1_4 = 1 << 7;
        const FLOAT16 = 1 << 8;
        const INT8 = 1 << 9;
        const INT16 = 1 << 10;
        const INT64 = 1 << 11;
        /// Atomics on 64-bit integers in buffers and shared memory
        const ATOMIC_INT64 = 1 << 12;
        /// Explicit control over FP behavior (VK_KHR_shader_float_controls)
        const FLOAT_CONTROLS = 1 << 13;
        /// Storage image reads without a declared format
        const IMAGE_READ_WITHOUT_FORMAT = 1 << 14;
        /// Subgroup vote operations
        const SUBGROUP_VOTE = 1 << 15;
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::empty()
    }
}

/// Summary labels for every capability, in declaration order
const CAPABILITY_LABELS: [(HostCapabilities, &str); 16] = [
    (HostCapabilities::UINT8_INDICES, "Supports U8 Indices"),
    (HostCapabilities::LAST_PROVOKING_VERTEX, "Supports Last Provoking Vertex"),
    (HostCapabilities::LOGIC_OP, "Supports Logical Operations"),
    (HostCapabilities::VERTEX_ATTRIBUTE_DIVISOR, "Supports Vertex Attribute Divisor"),
    (HostCapabilities::VERTEX_ATTRIBUTE_ZERO_DIVISOR, "Supports Vertex Attribute Zero Divisor"),
    (HostCapabilities::MULTIPLE_VIEWPORTS, "Supports Multiple Viewports"),
    (HostCapabilities::SHADER_VIEWPORT_INDEX_LAYER, "Supports Shader Viewport Index"),
    (HostCapabilities::SPIRV_1_4, "Supports SPIR-V 1.4"),
    (HostCapabilities::FLOAT16, "Supports 16-bit FP"),
    (HostCapabilities::INT8, "Supports 8-bit Integers"),
    (HostCapabilities::INT16, "Supports 16-bit Integers"),
    (HostCapabilities::INT64, "Supports 64-bit Integers"),
    (HostCapabilities::ATOMIC_INT64, "Supports Atomic 64-bit Integers"),
    (HostCapabilities::FLOAT_CONTROLS, "Supports Floating Point Behavior Control"),
    (HostCapabilities::IMAGE_READ_WITHOUT_FORMAT, "Supports Image Read Without Format"),
    (HostCapabilities::SUBGROUP_VOTE, "Supports Subgroup Vote"),
];

bitflags! {
    /// Device extensions the probe looks for
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Extensions: u8 {
        const INDEX_TYPE_UINT8 = 1 << 0;
        const PROVOKING_VERTEX = 1 << 1;
        const VERTEX_ATTRIBUTE_DIVISOR = 1 << 2;
        const SHADER_VIEWPORT_INDEX_LAYER = 1 << 3;
        const SPIRV_1_4 = 1 << 4;
        const SHADER_ATOMIC_INT64 = 1 << 5;
        const SHADER_FLOAT16_INT8 = 1 << 6;
        const SHADER_FLOAT_CONTROLS = 1 << 7;
    }
}

const KNOWN_EXTENSIONS: [(&CStr, Extensions); 8] = [
    (c"VK_EXT_index_type_uint8", Extensions::INDEX_TYPE_UINT8),
    (c"VK_EXT_provoking_vertex", Extensions::PROVOKING_VERTEX),
    (c"VK_EXT_vertex_attribute_divisor", Extensions::VERTEX_ATTRIBUTE_DIVISOR),
    (c"VK_EXT_shader_viewport_index_layer", Extensions::SHADER_VIEWPORT_INDEX_LAYER),
    (c"VK_KHR_spirv_1_4", Extensions::SPIRV_1_4),
    (c"VK_KHR_shader_atomic_int64", Extensions::SHADER_ATOMIC_INT64),
    (c"VK_KHR_shader_float16_int8", Extensions::SHADER_FLOAT16_INT8),
    (c"VK_KHR_shader_float_controls", Extensions::SHADER_FLOAT_CONTROLS),
];

/// Floating-point control properties of the host
///
/// Copied bit-exact from `VkPhysicalDeviceFloatControlsProperties`; all zero when the
/// float controls extension is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloatControls {
    pub denorm_behavior_independence: vk::ShaderFloatControlsIndependence,
    pub rounding_mode_independence: vk::ShaderFloatControlsIndependence,
    pub signed_zero_inf_nan_preserve_float16: vk::Bool32,
    pub signed_zero_inf_nan_preserve_float32: vk::Bool32,
    pub signed_zero_inf_nan_preserve_float64: vk::Bool32,
    pub denorm_preserve_float16: vk::Bool32,
    pub denorm_preserve_float32: vk::Bool32,
    pub denorm_preserve_float64: vk::Bool32,
    pub denorm_flush_to_zero_float16: vk::Bool32,
    pub denorm_flush_to_zero_float32: vk::Bool32,
    pub denorm_flush_to_zero_float64: vk::Bool32,
    pub rounding_mode_rte_float16: vk::Bool32,
    pub rounding_mode_rte_float32: vk::Bool32,
    pub rounding_mode_rte_float64: vk::Bool32,
    pub rounding_mode_rtz_float16: vk::Bool32,
    pub rounding_mode_rtz_float32: vk::Bool32,
    pub rounding_mode_rtz_float64: vk::Bool32,
}

impl Default for FloatControls {
    fn default() -> Self {
        Self {
            denorm_behavior_independence: vk::ShaderFloatControlsIndependence::from_raw(0),
            rounding_mode_independence: vk::ShaderFloatControlsIndependence::from_raw(0),
            signed_zero_inf_nan_preserve_float16: vk::FALSE,
            signed_zero_inf_nan_preserve_float32: vk::FALSE,
            signed_zero_inf_nan_preserve_float64: vk::FALSE,
            denorm_preserve_float16: vk::FALSE,
            denorm_preserve_float32: vk::FALSE,
            denorm_preserve_float64: vk::FALSE,
            denorm_flush_to_zero_float16: vk::FALSE,
            denorm_flush_to_zero_float32: vk::FALSE,
            denorm_flush_to_zero_float64: vk::FALSE,
            rounding_mode_rte_float16: vk::FALSE,
            rounding_mode_rte_float32: vk::FALSE,
            rounding_mode_rte_float64: vk::FALSE,
            rounding_mode_rtz_float16: vk::FALSE,
            rounding_mode_rtz_float32: vk::FALSE,
            rounding_mode_rtz_float64: vk::FALSE,
        }
    }
}

impl From<&vk::PhysicalDeviceFloatControlsProperties<'_>> for FloatControls {
    fn from(properties: &vk::PhysicalDeviceFloatControlsProperties<'_>) -> Self {
        Self {
            denorm_behavior_independence: properties.denorm_behavior_independence,
            rounding_mode_independence: properties.rounding_mode_independence,
            signed_zero_inf_nan_preserve_float16: properties.shader_signed_zero_inf_nan_preserve_float16,
            signed_zero_inf_nan_preserve_float32: properties.shader_signed_zero_inf_nan_preserve_float32,
            signed_zero_inf_nan_preserve_float64: properties.shader_signed_zero_inf_nan_preserve_float64,
            denorm_preserve_float16: properties.shader_denorm_preserve_float16,
            denorm_preserve_float32: properties.shader_denorm_preserve_float32,
            denorm_preserve_float64: properties.shader_denorm_preserve_float64,
            denorm_flush_to_zero_float16: properties.shader_denorm_flush_to_zero_float16,
            denorm_flush_to_zero_float32: properties.shader_denorm_flush_to_zero_float32,
            denorm_flush_to_zero_float64: properties.shader_denorm_flush_to_zero_float64,
            rounding_mode_rte_float16: properties.shader_rounding_mode_rte_float16,
            rounding_mode_rte_float32: properties.shader_rounding_mode_rte_float32,
            rounding_mode_rte_float64: properties.shader_rounding_mode_rte_float64,
            rounding_mode_rtz_float16: properties.shader_rounding_mode_rtz_float16,
            rounding_mode_rtz_float32: properties.shader_rounding_mode_rtz_float32,
            rounding_mode_rtz_float64: properties.shader_rounding_mode_rtz_float64,
        }
    }
}

/// Immutable record of what the host GPU supports
///
/// Built once per host device by [`CapabilityProbe::probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityRecord {
    flags: HostCapabilities,
    float_controls: FloatControls,
    subgroup_size: u32,
}

impl CapabilityRecord {
    /// Create a record from already-known values
    pub fn new(flags: HostCapabilities, float_controls: FloatControls, subgroup_size: u32) -> Self {
        Self {
            flags,
            float_controls,
            subgroup_size,
        }
    }

    pub fn flags(&self) -> HostCapabilities {
        self.flags
    }

    pub fn supports(&self, capability: HostCapabilities) -> bool {
        self.flags.contains(capability)
    }

    pub fn float_controls(&self) -> &FloatControls {
        &self.float_controls
    }

    /// Size of a subgroup on the host GPU
    pub fn subgroup_size(&self) -> u32 {
        self.subgroup_size
    }

    /// A summary of all the GPU quirks as a human-readable string
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CapabilityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (capability, label) in CAPABILITY_LABELS {
            writeln!(f, "* {}: {}", label, self.flags.contains(capability))?;
        }
        write!(f, "* Subgroup Size: {}", self.subgroup_size)
    }
}

/// Raw feature, extension and property query results for one physical device
#[derive(Debug, Clone, Default)]
pub struct DeviceQuery {
    pub extensions: Vec<vk::ExtensionProperties>,
    pub features: vk::PhysicalDeviceFeatures,
    pub vertex_attribute_divisor: vk::PhysicalDeviceVertexAttributeDivisorFeaturesEXT<'static>,
    pub float16_int8: vk::PhysicalDeviceShaderFloat16Int8Features<'static>,
    pub atomic_int64: vk::PhysicalDeviceShaderAtomicInt64Features<'static>,
    pub float_controls: vk::PhysicalDeviceFloatControlsProperties<'static>,
    pub subgroup: vk::PhysicalDeviceSubgroupProperties<'static>,
}

impl DeviceQuery {
    /// Query a physical device through a Vulkan 1.1+ instance
    pub fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let extensions = match unsafe { instance.enumerate_device_extension_properties(physical_device) } {
            Ok(extensions) => extensions,
            Err(e) => {
                tracing::warn!("Failed to enumerate device extensions, probing without any: {:?}", e);
                Vec::new()
            }
        };

        let mut vertex_attribute_divisor = vk::PhysicalDeviceVertexAttributeDivisorFeaturesEXT::default();
        let mut float16_int8 = vk::PhysicalDeviceShaderFloat16Int8Features::default();
        let mut atomic_int64 = vk::PhysicalDeviceShaderAtomicInt64Features::default();
        let features = {
            let mut features2 = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut vertex_attribute_divisor)
                .push_next(&mut float16_int8)
                .push_next(&mut atomic_int64);
            unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
            features2.features
        };

        let mut float_controls = vk::PhysicalDeviceFloatControlsProperties::default();
        let mut subgroup = vk::PhysicalDeviceSubgroupProperties::default();
        {
            let mut properties2 = vk::PhysicalDeviceProperties2::default()
                .push_next(&mut float_controls)
                .push_next(&mut subgroup);
            unsafe { instance.get_physical_device_properties2(physical_device, &mut properties2) };
        }

        // The chain pointed at stack locals; the stored copies stand alone.
        vertex_attribute_divisor.p_next = std::ptr::null_mut();
        float16_int8.p_next = std::ptr::null_mut();
        atomic_int64.p_next = std::ptr::null_mut();
        float_controls.p_next = std::ptr::null_mut();
        subgroup.p_next = std::ptr::null_mut();

        Self {
            extensions,
            features,
            vertex_attribute_divisor,
            float16_int8,
            atomic_int64,
            float_controls,
            subgroup,
        }
    }

    /// Append an extension to the reported list
    pub fn with_extension(mut self, name: &CStr, spec_version: u32) -> Self {
        let mut properties = vk::ExtensionProperties::default();
        properties.spec_version = spec_version;
        // Keep the trailing NUL inside the fixed-size array.
        let limit = properties.extension_name.len() - 1;
        for (dst, &src) in properties.extension_name.iter_mut().zip(name.to_bytes()).take(limit) {
            *dst = src as c_char;
        }
        self.extensions.push(properties);
        self
    }
}

/// Extensions and features requested for enablement at device creation
///
/// Optional feature structs are `None` when their extension is absent and must not be chained.
#[derive(Debug, Clone, Default)]
pub struct EnabledFeatures {
    pub extensions: Vec<&'static CStr>,
    pub features: vk::PhysicalDeviceFeatures,
    pub vertex_attribute_divisor: Option<vk::PhysicalDeviceVertexAttributeDivisorFeaturesEXT<'static>>,
    pub float16_int8: Option<vk::PhysicalDeviceShaderFloat16Int8Features<'static>>,
    pub atomic_int64: Option<vk::PhysicalDeviceShaderAtomicInt64Features<'static>>,
}

impl EnabledFeatures {
    /// Extension name pointers for `VkDeviceCreateInfo`
    pub fn extension_names(&self) -> Vec<*const c_char> {
        self.extensions.iter().map(|name| name.as_ptr()).collect()
    }

    /// Build the feature chain for `VkDeviceCreateInfo::pNext`, linking only kept structs
    pub fn features2(&mut self) -> vk::PhysicalDeviceFeatures2<'_> {
        let mut features2 = vk::PhysicalDeviceFeatures2::default().features(self.features);
        if let Some(divisor) = self.vertex_attribute_divisor.as_mut() {
            features2 = features2.push_next(divisor);
        }
        if let Some(float16_int8) = self.float16_int8.as_mut() {
            features2 = features2.push_next(float16_int8);
        }
        if let Some(atomic_int64) = self.atomic_int64.as_mut() {
            features2 = features2.push_next(atomic_int64);
        }
        features2
    }
}

/// Result of probing one device
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub record: CapabilityRecord,
    pub enabled: EnabledFeatures,
}

/// Derives a [`CapabilityRecord`] from device query results
#[derive(Debug, Clone, Default)]
pub struct CapabilityProbe {
    disabled_extensions: Vec<String>,
}

/// Enable a feature iff the host reports it
fn enable(reported: vk::Bool32, enabled: &mut vk::Bool32) -> bool {
    if reported != vk::FALSE {
        *enabled = vk::TRUE;
        true
    } else {
        false
    }
}

fn extension_name(properties: &vk::ExtensionProperties) -> Option<&CStr> {
    let bytes: &[u8] = bytemuck::cast_slice(&properties.extension_name);
    CStr::from_bytes_until_nul(bytes).ok()
}

impl CapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat the named extensions as absent even when the host reports them
    pub fn with_disabled_extensions(mut self, names: &[String]) -> Self {
        self.disabled_extensions.extend(names.iter().cloned());
        self
    }

    fn is_disabled(&self, name: &CStr) -> bool {
        let name = name.to_bytes();
        self.disabled_extensions.iter().any(|disabled| disabled.as_bytes() == name)
    }

    /// Probe the query results, requesting enablement only for what exists
    pub fn probe(&self, query: &DeviceQuery) -> ProbeResult {
        let mut present = Extensions::empty();
        let mut enabled = EnabledFeatures::default();

        for properties in &query.extensions {
            let Some(name) = extension_name(properties) else {
                continue;
            };
            let Some(&(known_name, extension)) = KNOWN_EXTENSIONS.iter().find(|(known, _)| *known == name) else {
                continue;
            };
            if self.is_disabled(name) {
                tracing::debug!("Ignoring disabled extension {:?}", name);
                continue;
            }
            if !present.contains(extension) {
                tracing::debug!("Enabling extension {:?} (spec version {})", name, properties.spec_version);
                present |= extension;
                enabled.extensions.push(known_name);
            }
        }

        let mut flags = HostCapabilities::empty();
        flags.set(HostCapabilities::UINT8_INDICES, present.contains(Extensions::INDEX_TYPE_UINT8));
        flags.set(HostCapabilities::LAST_PROVOKING_VERTEX, present.contains(Extensions::PROVOKING_VERTEX));
        flags.set(
            HostCapabilities::SHADER_VIEWPORT_INDEX_LAYER,
            present.contains(Extensions::SHADER_VIEWPORT_INDEX_LAYER),
        );
        flags.set(HostCapabilities::SPIRV_1_4, present.contains(Extensions::SPIRV_1_4));
        flags.set(HostCapabilities::FLOAT_CONTROLS, present.contains(Extensions::SHADER_FLOAT_CONTROLS));

        let reported = &query.features;
        let requested = &mut enabled.features;
        flags.set(HostCapabilities::LOGIC_OP, enable(reported.logic_op, &mut requested.logic_op));
        flags.set(
            HostCapabilities::MULTIPLE_VIEWPORTS,
            enable(reported.multi_viewport, &mut requested.multi_viewport),
        );
        flags.set(HostCapabilities::INT16, enable(reported.shader_int16, &mut requested.shader_int16));
        flags.set(HostCapabilities::INT64, enable(reported.shader_int64, &mut requested.shader_int64));
        flags.set(
            HostCapabilities::IMAGE_READ_WITHOUT_FORMAT,
            enable(
                reported.shader_storage_image_read_without_format,
                &mut requested.shader_storage_image_read_without_format,
            ),
        );

        if present.contains(Extensions::VERTEX_ATTRIBUTE_DIVISOR) {
            let reported = &query.vertex_attribute_divisor;
            let mut divisor = vk::PhysicalDeviceVertexAttributeDivisorFeaturesEXT::default();
            flags.set(
                HostCapabilities::VERTEX_ATTRIBUTE_DIVISOR,
                enable(
                    reported.vertex_attribute_instance_rate_divisor,
                    &mut divisor.vertex_attribute_instance_rate_divisor,
                ),
            );
            flags.set(
                HostCapabilities::VERTEX_ATTRIBUTE_ZERO_DIVISOR,
                enable(
                    reported.vertex_attribute_instance_rate_zero_divisor,
                    &mut divisor.vertex_attribute_instance_rate_zero_divisor,
                ),
            );
            enabled.vertex_attribute_divisor = Some(divisor);
        }

        let atomics = &query.atomic_int64;
        if present.contains(Extensions::SHADER_ATOMIC_INT64)
            && atomics.shader_buffer_int64_atomics != vk::FALSE
            && atomics.shader_shared_int64_atomics != vk::FALSE
        {
            flags.insert(HostCapabilities::ATOMIC_INT64);
            enabled.atomic_int64 = Some(
                vk::PhysicalDeviceShaderAtomicInt64Features::default()
                    .shader_buffer_int64_atomics(true)
                    .shader_shared_int64_atomics(true),
            );
        }

        if present.contains(Extensions::SHADER_FLOAT16_INT8) {
            let reported = &query.float16_int8;
            let mut float16_int8 = vk::PhysicalDeviceShaderFloat16Int8Features::default();
            flags.set(
                HostCapabilities::FLOAT16,
                enable(reported.shader_float16, &mut float16_int8.shader_float16),
            );
            flags.set(HostCapabilities::INT8, enable(reported.shader_int8, &mut float16_int8.shader_int8));
            enabled.float16_int8 = Some(float16_int8);
        }

        let float_controls = if flags.contains(HostCapabilities::FLOAT_CONTROLS) {
            FloatControls::from(&query.float_controls)
        } else {
            FloatControls::default()
        };

        flags.set(
            HostCapabilities::SUBGROUP_VOTE,
            query.subgroup.supported_operations.contains(vk::SubgroupFeatureFlags::VOTE),
        );

        let record = CapabilityRecord::new(flags, float_controls, query.subgroup.subgroup_size);
        tracing::info!("Host GPU capabilities:\n{}", record);

        ProbeResult { record, enabled }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_query() -> DeviceQuery {
        let mut query = KNOWN_EXTENSIONS
            .iter()
            .fold(DeviceQuery::default(), |query, (name, _)| query.with_extension(name, 1));
        query.features.logic_op = vk::TRUE;
        query.features.multi_viewport = vk::TRUE;
        query.features.shader_int16 = vk::TRUE;
        query.features.shader_int64 = vk::TRUE;
        query.features.shader_storage_image_read_without_format = vk::TRUE;
        query.vertex_attribute_divisor.vertex_attribute_instance_rate_divisor = vk::TRUE;
        query.vertex_attribute_divisor.vertex_attribute_instance_rate_zero_divisor = vk::TRUE;
        query.float16_int8.shader_float16 = vk::TRUE;
        query.float16_int8.shader_int8 = vk::TRUE;
        query.atomic_int64.shader_buffer_int64_atomics = vk::TRUE;
        query.atomic_int64.shader_shared_int64_atomics = vk::TRUE;
        query.float_controls.denorm_behavior_independence = vk::ShaderFloatControlsIndependence::ALL;
        query.float_controls.shader_denorm_preserve_float16 = vk::TRUE;
        query.subgroup.supported_operations = vk::SubgroupFeatureFlags::BASIC | vk::SubgroupFeatureFlags::VOTE;
        query.subgroup.subgroup_size = 64;
        query
    }

    #[test]
    fn test_empty_query_fails_open() {
        let result = CapabilityProbe::new().probe(&DeviceQuery::default());
        assert!(result.record.flags().is_empty());
        assert_eq!(result.record.subgroup_size(), 0);
        assert_eq!(*result.record.float_controls(), FloatControls::default());
        assert!(result.enabled.extensions.is_empty());
        assert!(result.enabled.vertex_attribute_divisor.is_none());
        assert!(result.enabled.float16_int8.is_none());
        assert!(result.enabled.atomic_int64.is_none());
    }

    #[test]
    fn test_full_query_enables_everything() {
        let mut result = CapabilityProbe::new().probe(&full_query());
        assert_eq!(result.record.flags(), HostCapabilities::all());
        assert_eq!(result.record.subgroup_size(), 64);
        assert_eq!(result.enabled.extensions.len(), KNOWN_EXTENSIONS.len());
        assert_eq!(result.enabled.features.logic_op, vk::TRUE);
        assert_eq!(result.enabled.features.shader_int64, vk::TRUE);
        assert_eq!(result.enabled.extension_names().len(), KNOWN_EXTENSIONS.len());

        let features2 = result.enabled.features2();
        assert!(!features2.p_next.is_null());
    }

    #[test]
    fn test_feature_without_extension_is_not_enabled() {
        let mut query = DeviceQuery::default();
        query.float16_int8.shader_float16 = vk::TRUE;
        query.vertex_attribute_divisor.vertex_attribute_instance_rate_divisor = vk::TRUE;
        query.atomic_int64.shader_buffer_int64_atomics = vk::TRUE;
        query.atomic_int64.shader_shared_int64_atomics = vk::TRUE;

        let result = CapabilityProbe::new().probe(&query);
        assert!(!result.record.supports(HostCapabilities::FLOAT16));
        assert!(!result.record.supports(HostCapabilities::VERTEX_ATTRIBUTE_DIVISOR));
        assert!(!result.record.supports(HostCapabilities::ATOMIC_INT64));
    }

    #[test]
    fn test_extension_without_feature_is_not_enabled() {
        let query = DeviceQuery::default()
            .with_extension(c"VK_KHR_shader_float16_int8", 1)
            .with_extension(c"VK_EXT_vertex_attribute_divisor", 3);

        let result = CapabilityProbe::new().probe(&query);
        assert!(!result.record.supports(HostCapabilities::FLOAT16));
        assert!(!result.record.supports(HostCapabilities::INT8));
        assert!(!result.record.supports(HostCapabilities::VERTEX_ATTRIBUTE_DIVISOR));

        // The structs stay linked for their extension, with nothing requested.
        let float16_int8 = result.enabled.float16_int8.unwrap();
        assert_eq!(float16_int8.shader_float16, vk::FALSE);
        assert!(result.enabled.vertex_attribute_divisor.is_some());
    }

    #[test]
    fn test_atomic_int64_needs_both_atomics() {
        let mut query = DeviceQuery::default().with_extension(c"VK_KHR_shader_atomic_int64", 1);
        query.atomic_int64.shader_buffer_int64_atomics = vk::TRUE;

        let result = CapabilityProbe::new().probe(&query);
        assert!(!result.record.supports(HostCapabilities::ATOMIC_INT64));
        assert!(result.enabled.atomic_int64.is_none());
        assert_eq!(result.enabled.extensions, vec![c"VK_KHR_shader_atomic_int64"]);
    }

    #[test]
    fn test_float_controls_zeroed_without_extension() {
        let mut query = full_query();
        query.extensions.retain(|properties| {
            extension_name(properties) != Some(c"VK_KHR_shader_float_controls")
        });

        let result = CapabilityProbe::new().probe(&query);
        assert!(!result.record.supports(HostCapabilities::FLOAT_CONTROLS));
        assert_eq!(*result.record.float_controls(), FloatControls::default());
    }

    #[test]
    fn test_float_controls_copied_bit_exact() {
        let query = full_query();
        let result = CapabilityProbe::new().probe(&query);
        let controls = result.record.float_controls();
        assert_eq!(controls.denorm_behavior_independence, vk::ShaderFloatControlsIndependence::ALL);
        assert_eq!(controls.denorm_preserve_float16, vk::TRUE);
        assert_eq!(*controls, FloatControls::from(&query.float_controls));
    }

    #[test]
    fn test_disabled_extensions() {
        let probe = CapabilityProbe::new().with_disabled_extensions(&["VK_KHR_spirv_1_4".to_string()]);
        let result = probe.probe(&full_query());
        assert!(!result.record.supports(HostCapabilities::SPIRV_1_4));
        assert!(!result.enabled.extensions.contains(&c"VK_KHR_spirv_1_4"));
        assert!(result.record.supports(HostCapabilities::UINT8_INDICES));
    }

    #[test]
    fn test_duplicate_extension_enabled_once() {
        let query = DeviceQuery::default()
            .with_extension(c"VK_KHR_spirv_1_4", 1)
            .with_extension(c"VK_KHR_spirv_1_4", 1);
        let result = CapabilityProbe::new().probe(&query);
        assert_eq!(result.enabled.extensions.len(), 1);
    }

    #[test]
    fn test_summary_order() {
        let record = CapabilityRecord::new(HostCapabilities::SPIRV_1_4, FloatControls::default(), 32);
        let summary = record.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), CAPABILITY_LABELS.len() + 1);
        assert_eq!(lines[0], "* Supports U8 Indices: false");
        assert_eq!(lines[7], "* Supports SPIR-V 1.4: true");
        assert_eq!(lines[16], "* Subgroup Size: 32");
    }
}
