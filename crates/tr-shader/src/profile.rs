//! Translation profile derivation
//!
//! Maps a [`CapabilityRecord`] onto the two configuration bundles the translation engine
//! consumes. The mapping is a pure function of the record and is evaluated once per session.

use crate::caps::{CapabilityRecord, HostCapabilities};
use ash::vk;

/// Number of threads in a warp on the guest GPU
pub const GUEST_WARP_SIZE: u32 = 32;

/// SPIR-V 1.0, always available
pub const SPIRV_VERSION_1_0: u32 = 0x0001_0000;

/// SPIR-V 1.4, available with VK_KHR_spirv_1_4
pub const SPIRV_VERSION_1_4: u32 = 0x0001_0400;

/// What the backend may emit on this host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Profile {
    pub supported_spirv: u32,
    pub unified_descriptor_binding: bool,
    pub support_descriptor_aliasing: bool,
    pub support_int8: bool,
    pub support_int16: bool,
    pub support_int64: bool,
    pub support_vertex_instance_id: bool,
    pub support_float_controls: bool,
    pub support_separate_denorm_behavior: bool,
    pub support_separate_rounding_mode: bool,
    pub support_fp16_denorm_preserve: bool,
    pub support_fp32_denorm_preserve: bool,
    pub support_fp16_denorm_flush: bool,
    pub support_fp32_denorm_flush: bool,
    pub support_fp16_signed_zero_nan_preserve: bool,
    pub support_fp32_signed_zero_nan_preserve: bool,
    pub support_fp64_signed_zero_nan_preserve: bool,
    pub support_explicit_workgroup_layout: bool,
    pub support_vote: bool,
    pub support_viewport_index_layer_non_geometry: bool,
    pub support_viewport_mask: bool,
    pub support_typeless_image_loads: bool,
    pub support_demote_to_helper_invocation: bool,
    pub support_int64_atomics: bool,
    pub support_derivative_control: bool,
    pub support_geometry_shader_passthrough: bool,
    pub warp_size_potentially_larger_than_guest: bool,
    pub lower_left_origin_mode: bool,
    pub need_declared_frag_colors: bool,
}

/// What the frontend may rely on while lowering guest code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostTranslateInfo {
    pub support_float16: bool,
    pub support_int64: bool,
    pub needs_demote_reorder: bool,
}

/// Both bundles derived from one capability record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslationProfile {
    pub profile: Profile,
    pub host: HostTranslateInfo,
}

fn is_set(value: vk::Bool32) -> bool {
    value != vk::FALSE
}

impl TranslationProfile {
    /// Derive the profile for a host
    pub fn from_capabilities(caps: &CapabilityRecord) -> Self {
        let float_controls = caps.float_controls();

        let host = HostTranslateInfo {
            support_float16: caps.supports(HostCapabilities::FLOAT16),
            support_int64: caps.supports(HostCapabilities::INT64),
            needs_demote_reorder: false,
        };

        let profile = Profile {
            supported_spirv: if caps.supports(HostCapabilities::SPIRV_1_4) {
                SPIRV_VERSION_1_4
            } else {
                SPIRV_VERSION_1_0
            },
            unified_descriptor_binding: true,
            support_descriptor_aliasing: true,
            support_int8: caps.supports(HostCapabilities::INT8),
            support_int16: caps.supports(HostCapabilities::INT16),
            support_int64: caps.supports(HostCapabilities::INT64),
            support_vertex_instance_id: false,
            support_float_controls: caps.supports(HostCapabilities::FLOAT_CONTROLS),
            support_separate_denorm_behavior: float_controls.denorm_behavior_independence
                == vk::ShaderFloatControlsIndependence::ALL,
            support_separate_rounding_mode: float_controls.rounding_mode_independence
                == vk::ShaderFloatControlsIndependence::ALL,
            support_fp16_denorm_preserve: is_set(float_controls.denorm_preserve_float16),
            support_fp32_denorm_preserve: is_set(float_controls.denorm_preserve_float32),
            support_fp16_denorm_flush: is_set(float_controls.denorm_flush_to_zero_float16),
            support_fp32_denorm_flush: is_set(float_controls.denorm_flush_to_zero_float32),
            support_fp16_signed_zero_nan_preserve: is_set(float_controls.signed_zero_inf_nan_preserve_float16),
            support_fp32_signed_zero_nan_preserve: is_set(float_controls.signed_zero_inf_nan_preserve_float32),
            support_fp64_signed_zero_nan_preserve: is_set(float_controls.signed_zero_inf_nan_preserve_float64),
            support_explicit_workgroup_layout: false,
            support_vote: caps.supports(HostCapabilities::SUBGROUP_VOTE),
            support_viewport_index_layer_non_geometry: caps.supports(HostCapabilities::SHADER_VIEWPORT_INDEX_LAYER),
            support_viewport_mask: false,
            support_typeless_image_loads: caps.supports(HostCapabilities::IMAGE_READ_WITHOUT_FORMAT),
            support_demote_to_helper_invocation: true,
            support_int64_atomics: caps.supports(HostCapabilities::ATOMIC_INT64),
            support_derivative_control: true,
            support_geometry_shader_passthrough: false,
            warp_size_potentially_larger_than_guest: GUEST_WARP_SIZE < caps.subgroup_size(),
            lower_left_origin_mode: false,
            need_declared_frag_colors: false,
        };

        Self { profile, host }
    }
}
