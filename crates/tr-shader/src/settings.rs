//! Per-session translation settings
//!
//! The safety-check posture is decided by the build mode when a session is created and never
//! changes afterwards. Each session owns its own copy, so two sessions can't disturb each other.

/// Build flavour that picks the safety-check posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    /// Relaxed internal safety checks and verbose diagnostics
    Debug,
    /// Strict checks and silent operation
    Release,
}

impl BuildMode {
    /// The mode this binary was compiled in
    pub const fn current() -> Self {
        if cfg!(debug_assertions) {
            Self::Debug
        } else {
            Self::Release
        }
    }
}

/// Resolution scaling applied by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ResolutionInfo {
    pub active: bool,
    pub up_scale: u32,
    pub down_shift: u32,
}

/// Settings consulted by the translation engine on every call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslationSettings {
    /// Emit debug names and verbose diagnostics
    pub renderer_debug: bool,
    /// Skip the guards that stop runaway loops in guest code
    pub disable_shader_loop_safety_checks: bool,
    pub resolution_info: ResolutionInfo,
}

impl TranslationSettings {
    pub const fn for_build(mode: BuildMode) -> Self {
        let debug = matches!(mode, BuildMode::Debug);
        Self {
            renderer_debug: debug,
            disable_shader_loop_safety_checks: debug,
            resolution_info: ResolutionInfo {
                active: false,
                up_scale: 1,
                down_shift: 0,
            },
        }
    }
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self::for_build(BuildMode::current())
    }
}
