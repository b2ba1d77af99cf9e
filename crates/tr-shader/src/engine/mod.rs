//! Translation engine interface
//!
//! The control-flow analysis, IR and SPIR-V backend live behind [`TranslationEngine`]; this
//! crate only feeds it environments and configuration. Engines are driven from several worker
//! threads at once through a shared reference, so they take `&self` everywhere.

pub mod linear;
pub mod spirv;

use crate::environment::Environment;
use crate::profile::{HostTranslateInfo, Profile};
use crate::settings::TranslationSettings;
use tr_core::EngineError;

pub use linear::LinearEngine;

/// Primitive topology feeding the first enabled stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputTopology {
    #[default]
    Points,
    Lines,
    LinesAdjacency,
    Triangles,
    TrianglesAdjacency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TessPrimitive {
    Isolines,
    #[default]
    Triangles,
    Quads,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TessSpacing {
    #[default]
    Equal,
    FractionalOdd,
    FractionalEven,
}

/// Alpha test comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessThanEqual,
    Greater,
    NotEqual,
    GreaterThanEqual,
    Always,
}

/// Pipeline state that specialises a program at emission time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RuntimeInfo {
    /// Generic attributes written by the previous stage, one bit per attribute
    pub previous_stage_stores: u64,
    pub input_topology: InputTopology,
    pub tess_primitive: TessPrimitive,
    pub tess_spacing: TessSpacing,
    pub tess_clockwise: bool,
    pub fixed_state_point_size: Option<f32>,
    pub alpha_test_func: Option<CompareFunction>,
    pub alpha_test_reference: f32,
    pub y_negate: bool,
    /// Convert depth from [-1, 1] to [0, 1]
    pub convert_depth_mode: bool,
    pub force_early_z: bool,
}

/// Descriptor binding counters, advanced by each emitted stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bindings {
    pub unified: u32,
    pub uniform_buffer: u32,
    pub storage_buffer: u32,
    pub texture: u32,
    pub image: u32,
    pub texture_scaling_index: u32,
    pub image_scaling_index: u32,
}

/// The external shader translation engine
pub trait TranslationEngine: Send + Sync {
    /// Control-flow graph over a guest program
    type Cfg;
    /// Translated IR program
    type Program: Send;

    /// Build the control-flow graph starting at `entry`
    fn build_cfg(
        &self,
        env: &dyn Environment,
        entry: u32,
        settings: &TranslationSettings,
    ) -> Result<Self::Cfg, EngineError>;

    /// Lower a control-flow graph into an IR program
    fn translate(
        &self,
        env: &dyn Environment,
        cfg: Self::Cfg,
        host: &HostTranslateInfo,
        settings: &TranslationSettings,
    ) -> Result<Self::Program, EngineError>;

    /// Merge the two halves of a split vertex program, `vertex_a` feeding `vertex_b`
    fn merge_dual_vertex(
        &self,
        vertex_a: Self::Program,
        vertex_b: Self::Program,
        vertex_b_env: &dyn Environment,
        settings: &TranslationSettings,
    ) -> Result<Self::Program, EngineError>;

    /// Emit SPIR-V words for a program
    fn emit_spirv(
        &self,
        profile: &Profile,
        runtime_info: &RuntimeInfo,
        program: &Self::Program,
        bindings: &mut Bindings,
        settings: &TranslationSettings,
    ) -> Result<Vec<u32>, EngineError>;
}
