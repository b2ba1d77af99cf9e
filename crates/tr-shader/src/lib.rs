//! Guest shader translation for tegra-recomp
//!
//! Probes the host GPU, derives the translation profile once per session and drives a
//! translation engine over guest programs:
//!
//! ```text
//! CapabilityProbe -> TranslationProfile -> per shader:
//!     GraphicsEnvironment -> parse -> [combine VertexA + VertexB] -> compile
//! ```

pub mod binary;
pub mod caps;
pub mod engine;
pub mod environment;
pub mod header;
pub mod manager;
pub mod module;
pub mod profile;
pub mod settings;

pub use binary::ShaderBinary;
pub use caps::{CapabilityProbe, CapabilityRecord, DeviceQuery, EnabledFeatures, HostCapabilities, ProbeResult};
pub use engine::{Bindings, LinearEngine, RuntimeInfo, TranslationEngine};
pub use environment::{Environment, GraphicsEnvironment, TextureType, VertexBEnvironment};
pub use header::{ProgramHeader, PROGRAM_HEADER_SIZE};
pub use manager::{ParsedProgram, SessionId, ShaderManager};
pub use module::{NullModuleFactory, ShaderModuleFactory, VulkanModuleFactory};
pub use profile::{HostTranslateInfo, Profile, TranslationProfile};
pub use settings::{BuildMode, TranslationSettings};
