//! Shader translation sessions
//!
//! A [`ShaderManager`] owns everything that must stay fixed while a set of shaders is
//! translated: the capability record, the profile derived from it and the build-mode settings.
//! It parses guest programs, merges split vertex programs and emits host modules. Every program
//! it hands out is tagged with the session that produced it, and programs from another session
//! are refused.
//!
//! All methods take `&self`, so one manager can serve several compile workers at once.

use crate::caps::CapabilityRecord;
use crate::engine::{Bindings, RuntimeInfo, TranslationEngine};
use crate::environment::{Environment, GraphicsEnvironment, VertexBEnvironment};
use crate::module::ShaderModuleFactory;
use crate::profile::TranslationProfile;
use crate::settings::{BuildMode, TranslationSettings};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tr_core::{EngineError, RecompilerError, Result, Stage};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifies the session a program was parsed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A translated program, tagged with its stage and session
#[derive(Debug)]
pub struct ParsedProgram<P> {
    program: P,
    stage: Stage,
    entry: u32,
    session: SessionId,
}

impl<P> ParsedProgram<P> {
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Guest address of the program's first instruction
    pub fn entry(&self) -> u32 {
        self.entry
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn into_inner(self) -> P {
        self.program
    }
}

/// Attach stage and address context to an engine failure
fn translation_error(stage: Stage, fallback_address: u32, err: EngineError) -> RecompilerError {
    match err {
        EngineError::Environment(err) => RecompilerError::Environment(err),
        EngineError::Diagnostic { address, message } => RecompilerError::Translation {
            stage,
            address: address.unwrap_or(fallback_address),
            message,
        },
    }
}

/// A translation session over one host device
pub struct ShaderManager<E, F> {
    engine: E,
    factory: F,
    caps: CapabilityRecord,
    profile: TranslationProfile,
    settings: TranslationSettings,
    session: SessionId,
}

impl<E: TranslationEngine, F: ShaderModuleFactory> ShaderManager<E, F> {
    /// Start a session, deriving the profile and settings once
    pub fn new(caps: CapabilityRecord, build_mode: BuildMode, engine: E, factory: F) -> Self {
        let profile = TranslationProfile::from_capabilities(&caps);
        let settings = TranslationSettings::for_build(build_mode);
        let session = SessionId::next();

        tracing::debug!(
            "Shader session {} started ({:?} build, SPIR-V 0x{:08x})",
            session,
            build_mode,
            profile.profile.supported_spirv
        );

        Self {
            engine,
            factory,
            caps,
            profile,
            settings,
            session,
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn capabilities(&self) -> &CapabilityRecord {
        &self.caps
    }

    pub fn profile(&self) -> &TranslationProfile {
        &self.profile
    }

    pub fn settings(&self) -> &TranslationSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn check_session<P>(&self, program: &ParsedProgram<P>) -> Result<()> {
        if program.session != self.session {
            return Err(RecompilerError::SessionMismatch {
                program: program.session.get(),
                session: self.session.get(),
            });
        }
        Ok(())
    }

    fn check_stage<P>(program: &ParsedProgram<P>, expected: Stage) -> Result<()> {
        if program.stage != expected {
            return Err(RecompilerError::StageMismatch {
                expected,
                actual: program.stage,
            });
        }
        Ok(())
    }

    /// Translate one graphics program
    ///
    /// `binary` starts with the program header and sits at `base_offset` in the guest address
    /// space. Translation starts at the first instruction after the header.
    pub fn parse_graphics_shader(
        &self,
        stage: Stage,
        binary: &[u8],
        base_offset: u32,
        bindless_texture_buffer_index: u32,
    ) -> Result<ParsedProgram<E::Program>> {
        let env = GraphicsEnvironment::new(stage, binary, base_offset, bindless_texture_buffer_index)?;
        let entry = env.entry_address();

        tracing::debug!(
            "Parsing {} program at 0x{:08x} ({} bytes)",
            stage,
            base_offset,
            binary.len()
        );

        let cfg = self
            .engine
            .build_cfg(&env, entry, &self.settings)
            .map_err(|e| translation_error(stage, entry, e))?;
        let program = self
            .engine
            .translate(&env, cfg, &self.profile.host, &self.settings)
            .map_err(|e| translation_error(stage, entry, e))?;

        Ok(ParsedProgram {
            program,
            stage,
            entry,
            session: self.session,
        })
    }

    /// Merge a split vertex program into one vertex program
    ///
    /// `vertex_a` must be the VertexA half and `vertex_b` the VertexB half; both are consumed.
    /// Only the header of `vertex_b_binary` is consulted.
    pub fn combine_vertex_shaders(
        &self,
        vertex_a: ParsedProgram<E::Program>,
        vertex_b: ParsedProgram<E::Program>,
        vertex_b_binary: &[u8],
    ) -> Result<ParsedProgram<E::Program>> {
        Self::check_stage(&vertex_a, Stage::VertexA)?;
        Self::check_stage(&vertex_b, Stage::VertexB)?;
        self.check_session(&vertex_a)?;
        self.check_session(&vertex_b)?;

        let env = VertexBEnvironment::new(vertex_b_binary)?;
        let entry = vertex_a.entry;
        let program = self
            .engine
            .merge_dual_vertex(vertex_a.program, vertex_b.program, &env, &self.settings)
            .map_err(|e| translation_error(Stage::VertexB, vertex_b.entry, e))?;

        tracing::debug!("Merged VertexA into VertexB");

        Ok(ParsedProgram {
            program,
            stage: Stage::VertexB,
            entry,
            session: self.session,
        })
    }

    /// Emit a program and wrap it into a host shader module
    ///
    /// `bindings` is advanced past the resources the program uses. A VertexA half is refused;
    /// it only runs merged into its VertexB program.
    pub fn compile_shader(
        &self,
        runtime_info: &RuntimeInfo,
        program: ParsedProgram<E::Program>,
        bindings: &mut Bindings,
    ) -> Result<F::Module> {
        if program.stage == Stage::VertexA {
            return Err(RecompilerError::StageMismatch {
                expected: Stage::VertexB,
                actual: Stage::VertexA,
            });
        }
        self.check_session(&program)?;

        let code = self
            .engine
            .emit_spirv(&self.profile.profile, runtime_info, &program.program, bindings, &self.settings)
            .map_err(|e| translation_error(program.stage, program.entry, e))?;

        tracing::debug!("Compiled {} program to {} SPIR-V words", program.stage, code.len());

        Ok(self.factory.create_shader_module(program.stage, &code)?)
    }
}
