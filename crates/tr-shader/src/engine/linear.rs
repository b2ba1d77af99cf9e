//! Linear reference engine
//!
//! A stand-in for the full translation engine. It follows straight-line code from the entry
//! point, keeps the raw instruction words and emits a minimal module with the right execution
//! model, capabilities and memory declarations. It never interprets guest instructions.

use super::spirv::*;
use super::{Bindings, InputTopology, RuntimeInfo, TessPrimitive, TessSpacing, TranslationEngine};
use crate::binary::{BRA_SELF, INSTRUCTION_SIZE};
use crate::environment::Environment;
use crate::header::ProgramHeader;
use crate::profile::{HostTranslateInfo, Profile};
use crate::settings::TranslationSettings;
use tr_core::{EngineError, Stage};

/// Instruction cap when loop safety checks are on
pub const MAX_LINEAR_INSTRUCTIONS: usize = 256 * 1024;

/// Every 32-byte group opens with a scheduling control word
const SCHED_GROUP_SIZE: u32 = 32;

const OPCODE_EXIT: u64 = 0xE30;

fn is_exit(word: u64) -> bool {
    word >> 52 == OPCODE_EXIT
}

/// Straight-line walk over a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearCfg {
    pub stage: Stage,
    pub entry: u32,
    /// Instruction words in program order, scheduling words excluded
    pub instructions: Vec<u64>,
}

/// A program as the linear engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearProgram {
    pub stage: Stage,
    pub entry: u32,
    pub instructions: Vec<u64>,
    pub local_memory_size: u32,
    pub shared_memory_size: u32,
    pub workgroup_size: [u32; 3],
    pub header: ProgramHeader,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearEngine;

impl LinearEngine {
    pub fn new() -> Self {
        Self
    }
}

fn execution_model(stage: Stage) -> u32 {
    match stage {
        Stage::VertexA | Stage::VertexB => EXEC_MODEL_VERTEX,
        Stage::TessellationControl => EXEC_MODEL_TESSELLATION_CONTROL,
        Stage::TessellationEval => EXEC_MODEL_TESSELLATION_EVALUATION,
        Stage::Geometry => EXEC_MODEL_GEOMETRY,
        Stage::Fragment => EXEC_MODEL_FRAGMENT,
        Stage::Compute => EXEC_MODEL_GL_COMPUTE,
    }
}

fn input_primitive_mode(topology: InputTopology) -> u32 {
    match topology {
        InputTopology::Points => EXEC_MODE_INPUT_POINTS,
        InputTopology::Lines => EXEC_MODE_INPUT_LINES,
        InputTopology::LinesAdjacency => EXEC_MODE_INPUT_LINES_ADJACENCY,
        InputTopology::Triangles => EXEC_MODE_TRIANGLES,
        InputTopology::TrianglesAdjacency => EXEC_MODE_INPUT_TRIANGLES_ADJACENCY,
    }
}

/// Geometry output topology from the header: 1 points, 6 line strip, 7 triangle strip
fn output_primitive_mode(header: &ProgramHeader) -> u32 {
    match header.output_topology() {
        1 => EXEC_MODE_OUTPUT_POINTS,
        6 => EXEC_MODE_OUTPUT_LINE_STRIP,
        _ => EXEC_MODE_OUTPUT_TRIANGLE_STRIP,
    }
}

fn add_execution_modes(
    builder: &mut SpirVBuilder,
    main: u32,
    program: &LinearProgram,
    runtime_info: &RuntimeInfo,
) {
    match program.stage {
        Stage::VertexA | Stage::VertexB => {}
        Stage::TessellationControl => {
            let vertices = program.header.threads_per_input_primitive().max(1);
            builder.add_execution_mode(main, EXEC_MODE_OUTPUT_VERTICES, &[vertices]);
        }
        Stage::TessellationEval => {
            let primitive = match runtime_info.tess_primitive {
                TessPrimitive::Isolines => EXEC_MODE_ISOLINES,
                TessPrimitive::Triangles => EXEC_MODE_TRIANGLES,
                TessPrimitive::Quads => EXEC_MODE_QUADS,
            };
            let spacing = match runtime_info.tess_spacing {
                TessSpacing::Equal => EXEC_MODE_SPACING_EQUAL,
                TessSpacing::FractionalOdd => EXEC_MODE_SPACING_FRACTIONAL_ODD,
                TessSpacing::FractionalEven => EXEC_MODE_SPACING_FRACTIONAL_EVEN,
            };
            let order = if runtime_info.tess_clockwise {
                EXEC_MODE_VERTEX_ORDER_CW
            } else {
                EXEC_MODE_VERTEX_ORDER_CCW
            };
            builder.add_execution_mode(main, primitive, &[]);
            builder.add_execution_mode(main, spacing, &[]);
            builder.add_execution_mode(main, order, &[]);
        }
        Stage::Geometry => {
            let invocations = program.header.threads_per_input_primitive().max(1);
            let vertices = program.header.max_output_vertices().max(1);
            builder.add_execution_mode(main, input_primitive_mode(runtime_info.input_topology), &[]);
            builder.add_execution_mode(main, output_primitive_mode(&program.header), &[]);
            builder.add_execution_mode(main, EXEC_MODE_INVOCATIONS, &[invocations]);
            builder.add_execution_mode(main, EXEC_MODE_OUTPUT_VERTICES, &[vertices]);
        }
        Stage::Fragment => {
            builder.add_execution_mode(main, EXEC_MODE_ORIGIN_UPPER_LEFT, &[]);
            if runtime_info.force_early_z {
                builder.add_execution_mode(main, EXEC_MODE_EARLY_FRAGMENT_TESTS, &[]);
            }
        }
        Stage::Compute => {
            let size = program.workgroup_size.map(|dim| dim.max(1));
            builder.add_execution_mode(main, EXEC_MODE_LOCAL_SIZE, &size);
        }
    }
}

impl TranslationEngine for LinearEngine {
    type Cfg = LinearCfg;
    type Program = LinearProgram;

    fn build_cfg(
        &self,
        env: &dyn Environment,
        entry: u32,
        settings: &TranslationSettings,
    ) -> Result<LinearCfg, EngineError> {
        let mut instructions = Vec::new();
        let mut address = entry;

        loop {
            let offset = address.wrapping_sub(entry);
            if offset % SCHED_GROUP_SIZE == 0 {
                address = address.wrapping_add(INSTRUCTION_SIZE as u32);
                continue;
            }

            if !settings.disable_shader_loop_safety_checks && instructions.len() >= MAX_LINEAR_INSTRUCTIONS {
                return Err(EngineError::at(
                    address,
                    format!("Program exceeds {} instructions", MAX_LINEAR_INSTRUCTIONS),
                ));
            }

            let word = env.read_instruction(address)?;
            tracing::trace!("0x{:08x}: {:016x}", address, word);

            if BRA_SELF.contains(&word) {
                break;
            }
            instructions.push(word);
            if is_exit(word) {
                break;
            }
            address = address.wrapping_add(INSTRUCTION_SIZE as u32);
        }

        Ok(LinearCfg {
            stage: env.stage(),
            entry,
            instructions,
        })
    }

    fn translate(
        &self,
        env: &dyn Environment,
        cfg: LinearCfg,
        _host: &HostTranslateInfo,
        _settings: &TranslationSettings,
    ) -> Result<LinearProgram, EngineError> {
        Ok(LinearProgram {
            stage: cfg.stage,
            entry: cfg.entry,
            instructions: cfg.instructions,
            local_memory_size: env.local_memory_size(),
            shared_memory_size: env.shared_memory_size(),
            workgroup_size: env.workgroup_size(),
            header: *env.header(),
        })
    }

    fn merge_dual_vertex(
        &self,
        vertex_a: LinearProgram,
        vertex_b: LinearProgram,
        vertex_b_env: &dyn Environment,
        _settings: &TranslationSettings,
    ) -> Result<LinearProgram, EngineError> {
        let mut instructions = vertex_a.instructions;
        instructions.extend(vertex_b.instructions);

        Ok(LinearProgram {
            stage: Stage::VertexB,
            entry: vertex_a.entry,
            instructions,
            local_memory_size: vertex_a.local_memory_size.max(vertex_b_env.local_memory_size()),
            shared_memory_size: 0,
            workgroup_size: [0, 0, 0],
            header: *vertex_b_env.header(),
        })
    }

    fn emit_spirv(
        &self,
        profile: &Profile,
        runtime_info: &RuntimeInfo,
        program: &LinearProgram,
        _bindings: &mut Bindings,
        settings: &TranslationSettings,
    ) -> Result<Vec<u32>, EngineError> {
        let mut builder = SpirVBuilder::new(profile.supported_spirv);

        builder.add_capability(CAP_SHADER);
        match program.stage {
            Stage::TessellationControl | Stage::TessellationEval => builder.add_capability(CAP_TESSELLATION),
            Stage::Geometry => builder.add_capability(CAP_GEOMETRY),
            _ => {}
        }
        if profile.support_int8 {
            builder.add_capability(CAP_INT8);
        }
        if profile.support_int16 {
            builder.add_capability(CAP_INT16);
        }
        if profile.support_int64 {
            builder.add_capability(CAP_INT64);
        }
        if profile.support_int64_atomics {
            builder.add_capability(CAP_INT64_ATOMICS);
        }
        if profile.support_derivative_control {
            builder.add_capability(CAP_DERIVATIVE_CONTROL);
        }
        builder.add_memory_model();
        builder.add_basic_types();

        let local_words = program.local_memory_size.div_ceil(4);
        let local_memory = (local_words > 0).then(|| builder.add_private_uint_array(local_words));

        let main = builder.add_empty_function();
        builder.add_entry_point(execution_model(program.stage), main, "main");
        add_execution_modes(&mut builder, main, program, runtime_info);

        if settings.renderer_debug {
            builder.add_name(main, "main");
            if let Some(local_memory) = local_memory {
                builder.add_name(local_memory, "local_memory");
            }
        }

        let code = builder.build();
        tracing::debug!(
            "Emitted {} words for {} program ({} guest instructions)",
            code.len(),
            program.stage,
            program.instructions.len()
        );
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::GraphicsEnvironment;
    use crate::profile::SPIRV_VERSION_1_4;
    use crate::settings::BuildMode;
    use tr_core::EnvironmentError;

    const NOP: u64 = 0x50B0_0000_0007_0F00;
    const EXIT: u64 = 0xE300_0000_0007_000F;
    const SCHED: u64 = 0x001F_8000_FFE0_07F0;

    fn program(words: &[u64]) -> Vec<u8> {
        let header = ProgramHeader::new().with_shader_type(1, 1).with_local_memory_size(64);
        let mut data = header.to_bytes().to_vec();
        for word in words {
            data.extend_from_slice(&word.to_le_bytes());
        }
        data
    }

    fn release() -> TranslationSettings {
        TranslationSettings::for_build(BuildMode::Release)
    }

    #[test]
    fn test_cfg_skips_scheduling_words() {
        let data = program(&[SCHED, NOP, NOP, NOP, SCHED, EXIT, BRA_SELF[0]]);
        let env = GraphicsEnvironment::new(Stage::VertexB, &data, 0x100, 0).unwrap();
        let cfg = LinearEngine.build_cfg(&env, env.entry_address(), &release()).unwrap();

        assert_eq!(cfg.instructions, vec![NOP, NOP, NOP, EXIT]);
        assert_eq!(cfg.entry, 0x150);
    }

    #[test]
    fn test_cfg_stops_at_padding() {
        let data = program(&[SCHED, NOP, BRA_SELF[1], NOP]);
        let env = GraphicsEnvironment::new(Stage::Fragment, &data, 0, 0).unwrap();
        let cfg = LinearEngine.build_cfg(&env, env.entry_address(), &release()).unwrap();
        assert_eq!(cfg.instructions, vec![NOP]);
    }

    #[test]
    fn test_cfg_running_off_the_window() {
        let data = program(&[SCHED, NOP, NOP]);
        let env = GraphicsEnvironment::new(Stage::Fragment, &data, 0, 0).unwrap();
        let err = LinearEngine.build_cfg(&env, env.entry_address(), &release()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Environment(EnvironmentError::OutOfBounds { address: 0x68, .. })
        ));
    }

    #[test]
    fn test_translate_records_memory() {
        let data = program(&[SCHED, EXIT]);
        let env = GraphicsEnvironment::new(Stage::VertexA, &data, 0, 0).unwrap();
        let settings = release();
        let host = HostTranslateInfo {
            support_float16: false,
            support_int64: false,
            needs_demote_reorder: false,
        };
        let cfg = LinearEngine.build_cfg(&env, env.entry_address(), &settings).unwrap();
        let program = LinearEngine.translate(&env, cfg, &host, &settings).unwrap();

        assert_eq!(program.stage, Stage::VertexA);
        assert_eq!(program.local_memory_size, 64);
        assert_eq!(program.instructions, vec![EXIT]);
    }

    #[test]
    fn test_emit_debug_names() {
        let caps = crate::caps::CapabilityRecord::new(
            crate::caps::HostCapabilities::SPIRV_1_4,
            crate::caps::FloatControls::default(),
            32,
        );
        let profile = crate::profile::TranslationProfile::from_capabilities(&caps).profile;
        let program = LinearProgram {
            stage: Stage::Fragment,
            entry: 0x50,
            instructions: vec![EXIT],
            local_memory_size: 16,
            shared_memory_size: 0,
            workgroup_size: [0, 0, 0],
            header: ProgramHeader::new(),
        };
        let mut bindings = Bindings::default();
        let emit = |mode| {
            LinearEngine
                .emit_spirv(
                    &profile,
                    &RuntimeInfo::default(),
                    &program,
                    &mut bindings.clone(),
                    &TranslationSettings::for_build(mode),
                )
                .unwrap()
        };

        let debug = emit(BuildMode::Debug);
        let release_words = emit(BuildMode::Release);
        assert_eq!(debug[1], SPIRV_VERSION_1_4);
        assert!(debug.len() > release_words.len());

        let has_name = |words: &[u32]| words.iter().any(|&word| word == ((4 << 16) | 5));
        assert!(has_name(&debug));
        assert!(!has_name(&release_words));

        LinearEngine
            .emit_spirv(&profile, &RuntimeInfo::default(), &program, &mut bindings, &release())
            .unwrap();
        assert_eq!(bindings, Bindings::default());
    }
}
