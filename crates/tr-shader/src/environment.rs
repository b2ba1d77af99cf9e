//! Shader environments
//!
//! An environment is everything the translation engine may ask about a guest program while
//! translating it: instruction words, constant buffer contents, texture types and the memory
//! sizes declared by the program header. Every query is fallible; an engine that asks for
//! something an environment can't answer gets an error value back instead of garbage.

use crate::header::{ProgramHeader, PROGRAM_HEADER_SIZE};
use tr_core::{EnvironmentError, Stage};

/// Texture dimensionality resolved from a bindless handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Color1D,
    ColorArray1D,
    Color2D,
    ColorArray2D,
    Color3D,
    ColorCube,
    ColorArrayCube,
    Buffer,
    Color2DRect,
}

/// The query interface an engine translates against
pub trait Environment {
    /// Stage of the program being translated
    fn stage(&self) -> Stage;

    /// Guest address of the program's first byte (its header)
    fn start_address(&self) -> u32;

    /// Decoded program header
    fn header(&self) -> &ProgramHeader;

    /// Read the 8-byte instruction word at a guest address
    fn read_instruction(&self, address: u32) -> Result<u64, EnvironmentError>;

    /// Read a word from a guest constant buffer
    fn read_cbuf_value(&self, cbuf_index: u32, cbuf_offset: u32) -> Result<u32, EnvironmentError>;

    /// Resolve the texture type behind a bindless handle
    fn read_texture_type(&self, raw_handle: u32) -> Result<TextureType, EnvironmentError>;

    /// Constant buffer slot bindless handles are read from
    fn texture_bound_buffer(&self) -> Result<u32, EnvironmentError>;

    /// Local memory declared by the header plus the call/return stack reservation
    fn local_memory_size(&self) -> u32 {
        self.header().total_local_memory()
    }

    /// Shared memory, only meaningful for compute programs
    fn shared_memory_size(&self) -> u32 {
        0
    }

    /// Workgroup dimensions, only meaningful for compute programs
    fn workgroup_size(&self) -> [u32; 3] {
        [0, 0, 0]
    }

    /// Guest address of the first instruction after the header
    fn entry_address(&self) -> u32 {
        self.start_address().wrapping_add(PROGRAM_HEADER_SIZE as u32)
    }
}

fn not_implemented(operation: &'static str, environment: &'static str) -> EnvironmentError {
    EnvironmentError::NotImplemented {
        operation,
        environment,
    }
}

/// Environment for all graphics pipeline stages
///
/// `binary` is a window into guest memory starting at `base_offset`; reads never leave it.
/// Constant buffers and bindless textures need live guest memory, which this environment
/// doesn't have, so those queries are rejected.
#[derive(Debug, Clone)]
pub struct GraphicsEnvironment<'a> {
    stage: Stage,
    binary: &'a [u8],
    base_offset: u32,
    texture_buffer_index: u32,
    header: ProgramHeader,
}

impl<'a> GraphicsEnvironment<'a> {
    const NAME: &'static str = "graphics";

    pub fn new(
        stage: Stage,
        binary: &'a [u8],
        base_offset: u32,
        texture_buffer_index: u32,
    ) -> Result<Self, EnvironmentError> {
        let header = ProgramHeader::parse(binary)?;

        if let Some(expected) = stage.header_shader_type() {
            if header.shader_type() != expected {
                tracing::warn!(
                    "{} program at 0x{:08x} declares shader type {} in its header",
                    stage,
                    base_offset,
                    header.shader_type()
                );
            }
        }

        Ok(Self {
            stage,
            binary,
            base_offset,
            texture_buffer_index,
            header,
        })
    }

    pub fn binary(&self) -> &'a [u8] {
        self.binary
    }
}

impl Environment for GraphicsEnvironment<'_> {
    fn stage(&self) -> Stage {
        self.stage
    }

    fn start_address(&self) -> u32 {
        self.base_offset
    }

    fn header(&self) -> &ProgramHeader {
        &self.header
    }

    fn read_instruction(&self, address: u32) -> Result<u64, EnvironmentError> {
        let out_of_bounds = || EnvironmentError::OutOfBounds {
            address,
            base: self.base_offset,
            size: self.binary.len(),
        };

        let offset = address.checked_sub(self.base_offset).ok_or_else(out_of_bounds)? as usize;
        let end = offset.checked_add(8).ok_or_else(out_of_bounds)?;
        let bytes = self.binary.get(offset..end).ok_or_else(out_of_bounds)?;

        let mut word = [0u8; 8];
        word.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(word))
    }

    fn read_cbuf_value(&self, _cbuf_index: u32, _cbuf_offset: u32) -> Result<u32, EnvironmentError> {
        Err(not_implemented("ReadCbufValue", Self::NAME))
    }

    fn read_texture_type(&self, _raw_handle: u32) -> Result<TextureType, EnvironmentError> {
        Err(not_implemented("ReadTextureType", Self::NAME))
    }

    fn texture_bound_buffer(&self) -> Result<u32, EnvironmentError> {
        Ok(self.texture_buffer_index)
    }
}

/// Environment for the second half of a split vertex program during merging
///
/// Only the header is consulted, so every other query is rejected.
#[derive(Debug, Clone)]
pub struct VertexBEnvironment {
    header: ProgramHeader,
}

impl VertexBEnvironment {
    const NAME: &'static str = "VertexB";

    pub fn new(binary: &[u8]) -> Result<Self, EnvironmentError> {
        Ok(Self {
            header: ProgramHeader::parse(binary)?,
        })
    }
}

impl Environment for VertexBEnvironment {
    fn stage(&self) -> Stage {
        Stage::VertexB
    }

    fn start_address(&self) -> u32 {
        0
    }

    fn header(&self) -> &ProgramHeader {
        &self.header
    }

    fn read_instruction(&self, _address: u32) -> Result<u64, EnvironmentError> {
        Err(not_implemented("ReadInstruction", Self::NAME))
    }

    fn read_cbuf_value(&self, _cbuf_index: u32, _cbuf_offset: u32) -> Result<u32, EnvironmentError> {
        Err(not_implemented("ReadCbufValue", Self::NAME))
    }

    fn read_texture_type(&self, _raw_handle: u32) -> Result<TextureType, EnvironmentError> {
        Err(not_implemented("ReadTextureType", Self::NAME))
    }

    fn texture_bound_buffer(&self) -> Result<u32, EnvironmentError> {
        Err(not_implemented("TextureBoundBuffer", Self::NAME))
    }
}
