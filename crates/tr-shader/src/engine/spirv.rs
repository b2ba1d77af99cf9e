//! SPIR-V module builder
//!
//! Collects words per logical-layout section and stitches them together in [`SpirVBuilder::build`].

/// SPIR-V magic number
pub const SPIRV_MAGIC: u32 = 0x07230203;

/// SPIR-V generator ID (our tool)
const SPIRV_GENERATOR: u32 = 0x00080001;

// SPIR-V opcodes
const OP_NAME: u16 = 5;
const OP_CAPABILITY: u16 = 17;
const OP_MEMORY_MODEL: u16 = 14;
const OP_ENTRY_POINT: u16 = 15;
const OP_EXECUTION_MODE: u16 = 16;
const OP_TYPE_VOID: u16 = 19;
const OP_TYPE_INT: u16 = 21;
const OP_TYPE_ARRAY: u16 = 28;
const OP_TYPE_POINTER: u16 = 32;
const OP_TYPE_FUNCTION: u16 = 33;
const OP_CONSTANT: u16 = 43;
const OP_FUNCTION: u16 = 54;
const OP_FUNCTION_END: u16 = 56;
const OP_VARIABLE: u16 = 59;
const OP_LABEL: u16 = 248;
const OP_RETURN: u16 = 253;

// Capability values
pub const CAP_SHADER: u32 = 1;
pub const CAP_GEOMETRY: u32 = 2;
pub const CAP_TESSELLATION: u32 = 3;
pub const CAP_INT64: u32 = 11;
pub const CAP_INT64_ATOMICS: u32 = 12;
pub const CAP_INT16: u32 = 22;
pub const CAP_INT8: u32 = 39;
pub const CAP_DERIVATIVE_CONTROL: u32 = 51;

// Execution model values
pub const EXEC_MODEL_VERTEX: u32 = 0;
pub const EXEC_MODEL_TESSELLATION_CONTROL: u32 = 1;
pub const EXEC_MODEL_TESSELLATION_EVALUATION: u32 = 2;
pub const EXEC_MODEL_GEOMETRY: u32 = 3;
pub const EXEC_MODEL_FRAGMENT: u32 = 4;
pub const EXEC_MODEL_GL_COMPUTE: u32 = 5;

// Execution mode values
pub const EXEC_MODE_INVOCATIONS: u32 = 0;
pub const EXEC_MODE_SPACING_EQUAL: u32 = 1;
pub const EXEC_MODE_SPACING_FRACTIONAL_EVEN: u32 = 2;
pub const EXEC_MODE_SPACING_FRACTIONAL_ODD: u32 = 3;
pub const EXEC_MODE_VERTEX_ORDER_CW: u32 = 4;
pub const EXEC_MODE_VERTEX_ORDER_CCW: u32 = 5;
pub const EXEC_MODE_ORIGIN_UPPER_LEFT: u32 = 7;
pub const EXEC_MODE_EARLY_FRAGMENT_TESTS: u32 = 9;
pub const EXEC_MODE_LOCAL_SIZE: u32 = 17;
pub const EXEC_MODE_INPUT_POINTS: u32 = 19;
pub const EXEC_MODE_INPUT_LINES: u32 = 20;
pub const EXEC_MODE_INPUT_LINES_ADJACENCY: u32 = 21;
pub const EXEC_MODE_TRIANGLES: u32 = 22;
pub const EXEC_MODE_INPUT_TRIANGLES_ADJACENCY: u32 = 23;
pub const EXEC_MODE_QUADS: u32 = 24;
pub const EXEC_MODE_ISOLINES: u32 = 25;
pub const EXEC_MODE_OUTPUT_VERTICES: u32 = 26;
pub const EXEC_MODE_OUTPUT_POINTS: u32 = 27;
pub const EXEC_MODE_OUTPUT_LINE_STRIP: u32 = 28;
pub const EXEC_MODE_OUTPUT_TRIANGLE_STRIP: u32 = 29;

// Storage class values
const STORAGE_PRIVATE: u32 = 6;

/// Encode a string literal: UTF-8, nul-terminated, padded to a word boundary
pub fn encode_string(value: &str) -> Vec<u32> {
    let mut bytes = value.as_bytes().to_vec();
    bytes.push(0);
    while bytes.len() % 4 != 0 {
        bytes.push(0);
    }
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// SPIR-V code builder
pub struct SpirVBuilder {
    version: u32,
    /// Current ID bound
    id_bound: u32,
    capabilities: Vec<u32>,
    memory_model: Vec<u32>,
    entry_points: Vec<u32>,
    execution_modes: Vec<u32>,
    debug_names: Vec<u32>,
    /// Types, constants, global variables
    types_constants: Vec<u32>,
    functions: Vec<u32>,
    type_void: u32,
    type_uint: u32,
    type_func_void: u32,
}

impl SpirVBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            id_bound: 1,
            capabilities: Vec::new(),
            memory_model: Vec::new(),
            entry_points: Vec::new(),
            execution_modes: Vec::new(),
            debug_names: Vec::new(),
            types_constants: Vec::new(),
            functions: Vec::new(),
            type_void: 0,
            type_uint: 0,
            type_func_void: 0,
        }
    }

    /// Allocate a new ID
    pub fn alloc_id(&mut self) -> u32 {
        let id = self.id_bound;
        self.id_bound += 1;
        id
    }

    /// Encode an instruction word
    fn encode_word(opcode: u16, word_count: usize) -> u32 {
        ((word_count as u32) << 16) | (opcode as u32)
    }

    pub fn add_capability(&mut self, cap: u32) {
        self.capabilities.push(Self::encode_word(OP_CAPABILITY, 2));
        self.capabilities.push(cap);
    }

    /// Logical addressing, GLSL450 memory model
    pub fn add_memory_model(&mut self) {
        self.memory_model.push(Self::encode_word(OP_MEMORY_MODEL, 3));
        self.memory_model.push(0); // Logical
        self.memory_model.push(1); // GLSL450
    }

    /// void, uint and void() function types
    pub fn add_basic_types(&mut self) {
        self.type_void = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_TYPE_VOID, 2));
        self.types_constants.push(self.type_void);

        self.type_uint = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_TYPE_INT, 4));
        self.types_constants.push(self.type_uint);
        self.types_constants.push(32);
        self.types_constants.push(0); // unsigned

        self.type_func_void = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_TYPE_FUNCTION, 3));
        self.types_constants.push(self.type_func_void);
        self.types_constants.push(self.type_void);
    }

    pub fn add_uint_constant(&mut self, value: u32) -> u32 {
        let id = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_CONSTANT, 4));
        self.types_constants.push(self.type_uint);
        self.types_constants.push(id);
        self.types_constants.push(value);
        id
    }

    /// Private `uint[words]` array, returns the variable ID
    pub fn add_private_uint_array(&mut self, words: u32) -> u32 {
        let length = self.add_uint_constant(words);

        let array = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_TYPE_ARRAY, 4));
        self.types_constants.push(array);
        self.types_constants.push(self.type_uint);
        self.types_constants.push(length);

        let pointer = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_TYPE_POINTER, 4));
        self.types_constants.push(pointer);
        self.types_constants.push(STORAGE_PRIVATE);
        self.types_constants.push(array);

        let id = self.alloc_id();
        self.types_constants.push(Self::encode_word(OP_VARIABLE, 4));
        self.types_constants.push(pointer);
        self.types_constants.push(id);
        self.types_constants.push(STORAGE_PRIVATE);
        id
    }

    pub fn add_name(&mut self, target: u32, name: &str) {
        let literal = encode_string(name);
        self.debug_names.push(Self::encode_word(OP_NAME, 2 + literal.len()));
        self.debug_names.push(target);
        self.debug_names.extend(literal);
    }

    pub fn add_entry_point(&mut self, model: u32, function: u32, name: &str) {
        let literal = encode_string(name);
        self.entry_points.push(Self::encode_word(OP_ENTRY_POINT, 3 + literal.len()));
        self.entry_points.push(model);
        self.entry_points.push(function);
        self.entry_points.extend(literal);
    }

    pub fn add_execution_mode(&mut self, function: u32, mode: u32, operands: &[u32]) {
        self.execution_modes.push(Self::encode_word(OP_EXECUTION_MODE, 3 + operands.len()));
        self.execution_modes.push(function);
        self.execution_modes.push(mode);
        self.execution_modes.extend_from_slice(operands);
    }

    /// An empty `void main()` body, returns the function ID
    pub fn add_empty_function(&mut self) -> u32 {
        let id = self.alloc_id();
        self.functions.push(Self::encode_word(OP_FUNCTION, 5));
        self.functions.push(self.type_void);
        self.functions.push(id);
        self.functions.push(0); // FunctionControl::None
        self.functions.push(self.type_func_void);

        let label = self.alloc_id();
        self.functions.push(Self::encode_word(OP_LABEL, 2));
        self.functions.push(label);
        self.functions.push(Self::encode_word(OP_RETURN, 1));
        self.functions.push(Self::encode_word(OP_FUNCTION_END, 1));
        id
    }

    /// Build final SPIR-V bytecode
    pub fn build(self) -> Vec<u32> {
        let mut spirv = vec![SPIRV_MAGIC, self.version, SPIRV_GENERATOR, self.id_bound, 0];

        spirv.extend(&self.capabilities);
        spirv.extend(&self.memory_model);
        spirv.extend(&self.entry_points);
        spirv.extend(&self.execution_modes);
        spirv.extend(&self.debug_names);
        spirv.extend(&self.types_constants);
        spirv.extend(&self.functions);

        spirv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_string() {
        assert_eq!(encode_string("main"), vec![0x6E69_616D, 0]);
        assert_eq!(encode_string("abc"), vec![0x0063_6261]);
        assert_eq!(encode_string(""), vec![0]);
    }

    #[test]
    fn test_header_and_bound() {
        let mut builder = SpirVBuilder::new(0x0001_0400);
        builder.add_capability(CAP_SHADER);
        builder.add_memory_model();
        builder.add_basic_types();
        let main = builder.add_empty_function();
        builder.add_entry_point(EXEC_MODEL_VERTEX, main, "main");
        let words = builder.build();

        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(words[1], 0x0001_0400);
        // void, uint, fn type, function, label
        assert_eq!(words[3], 6);
        assert_eq!(words[4], 0);
        // OpCapability Shader comes first
        assert_eq!(&words[5..7], &[(2 << 16) | 17, CAP_SHADER]);
    }

    #[test]
    fn test_entry_point_word_count() {
        let mut builder = SpirVBuilder::new(0x0001_0000);
        builder.add_entry_point(EXEC_MODEL_FRAGMENT, 7, "main");
        let words = builder.build();
        assert_eq!(words[5] >> 16, 5);
        assert_eq!(words[5] & 0xFFFF, 15);
        assert_eq!(&words[6..10], &[EXEC_MODEL_FRAGMENT, 7, 0x6E69_616D, 0]);
    }
}
