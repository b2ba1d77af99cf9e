//! Guest program header (SPH)
//!
//! Every guest graphics program starts with a fixed 0x50-byte header of twenty little-endian
//! words declaring memory requirements and per-stage parameters. It is decoded field by field
//! after checking the buffer is long enough; the raw bytes are never reinterpreted in place.

use bytemuck::Zeroable;
use tr_core::EnvironmentError;

/// Size of the program header in bytes
pub const PROGRAM_HEADER_SIZE: usize = 0x50;

const HEADER_WORDS: usize = PROGRAM_HEADER_SIZE / 4;

/// Extract `width` bits starting at `shift`
const fn bits(word: u32, shift: u32, width: u32) -> u32 {
    (word >> shift) & ((1u32 << width) - 1)
}

const fn with_bits(word: u32, shift: u32, width: u32, value: u32) -> u32 {
    let mask = ((1u32 << width) - 1) << shift;
    (word & !mask) | ((value << shift) & mask)
}

/// Decoded program header
///
/// Words are stored host-native; [`ProgramHeader::parse`] and [`ProgramHeader::to_bytes`] do
/// the little-endian conversion, so the struct is never cast to or from guest bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Zeroable)]
pub struct ProgramHeader {
    words: [u32; HEADER_WORDS],
}

impl ProgramHeader {
    /// An all-zero header
    pub fn new() -> Self {
        Self::zeroed()
    }

    /// Decode the header at the start of `binary`
    pub fn parse(binary: &[u8]) -> Result<Self, EnvironmentError> {
        let bytes = binary
            .get(..PROGRAM_HEADER_SIZE)
            .ok_or(EnvironmentError::TruncatedHeader {
                len: binary.len(),
                required: PROGRAM_HEADER_SIZE,
            })?;

        let mut header = Self::new();
        for (word, chunk) in header.words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        Ok(header)
    }

    /// Encode the header as guest bytes
    pub fn to_bytes(&self) -> [u8; PROGRAM_HEADER_SIZE] {
        let mut bytes = [0u8; PROGRAM_HEADER_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    pub fn words(&self) -> &[u32; HEADER_WORDS] {
        &self.words
    }

    // common0

    /// 1 for vertex/tessellation/geometry headers, 2 for pixel headers
    pub fn sph_type(&self) -> u32 {
        bits(self.words[0], 0, 5)
    }

    pub fn version(&self) -> u32 {
        bits(self.words[0], 5, 5)
    }

    /// Declared stage: 1 vertex, 2 tessellation init, 3 tessellation, 4 geometry, 5 pixel
    pub fn shader_type(&self) -> u32 {
        bits(self.words[0], 10, 4)
    }

    pub fn mrt_enable(&self) -> bool {
        bits(self.words[0], 14, 1) != 0
    }

    pub fn kills_pixels(&self) -> bool {
        bits(self.words[0], 15, 1) != 0
    }

    pub fn does_global_store(&self) -> bool {
        bits(self.words[0], 16, 1) != 0
    }

    pub fn sass_version(&self) -> u32 {
        bits(self.words[0], 17, 4)
    }

    pub fn does_load_or_store(&self) -> bool {
        bits(self.words[0], 26, 1) != 0
    }

    pub fn does_fp64(&self) -> bool {
        bits(self.words[0], 27, 1) != 0
    }

    pub fn stream_out_mask(&self) -> u32 {
        bits(self.words[0], 28, 4)
    }

    // common1 - common4

    pub fn per_patch_attribute_count(&self) -> u32 {
        bits(self.words[1], 24, 8)
    }

    pub fn threads_per_input_primitive(&self) -> u32 {
        bits(self.words[2], 24, 8)
    }

    /// Local memory declared by the program (48 bits split over two words)
    pub fn local_memory_size(&self) -> u64 {
        let low = u64::from(bits(self.words[1], 0, 24));
        let high = u64::from(bits(self.words[2], 0, 24));
        (high << 24) | low
    }

    /// Additional local memory reserved for the call/return stack
    pub fn crs_size(&self) -> u32 {
        bits(self.words[3], 0, 24)
    }

    pub fn output_topology(&self) -> u32 {
        bits(self.words[3], 24, 4)
    }

    pub fn max_output_vertices(&self) -> u32 {
        bits(self.words[4], 0, 12)
    }

    pub fn store_req_start(&self) -> u32 {
        bits(self.words[4], 12, 8)
    }

    pub fn store_req_end(&self) -> u32 {
        bits(self.words[4], 24, 8)
    }

    /// Stage-specific input/output maps following the common words
    pub fn stage_words(&self) -> &[u32] {
        &self.words[5..]
    }

    /// Total local memory the program needs, saturating at `u32::MAX`
    pub fn total_local_memory(&self) -> u32 {
        u32::try_from(self.local_memory_size())
            .unwrap_or(u32::MAX)
            .saturating_add(self.crs_size())
    }

    // Builders for synthesising headers

    pub fn with_shader_type(mut self, sph_type: u32, shader_type: u32) -> Self {
        self.words[0] = with_bits(self.words[0], 0, 5, sph_type);
        self.words[0] = with_bits(self.words[0], 10, 4, shader_type);
        self
    }

    pub fn with_local_memory_size(mut self, size: u64) -> Self {
        self.words[1] = with_bits(self.words[1], 0, 24, (size & 0xFF_FFFF) as u32);
        self.words[2] = with_bits(self.words[2], 0, 24, ((size >> 24) & 0xFF_FFFF) as u32);
        self
    }

    pub fn with_crs_size(mut self, size: u32) -> Self {
        self.words[3] = with_bits(self.words[3], 0, 24, size);
        self
    }

    pub fn with_max_output_vertices(mut self, count: u32) -> Self {
        self.words[4] = with_bits(self.words[4], 0, 12, count);
        self
    }
}

impl Default for ProgramHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<ProgramHeader>(), PROGRAM_HEADER_SIZE);
    }

    #[test]
    fn test_truncated_header() {
        let err = ProgramHeader::parse(&[0u8; 0x4F]).unwrap_err();
        assert_eq!(
            err,
            EnvironmentError::TruncatedHeader {
                len: 0x4F,
                required: PROGRAM_HEADER_SIZE
            }
        );
    }

    #[test]
    fn test_parse_is_little_endian() {
        let mut bytes = [0u8; PROGRAM_HEADER_SIZE];
        bytes[..4].copy_from_slice(&[0x41, 0x04, 0x00, 0x00]);

        let header = ProgramHeader::parse(&bytes).unwrap();
        assert_eq!(header.words()[0], 0x0000_0441);
        assert_eq!(header.sph_type(), 1);
        assert_eq!(header.version(), 2);
        assert_eq!(header.shader_type(), 1);
        assert_eq!(header.to_bytes(), bytes);
    }

    #[test]
    fn test_local_memory_fields() {
        let mut bytes = [0u8; PROGRAM_HEADER_SIZE];
        // common1: low size 0x000080, common2: high size 0x000001, common3: crs 0x20
        bytes[4..8].copy_from_slice(&0x0300_0080u32.to_le_bytes());
        bytes[8..12].copy_from_slice(&0x2000_0001u32.to_le_bytes());
        bytes[12..16].copy_from_slice(&0x0500_0020u32.to_le_bytes());

        let header = ProgramHeader::parse(&bytes).unwrap();
        assert_eq!(header.local_memory_size(), (1 << 24) | 0x80);
        assert_eq!(header.crs_size(), 0x20);
        assert_eq!(header.per_patch_attribute_count(), 3);
        assert_eq!(header.threads_per_input_primitive(), 0x20);
        assert_eq!(header.output_topology(), 5);
    }

    #[test]
    fn test_common0_fields() {
        // sph_type 1, version 3, shader_type 5, kills_pixels, fp64
        let common0: u32 = 1 | (3 << 5) | (5 << 10) | (1 << 15) | (1 << 27);
        let mut bytes = [0u8; PROGRAM_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&common0.to_le_bytes());

        let header = ProgramHeader::parse(&bytes).unwrap();
        assert_eq!(header.sph_type(), 1);
        assert_eq!(header.version(), 3);
        assert_eq!(header.shader_type(), 5);
        assert!(header.kills_pixels());
        assert!(header.does_fp64());
        assert!(!header.mrt_enable());
        assert!(!header.does_global_store());
    }

    #[test]
    fn test_builder_matches_parse() {
        let header = ProgramHeader::new()
            .with_shader_type(1, 1)
            .with_local_memory_size(128)
            .with_crs_size(32)
            .with_max_output_vertices(3);
        let parsed = ProgramHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.local_memory_size(), 128);
        assert_eq!(parsed.crs_size(), 32);
        assert_eq!(parsed.total_local_memory(), 160);
        assert_eq!(parsed.max_output_vertices(), 3);
        assert_eq!(parsed.stage_words().len(), 15);
    }

    #[test]
    fn test_total_local_memory_saturates() {
        let header = ProgramHeader::new()
            .with_local_memory_size(0xFFFF_FFFF_FFFF)
            .with_crs_size(0x10);
        assert_eq!(header.total_local_memory(), u32::MAX);
    }
}
