//! Guest shader binaries
//!
//! The length of a guest program isn't recorded anywhere, so it's recovered by scanning for the
//! `BRA $` self-loop that compilers pad the end of a program with.

use tr_core::Stage;

/// `BRA $` encodings used as end-of-program padding
pub const BRA_SELF: [u64; 2] = [0xE240_0FFF_FF87_000F, 0xE240_0FFF_FF07_000F];

/// Size of one guest instruction word
pub const INSTRUCTION_SIZE: usize = 8;

/// Byte offset of the first `BRA $` word in `data`, if any
pub fn find_program_end(data: &[u8]) -> Option<usize> {
    data.chunks_exact(INSTRUCTION_SIZE)
        .position(|chunk| {
            let mut word = [0u8; INSTRUCTION_SIZE];
            word.copy_from_slice(chunk);
            BRA_SELF.contains(&u64::from_le_bytes(word))
        })
        .map(|index| index * INSTRUCTION_SIZE)
}

/// A guest program copied out of guest memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBinary {
    pub stage: Stage,
    /// Offset of the program from the shader base address
    pub base_offset: u32,
    pub data: Vec<u8>,
}

impl ShaderBinary {
    /// Copy a program out of `window`, which starts at the program's first byte
    ///
    /// At most `max_size` bytes are scanned; without a terminator the whole capped window is kept.
    pub fn scan(stage: Stage, base_offset: u32, window: &[u8], max_size: usize) -> Self {
        let window = &window[..window.len().min(max_size)];
        let len = match find_program_end(window) {
            Some(end) => end,
            None => {
                tracing::warn!(
                    "No end-of-program padding found for {} program at 0x{:08x}, keeping 0x{:x} bytes",
                    stage,
                    base_offset,
                    window.len()
                );
                window.len()
            }
        };

        Self {
            stage,
            base_offset,
            data: window[..len].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(words: &[u64]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    #[test]
    fn test_find_program_end() {
        let data = words(&[0x1, 0x2, BRA_SELF[1], 0x3]);
        assert_eq!(find_program_end(&data), Some(16));
        assert_eq!(find_program_end(&words(&[0x1, 0x2])), None);
        assert_eq!(find_program_end(&[]), None);
    }

    #[test]
    fn test_unaligned_match_ignored() {
        // The pattern straddles two words, so it isn't a terminator.
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&BRA_SELF[0].to_le_bytes());
        data.extend_from_slice(&[0u8; 4]);
        assert_eq!(find_program_end(&data), None);
    }

    #[test]
    fn test_scan_truncates_at_padding() {
        let data = words(&[0xA, 0xB, 0xC, BRA_SELF[0], BRA_SELF[0]]);
        let binary = ShaderBinary::scan(Stage::Fragment, 0x200, &data, 1024 * 1024);
        assert_eq!(binary.len(), 24);
        assert_eq!(binary.base_offset, 0x200);
        assert_eq!(binary.stage, Stage::Fragment);
    }

    #[test]
    fn test_scan_respects_cap() {
        let data = words(&[0xA, 0xB, 0xC, BRA_SELF[0]]);
        let binary = ShaderBinary::scan(Stage::VertexB, 0, &data, 16);
        assert_eq!(binary.len(), 16);
        assert_eq!(binary.as_bytes(), &data[..16]);
    }
}
