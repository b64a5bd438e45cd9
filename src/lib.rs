pub mod decoder;
pub mod encoder;
pub mod png;

use thiserror::Error;

const BYTES_PER_PIXEL: usize = 4;
const USABLE_CHANNELS: usize = 3;
const LENGTH_PREFIX_BITS: usize = 32;

/// Optional transform applied to the message bytes before the length prefix
/// is computed. There is no in-band marker, so the embedding and extracting
/// sides must agree on it, just like they must agree on the key.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CompressPayload {
    None,
    Gzip,
}

impl Default for CompressPayload {
    fn default() -> Self {
        CompressPayload::None
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EmbedError {
    #[error(
        "message is too long for this image: payload is {needed} bits, image holds {available}"
    )]
    CapacityExceeded { needed: usize, available: usize },
    #[error("message of {0} bytes does not fit a 32-bit length prefix")]
    LengthOverflow(usize),
    #[error("could not compress message: {0}")]
    Compress(String),
}

/// Both `TooSmall` and `BadLength` mean the same thing to callers: no valid
/// message. The split only exists for diagnostics.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ExtractError {
    #[error("no valid message found: image too small to hold a length prefix")]
    TooSmall,
    #[error("no valid message found: declared length {declared} bytes exceeds available data (possible corruption or wrong key)")]
    BadLength { declared: u32 },
    #[error("no valid message found: payload does not decompress: {0}")]
    Decompress(String),
}

/// Number of hideable bits in a pixel buffer: one LSB per R, G and B channel.
/// The alpha channel is never used.
pub fn capacity_bits(pixels: &[u8]) -> usize {
    (pixels.len() / BYTES_PER_PIXEL) * USABLE_CHANNELS
}

/// Embed `message` into `pixels` in place, without compression.
pub fn embed(pixels: &mut [u8], message: &str, key: Option<&str>) -> Result<(), EmbedError> {
    encoder::Encoder::new(CompressPayload::None).embed(pixels, message, key)
}

/// Recover a message previously embedded without compression.
pub fn extract(pixels: &[u8], key: Option<&str>) -> Result<String, ExtractError> {
    decoder::Decoder::new(CompressPayload::None).extract(pixels, key)
}

/// One byte per code point. Lossless only for U+0000..=U+00FF; higher code
/// points truncate to their low byte. Callers that need full fidelity should
/// use the byte-level API instead.
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

pub fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn err_to_io_error<E>(error: E) -> std::io::Error
where
    E: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    std::io::Error::new(std::io::ErrorKind::Other, error.into())
}

pub mod bits {
    //! Byte sequence <-> bit sequence, one `u8` per bit, MSB first.

    pub fn bytes_to_bits(bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len() * 8);
        for &byte in bytes {
            for shift in (0..8).rev() {
                out.push((byte >> shift) & 0x01);
            }
        }
        out
    }

    pub fn bits_to_bytes(bits: &[u8]) -> Vec<u8> {
        debug_assert_eq!(bits.len() % 8, 0);
        bits.chunks(8)
            .map(|group| group.iter().fold(0u8, |acc, &bit| (acc << 1) | bit))
            .collect()
    }

    pub fn u32_to_bits(value: u32) -> Vec<u8> {
        (0..32)
            .rev()
            .map(|shift| ((value >> shift) & 1) as u8)
            .collect()
    }

    pub fn bits_to_u32(bits: &[u8]) -> u32 {
        debug_assert_eq!(bits.len(), 32);
        bits.iter().fold(0u32, |acc, &bit| (acc << 1) | bit as u32)
    }

}

pub mod keystream {
    //! Repeating-key XOR over bit sequences. Involutive for a fixed key, so
    //! the decoder reuses it instead of having a separate decrypt routine.

    use super::{bits, text_to_bytes};

    pub fn xor(mut input: Vec<u8>, key: Option<&str>) -> Vec<u8> {
        let key = match key {
            Some(k) if !k.is_empty() => k,
            _ => return input,
        };

        let key_bits = bits::bytes_to_bits(&text_to_bytes(key));
        for (i, bit) in input.iter_mut().enumerate() {
            *bit ^= key_bits[i % key_bits.len()];
        }
        input
    }

}
