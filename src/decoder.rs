use crate::{
    bits, bytes_to_text, capacity_bits, keystream, CompressPayload, ExtractError, BYTES_PER_PIXEL,
    LENGTH_PREFIX_BITS, USABLE_CHANNELS,
};
use flate2::write::GzDecoder;
use log::debug;
use std::io::Write;

pub struct Decoder {
    compress: CompressPayload,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(CompressPayload::None)
    }
}

impl Decoder {
    pub fn new(compress: CompressPayload) -> Self {
        Self { compress }
    }

    /// Recover an embedded message as text via the single-byte character
    /// model.
    pub fn extract(&self, pixels: &[u8], key: Option<&str>) -> Result<String, ExtractError> {
        self.extract_bytes(pixels, key).map(|b| bytes_to_text(&b))
    }

    /// Scan every usable channel LSB, undo the keystream, then validate the
    /// 32-bit length prefix before slicing out the message. A prefix that is
    /// zero or declares more data than the image holds means there is no
    /// valid message (corruption, an unrelated image, or a wrong key).
    pub fn extract_bytes(&self, pixels: &[u8], key: Option<&str>) -> Result<Vec<u8>, ExtractError> {
        let mut extracted = Vec::with_capacity(capacity_bits(pixels));
        for pixel in pixels.chunks_exact(BYTES_PER_PIXEL) {
            for channel in &pixel[..USABLE_CHANNELS] {
                extracted.push(channel & 0x01);
            }
        }

        let decoded = keystream::xor(extracted, key);

        if decoded.len() < LENGTH_PREFIX_BITS {
            return Err(ExtractError::TooSmall);
        }

        let declared = bits::bits_to_u32(&decoded[..LENGTH_PREFIX_BITS]);
        debug!("declared message length: {} bytes", declared);

        // compare in u64: declared * 8 can wrap a usize on 32-bit targets
        let message_bits = declared as u64 * 8;
        if declared == 0 || LENGTH_PREFIX_BITS as u64 + message_bits > decoded.len() as u64 {
            return Err(ExtractError::BadLength { declared });
        }

        let message_bits = message_bits as usize;
        let message = bits::bits_to_bytes(
            &decoded[LENGTH_PREFIX_BITS..LENGTH_PREFIX_BITS + message_bits],
        );

        match self.compress {
            CompressPayload::Gzip => self.decompress(&message),
            CompressPayload::None => Ok(message),
        }
    }

    fn decompress(&self, message: &[u8]) -> Result<Vec<u8>, ExtractError> {
        let mut decoder = GzDecoder::new(Vec::new());
        decoder
            .write_all(message)
            .map_err(|err| ExtractError::Decompress(err.to_string()))?;
        decoder
            .finish()
            .map_err(|err| ExtractError::Decompress(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // hand-assembled carrier: one LSB per R/G/B channel, alpha skipped
    fn pixels_with_lsbs(lsbs: &[u8], pixel_count: usize) -> Vec<u8> {
        let mut pixels = vec![0x80u8; pixel_count * 4];
        let mut bit = lsbs.iter();
        for pixel in pixels.chunks_exact_mut(4) {
            for channel in &mut pixel[..3] {
                if let Some(&b) = bit.next() {
                    *channel |= b;
                }
            }
        }
        pixels
    }

    #[test]
    fn test_extract_reads_lsbs_in_channel_order() {
        // prefix declares one byte, message byte 0x48 = 'H'
        let mut lsbs = vec![0u8; 32];
        lsbs[31] = 1;
        lsbs.extend(vec![0, 1, 0, 0, 1, 0, 0, 0]);

        let pixels = pixels_with_lsbs(&lsbs, 20);
        let decoder = Decoder::new(CompressPayload::None);
        assert_eq!("H", decoder.extract(&pixels, None).expect("no error"));
    }

    #[test]
    fn test_declared_length_beyond_buffer_is_rejected() {
        // prefix declares 200 bytes but the buffer only holds 28 more bits
        let mut lsbs = vec![0u8; 32];
        lsbs[24] = 1; // 0b11001000 = 200 in the low byte
        lsbs[25] = 1;
        lsbs[28] = 1;

        let pixels = pixels_with_lsbs(&lsbs, 20);
        let decoder = Decoder::new(CompressPayload::None);
        assert_eq!(
            Err(ExtractError::BadLength { declared: 200 }),
            decoder.extract_bytes(&pixels, None)
        );
    }

    #[test]
    fn test_maximum_declared_length_is_rejected() {
        // all-ones prefix declares u32::MAX bytes; the size check must not
        // wrap on any target width
        let lsbs = vec![1u8; 32];
        let pixels = pixels_with_lsbs(&lsbs, 20);
        let decoder = Decoder::new(CompressPayload::None);
        assert_eq!(
            Err(ExtractError::BadLength { declared: u32::MAX }),
            decoder.extract_bytes(&pixels, None)
        );
    }

    #[test]
    fn test_garbage_bytes_do_not_decompress() {
        // valid frame, but the payload is not a gzip stream
        let mut pixels = vec![0u8; 40 * 4];
        let encoder = crate::encoder::Encoder::new(CompressPayload::None);
        encoder
            .embed_bytes(&mut pixels, b"not gzip", None)
            .expect("no error");

        let decoder = Decoder::new(CompressPayload::Gzip);
        match decoder.extract_bytes(&pixels, None) {
            Err(ExtractError::Decompress(_)) => {}
            other => panic!("expected a decompression failure, got {:?}", other),
        }
    }
}
