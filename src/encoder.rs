use crate::*;
use flate2::read::GzEncoder;
use flate2::Compression;
use log::debug;
use std::convert::TryFrom;
use std::io::Read;

pub struct Encoder {
    compress: CompressPayload,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(CompressPayload::None)
    }
}

impl Encoder {
    pub fn new(compress: CompressPayload) -> Self {
        Self { compress }
    }

    /// Embed `message` into the low bits of `pixels`, in place. The text is
    /// mapped through the single-byte character model first.
    pub fn embed(
        &self,
        pixels: &mut [u8],
        message: &str,
        key: Option<&str>,
    ) -> Result<(), EmbedError> {
        self.embed_bytes(pixels, &text_to_bytes(message), key)
    }

    /// Embed raw message bytes. The payload is a 32-bit big-endian byte-count
    /// prefix followed by the message, both bit-expanded, passed through the
    /// keystream, and written one bit per R/G/B channel LSB. Alpha and every
    /// pixel past the payload are left untouched. On any error the buffer is
    /// not modified at all.
    pub fn embed_bytes(
        &self,
        pixels: &mut [u8],
        message: &[u8],
        key: Option<&str>,
    ) -> Result<(), EmbedError> {
        let message = match self.compress {
            CompressPayload::Gzip => self.compress(message)?,
            CompressPayload::None => message.to_vec(),
        };

        let byte_count = u32::try_from(message.len())
            .map_err(|_| EmbedError::LengthOverflow(message.len()))?;

        let mut payload = Vec::with_capacity(LENGTH_PREFIX_BITS + message.len() * 8);
        payload.extend(bits::u32_to_bits(byte_count));
        payload.extend(bits::bytes_to_bits(&message));
        let payload = keystream::xor(payload, key);

        self.check_utilisation(pixels, &payload)?;

        let mut payload_bits = payload.iter();
        'pixels: for pixel in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            for channel in &mut pixel[..USABLE_CHANNELS] {
                match payload_bits.next() {
                    Some(&bit) => *channel = (*channel & 0xFE) | bit,
                    None => break 'pixels,
                }
            }
        }

        Ok(())
    }

    // Make sure the payload fits into the carrier before any LSB is written
    fn check_utilisation(&self, pixels: &[u8], payload: &[u8]) -> Result<(), EmbedError> {
        let available = capacity_bits(pixels);
        let needed = payload.len();
        let utilisation = if available > 0 {
            ((needed as f64) / (available as f64)) * 100.0
        } else {
            f64::INFINITY
        };

        debug!(
            "image capacity: {} bits, payload size: {} bits, utilisation: {:.4}%",
            available, needed, utilisation,
        );

        if needed <= available {
            Ok(())
        } else {
            Err(EmbedError::CapacityExceeded { needed, available })
        }
    }

    fn compress(&self, message: &[u8]) -> Result<Vec<u8>, EmbedError> {
        let mut compressed: Vec<u8> = Vec::new();
        let mut encoder = GzEncoder::new(message, Compression::default());
        encoder
            .read_to_end(&mut compressed)
            .map_err(|err| EmbedError::Compress(err.to_string()))?;

        debug!(
            "compression ratio: {:.4}%",
            ((compressed.len() as f64) / (message.len().max(1) as f64)) * 100.0
        );

        Ok(compressed)
    }
}
