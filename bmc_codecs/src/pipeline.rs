//! Combined codec: LZ77 then Huffman, plus the `.bmc` container entry points.
//!
//! Metadata from both stages travels next to the payload as one opaque blob,
//! laid out little-endian:
//! ```text
//! u8  lz_applied        ; 0 or 1
//! u32 window_size
//! u32 lookahead_size
//! u8  huffman_applied   ; 0 or 1
//! u8  padding_bits      ; 0–7
//! u32 table_len
//! u8[table_len]         ; serialized code table
//! ```

use bmc_core::error::{Error, Result};
use bmc_core::format::{Container, Cursor, Geometry};
use bmc_core::stage::Stage;

use crate::huffman::{HuffmanMetadata, HuffmanStage};
use crate::lz77::{Lz77Stage, LzMetadata};

/// Metadata for both stages, bundled for the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineMetadata {
    pub lz77: LzMetadata,
    pub huffman: HuffmanMetadata,
}

impl PipelineMetadata {
    /// Serialize to the blob layout documented at module level.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(15 + self.huffman.table.len());
        buf.push(self.lz77.applied as u8);
        buf.extend_from_slice(&self.lz77.window_size.to_le_bytes());
        buf.extend_from_slice(&self.lz77.lookahead_size.to_le_bytes());
        buf.push(self.huffman.applied as u8);
        buf.push(self.huffman.padding_bits);
        buf.extend_from_slice(&(self.huffman.table.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.huffman.table);
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf);
        let lz_applied = cur.u8()? != 0;
        let window_size = cur.u32_le()?;
        let lookahead_size = cur.u32_le()?;
        let huffman_applied = cur.u8()? != 0;
        let padding_bits = cur.u8()?;
        let table = cur.blob()?;
        Ok(Self {
            lz77: LzMetadata {
                window_size,
                lookahead_size,
                applied: lz_applied,
            },
            huffman: HuffmanMetadata {
                table,
                padding_bits,
                applied: huffman_applied,
            },
        })
    }
}

/// The two-stage codec. Encode order is LZ77 then Huffman; decode inverts
/// the Huffman stage first. The order is fixed — each stage's metadata only
/// describes the bytes that stage actually saw.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pipeline {
    lz77: Lz77Stage,
    huffman: HuffmanStage,
}

impl Pipeline {
    /// Pipeline with custom LZ77 window parameters (15-bit ceiling).
    pub fn new(window_size: usize, lookahead_size: usize) -> Result<Self> {
        Ok(Self {
            lz77: Lz77Stage::new(window_size, lookahead_size)?,
            huffman: HuffmanStage,
        })
    }
}

impl Stage for Pipeline {
    type Meta = PipelineMetadata;

    fn name(&self) -> &'static str {
        "lz77+huffman"
    }

    fn encode(&self, input: &[u8]) -> Result<(Vec<u8>, PipelineMetadata)> {
        let (tokens, lz_meta) = self.lz77.encode(input)?;
        let (packed, huffman_meta) = self.huffman.encode(&tokens)?;
        Ok((
            packed,
            PipelineMetadata {
                lz77: lz_meta,
                huffman: huffman_meta,
            },
        ))
    }

    fn decode(&self, input: &[u8], meta: &PipelineMetadata) -> Result<Vec<u8>> {
        let tokens = self.huffman.decode(input, &meta.huffman)?;
        self.lz77.decode(&tokens, &meta.lz77)
    }
}

/// Run the full pipeline over `data` with default parameters.
pub fn encode_payload(data: &[u8]) -> Result<(Vec<u8>, PipelineMetadata)> {
    Pipeline::default().encode(data)
}

/// Invert [`encode_payload`].
pub fn decode_payload(data: &[u8], meta: &PipelineMetadata) -> Result<Vec<u8>> {
    Pipeline::default().decode(data, meta)
}

/// Compress a pixel buffer into `.bmc` container bytes.
///
/// `header_blob` is carried through the container verbatim for the caller
/// to reattach after decompression.
pub fn compress(pixels: &[u8], geometry: Geometry, header_blob: &[u8]) -> Result<Vec<u8>> {
    let (payload, meta) = encode_payload(pixels)?;
    let container = Container {
        geometry,
        header_blob: header_blob.to_vec(),
        metadata_blob: meta.to_bytes(),
        payload,
    };
    Ok(container.to_bytes())
}

/// Parse `.bmc` container bytes and reconstruct the pixel buffer.
///
/// Returns the pixels, their geometry, and the stored header blob. Fails
/// with [`Error::SizeMismatch`] if the reconstructed length disagrees with
/// `width * height * channels`.
pub fn decompress(container_bytes: &[u8]) -> Result<(Vec<u8>, Geometry, Vec<u8>)> {
    let container = Container::from_bytes(container_bytes)?;
    let meta = PipelineMetadata::from_bytes(&container.metadata_blob)?;
    let pixels = decode_payload(&container.payload, &meta)?;

    let expected = container.geometry.pixel_bytes();
    if pixels.len() != expected {
        return Err(Error::SizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }
    Ok((pixels, container.geometry, container.header_blob))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_blob_round_trips() {
        let meta = PipelineMetadata {
            lz77: LzMetadata {
                window_size: 4096,
                lookahead_size: 128,
                applied: true,
            },
            huffman: HuffmanMetadata {
                table: vec![1, 0, 0x41, 1, 0x00],
                padding_bits: 5,
                applied: true,
            },
        };
        let restored = PipelineMetadata::from_bytes(&meta.to_bytes()).unwrap();
        assert_eq!(restored, meta);
    }

    #[test]
    fn metadata_blob_round_trips_passthrough() {
        let meta = PipelineMetadata {
            lz77: LzMetadata {
                window_size: 4096,
                lookahead_size: 128,
                applied: false,
            },
            huffman: HuffmanMetadata {
                table: Vec::new(),
                padding_bits: 0,
                applied: false,
            },
        };
        let restored = PipelineMetadata::from_bytes(&meta.to_bytes()).unwrap();
        assert_eq!(restored, meta);
    }

    #[test]
    fn truncated_metadata_blob_is_rejected() {
        let meta = PipelineMetadata {
            lz77: LzMetadata {
                window_size: 4096,
                lookahead_size: 128,
                applied: true,
            },
            huffman: HuffmanMetadata {
                table: vec![0u8; 20],
                padding_bits: 0,
                applied: true,
            },
        };
        let bytes = meta.to_bytes();
        assert!(matches!(
            PipelineMetadata::from_bytes(&bytes[..bytes.len() - 4]),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn payload_round_trips_both_stages_applied() {
        // Long repetitive input: LZ77 shrinks it, and the token stream is
        // still large and skewed enough for Huffman to engage.
        let data: Vec<u8> = (0..3000).map(|i| ((i / 3) % 5) as u8).collect();
        let (packed, meta) = encode_payload(&data).unwrap();
        assert!(meta.lz77.applied);
        assert!(packed.len() < data.len());
        assert_eq!(decode_payload(&packed, &meta).unwrap(), data);
    }

    #[test]
    fn decompress_rejects_geometry_mismatch() {
        let pixels = vec![9u8; 30];
        let geometry = Geometry {
            width: 31,
            height: 1,
            channels: 1,
        };
        let bytes = compress(&pixels, geometry, &[]).unwrap();
        assert!(matches!(
            decompress(&bytes),
            Err(Error::SizeMismatch {
                expected: 31,
                actual: 30
            })
        ));
    }
}
