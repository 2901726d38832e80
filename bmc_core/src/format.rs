//! `.bmc` container layout.
//!
//! All integers are little-endian, in this fixed field order:
//! ```text
//! u32 width
//! u32 height
//! u8  channels
//! u32 header_blob_len    ; opaque passthrough bytes (original image header)
//! u8[header_blob_len]
//! u32 metadata_blob_len  ; serialized codec pipeline metadata
//! u8[metadata_blob_len]
//! u32 payload_len
//! u8[payload_len]        ; pipeline-compressed pixel bytes
//! ```
//! The container does not interpret either blob; the codec crate owns the
//! metadata layout and the front-end owns the header bytes.

use crate::error::{Error, Result};

/// Pixel geometry of the stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl Geometry {
    /// Byte count the reconstructed pixel buffer must have.
    pub fn pixel_bytes(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

/// One compressed image plus everything needed to reverse the transform.
///
/// Constructed once at compression time, consumed once at decompression
/// time; immutable in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub geometry: Geometry,
    /// Opaque header bytes from the source image, stored verbatim.
    pub header_blob: Vec<u8>,
    /// Serialized pipeline metadata, opaque at this layer.
    pub metadata_blob: Vec<u8>,
    /// Pipeline-compressed pixel bytes.
    pub payload: Vec<u8>,
}

impl Container {
    /// Serialize in the fixed field order with explicit length prefixes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(
            21 + self.header_blob.len() + self.metadata_blob.len() + self.payload.len(),
        );
        buf.extend_from_slice(&self.geometry.width.to_le_bytes());
        buf.extend_from_slice(&self.geometry.height.to_le_bytes());
        buf.push(self.geometry.channels);
        write_blob(&mut buf, &self.header_blob);
        write_blob(&mut buf, &self.metadata_blob);
        write_blob(&mut buf, &self.payload);
        buf
    }

    /// Parse the fixed field order, validating every length prefix against
    /// the remaining bytes before slicing.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut cur = Cursor::new(buf);
        let width = cur.u32_le()?;
        let height = cur.u32_le()?;
        let channels = cur.u8()?;
        let header_blob = cur.blob()?;
        let metadata_blob = cur.blob()?;
        let payload = cur.blob()?;
        Ok(Self {
            geometry: Geometry {
                width,
                height,
                channels,
            },
            header_blob,
            metadata_blob,
            payload,
        })
    }
}

fn write_blob(buf: &mut Vec<u8>, blob: &[u8]) {
    buf.extend_from_slice(&(blob.len() as u32).to_le_bytes());
    buf.extend_from_slice(blob);
}

/// Bounds-checked forward cursor over a byte buffer.
///
/// Every decoder in the workspace reads through this so that a bad length
/// prefix surfaces as [`Error::TruncatedInput`] instead of a panic.
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consume the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(Error::TruncatedInput {
                needed: n,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u32_le(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// A `u32` length prefix followed by that many bytes.
    pub fn blob(&mut self) -> Result<Vec<u8>> {
        let len = self.u32_le()? as usize;
        Ok(self.take(len)?.to_vec())
    }
}
