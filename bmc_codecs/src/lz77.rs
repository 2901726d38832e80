//! LZ77 stage: sliding-window match search and variable-length token coding.
//!
//! The token stream is a sequence of `(offset, length, literal)` triples.
//! Offset and length use a 1- or 2-byte variable-length integer (15-bit
//! ceiling); the literal slot always follows as one byte.

use bmc_core::error::{Error, Result};
use bmc_core::stage::Stage;

/// Default backward search distance in bytes.
pub const DEFAULT_WINDOW_SIZE: usize = 4096;

/// Default forward match limit in bytes.
pub const DEFAULT_LOOKAHEAD_SIZE: usize = 128;

/// Inputs shorter than this are stored verbatim; token overhead would
/// dominate.
pub const MIN_INPUT_LEN: usize = 50;

/// Largest value the two-byte varint form can carry (15 bits).
pub const MAX_VARINT_VALUE: usize = 0x7FFF;

/// Literal-slot value meaning "no literal byte follows" at end of buffer.
///
/// A genuine `0xFF` byte landing in literal position is indistinguishable
/// from this sentinel and is dropped by the decoder. The ambiguity is part
/// of the wire format; see `literal_ff_is_conflated_with_end_sentinel`.
pub const NO_LITERAL_SENTINEL: u8 = 0xFF;

/// Longest prior run found at one position.
///
/// `offset` is the backward distance to the start of the matched run,
/// `length` the number of matched bytes, `literal` the byte immediately
/// after the match (`None` only at end of buffer). `offset > 0` exactly
/// when `length > 0`; `(0, 0)` means "literal only".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub offset: usize,
    pub length: usize,
    pub literal: Option<u8>,
}

/// Scan the window behind `pos` for the longest run matching the lookahead.
///
/// Match extension stops before reading positions at or past `pos`, so a
/// match only ever references already-emitted history. Ties keep the first
/// maximum in scan order (candidates scanned from the oldest window
/// position forward).
pub fn find_longest_match(
    data: &[u8],
    pos: usize,
    window_size: usize,
    lookahead_size: usize,
) -> Match {
    if pos >= data.len() {
        return Match {
            offset: 0,
            length: 0,
            literal: None,
        };
    }

    let end_of_lookahead = (pos + lookahead_size).min(data.len());
    let next_char = data.get(end_of_lookahead).copied();

    if pos >= end_of_lookahead {
        return Match {
            offset: 0,
            length: 0,
            literal: next_char,
        };
    }

    let mut best_length = 0;
    let mut best_offset = 0;

    for i in pos.saturating_sub(window_size)..pos {
        let mut run = 0;
        while pos + run < end_of_lookahead && data[i + run] == data[pos + run] {
            run += 1;
            // The run may not read into bytes the decoder has not produced yet.
            if i + run >= pos {
                break;
            }
        }
        if run > best_length {
            best_length = run;
            best_offset = pos - i;
        }
    }

    Match {
        offset: best_offset,
        length: best_length,
        literal: data.get(pos + best_length).copied(),
    }
}

/// Append `value` as one byte (`< 128`) or two bytes with the high bit of
/// the first byte marking the long form.
pub fn encode_varint(value: usize, out: &mut Vec<u8>) -> Result<()> {
    if value > MAX_VARINT_VALUE {
        return Err(Error::InvalidWindowParameters { value });
    }
    if value < 128 {
        out.push(value as u8);
    } else {
        out.push(((value >> 8) as u8) | 0x80);
        out.push((value & 0xFF) as u8);
    }
    Ok(())
}

/// Decode one varint at `pos`, returning the value and the next position.
pub fn decode_varint(data: &[u8], pos: usize) -> Result<(usize, usize)> {
    let truncated = |needed| Error::TruncatedInput {
        needed,
        remaining: data.len().saturating_sub(pos),
    };
    let first = *data.get(pos).ok_or_else(|| truncated(1))?;
    if first < 128 {
        Ok((first as usize, pos + 1))
    } else {
        let second = *data.get(pos + 1).ok_or_else(|| truncated(2))?;
        Ok((((first as usize & 0x7F) << 8) | second as usize, pos + 2))
    }
}

/// Metadata the LZ77 inverse needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzMetadata {
    pub window_size: u32,
    pub lookahead_size: u32,
    /// `false` means the stage output equals its input verbatim.
    pub applied: bool,
}

/// Dictionary stage of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct Lz77Stage {
    window_size: usize,
    lookahead_size: usize,
}

impl Default for Lz77Stage {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            lookahead_size: DEFAULT_LOOKAHEAD_SIZE,
        }
    }
}

impl Lz77Stage {
    /// Both sizes must fit the 15-bit token encoding.
    pub fn new(window_size: usize, lookahead_size: usize) -> Result<Self> {
        for value in [window_size, lookahead_size] {
            if value > MAX_VARINT_VALUE {
                return Err(Error::InvalidWindowParameters { value });
            }
        }
        Ok(Self {
            window_size,
            lookahead_size,
        })
    }

    fn passthrough_meta(&self, applied: bool) -> LzMetadata {
        LzMetadata {
            window_size: self.window_size as u32,
            lookahead_size: self.lookahead_size as u32,
            applied,
        }
    }
}

impl Stage for Lz77Stage {
    type Meta = LzMetadata;

    fn name(&self) -> &'static str {
        "lz77"
    }

    fn encode(&self, input: &[u8]) -> Result<(Vec<u8>, LzMetadata)> {
        if input.len() < MIN_INPUT_LEN {
            return Ok((input.to_vec(), self.passthrough_meta(false)));
        }

        let mut tokens = Vec::with_capacity(input.len());
        let mut pos = 0;
        while pos < input.len() {
            let m = find_longest_match(input, pos, self.window_size, self.lookahead_size);
            encode_varint(m.offset, &mut tokens)?;
            encode_varint(m.length, &mut tokens)?;
            tokens.push(m.literal.unwrap_or(NO_LITERAL_SENTINEL));
            pos += m.length + 1;
        }

        if tokens.len() < input.len() {
            Ok((tokens, self.passthrough_meta(true)))
        } else {
            Ok((input.to_vec(), self.passthrough_meta(false)))
        }
    }

    fn decode(&self, input: &[u8], meta: &LzMetadata) -> Result<Vec<u8>> {
        if !meta.applied {
            return Ok(input.to_vec());
        }

        let mut out = Vec::with_capacity(input.len() * 2);
        let mut pos = 0;
        while pos < input.len() {
            let (offset, next) = decode_varint(input, pos)?;
            let (length, next) = decode_varint(input, next)?;
            let literal = input.get(next).copied();
            pos = next + 1;

            if offset > 0 || length > 0 {
                if offset == 0 || offset > out.len() {
                    return Err(Error::InvalidWindowParameters { value: offset });
                }
                // Byte-by-byte so overlapping copies (offset < length) read
                // bytes appended earlier in this same loop.
                for _ in 0..length {
                    let b = out[out.len() - offset];
                    out.push(b);
                }
            }
            if let Some(b) = literal {
                if b != NO_LITERAL_SENTINEL {
                    out.push(b);
                }
            }
        }
        Ok(out)
    }
}
