//! Bit-level packing for the Huffman stage.
//!
//! Bits are packed most-significant-bit first, matching the serialized
//! code-table layout. Both sides work directly on byte buffers with a bit
//! cursor; no intermediate bit-string representation is ever materialized.

/// Packs individual bits into a byte buffer, MSB first.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    current: u8,
    /// Bits already occupied in `current` (0–7).
    used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            current: 0,
            used: 0,
        }
    }

    #[inline]
    pub fn push_bit(&mut self, bit: bool) {
        if bit {
            self.current |= 1 << (7 - self.used);
        }
        self.used += 1;
        if self.used == 8 {
            self.buf.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    /// Append `bit_len` bits from `packed`, which holds them MSB-first.
    pub fn push_packed(&mut self, packed: &[u8], bit_len: usize) {
        for i in 0..bit_len {
            let bit = packed[i / 8] >> (7 - (i % 8)) & 1 == 1;
            self.push_bit(bit);
        }
    }

    /// Flush the trailing partial byte (zero-padded) and return the buffer
    /// together with the number of padding bits added (0–7).
    pub fn finish(mut self) -> (Vec<u8>, u8) {
        if self.used == 0 {
            return (self.buf, 0);
        }
        let padding = 8 - self.used;
        self.buf.push(self.current);
        (self.buf, padding)
    }
}

/// Iterates the bits of a byte buffer MSB first, stopping short of the
/// declared trailing padding.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    len_bits: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8], padding_bits: u8) -> Self {
        let len_bits = (data.len() * 8).saturating_sub(padding_bits as usize);
        Self {
            data,
            pos: 0,
            len_bits,
        }
    }
}

impl Iterator for BitReader<'_> {
    type Item = bool;

    #[inline]
    fn next(&mut self) -> Option<bool> {
        if self.pos >= self.len_bits {
            return None;
        }
        let bit = self.data[self.pos / 8] >> (7 - (self.pos % 8)) & 1 == 1;
        self.pos += 1;
        Some(bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_pads_partial_byte() {
        let mut w = BitWriter::new();
        for bit in [true, false, true] {
            w.push_bit(bit);
        }
        let (bytes, padding) = w.finish();
        assert_eq!(bytes, vec![0b1010_0000]);
        assert_eq!(padding, 5);
    }

    #[test]
    fn writer_full_bytes_need_no_padding() {
        let mut w = BitWriter::new();
        for i in 0..16 {
            w.push_bit(i % 2 == 0);
        }
        let (bytes, padding) = w.finish();
        assert_eq!(bytes, vec![0b1010_1010; 2]);
        assert_eq!(padding, 0);
    }

    #[test]
    fn reader_inverts_writer() {
        let bits: Vec<bool> = (0..29).map(|i| i % 3 == 0).collect();
        let mut w = BitWriter::new();
        for &b in &bits {
            w.push_bit(b);
        }
        let (bytes, padding) = w.finish();
        let read: Vec<bool> = BitReader::new(&bytes, padding).collect();
        assert_eq!(read, bits);
    }

    #[test]
    fn push_packed_copies_exact_bit_count() {
        let mut w = BitWriter::new();
        w.push_packed(&[0b1101_0000], 4);
        w.push_packed(&[0b1000_0000], 1);
        let (bytes, padding) = w.finish();
        assert_eq!(bytes, vec![0b1101_1000]);
        assert_eq!(padding, 3);
    }

    #[test]
    fn empty_reader_yields_nothing() {
        assert_eq!(BitReader::new(&[], 0).count(), 0);
    }
}
