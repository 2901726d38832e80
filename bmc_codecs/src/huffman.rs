//! Huffman stage: frequency-weighted prefix codes over the byte alphabet.
//!
//! Builds a code per distinct input byte, serializes the code table for the
//! decoder, and bit-packs the encoded stream through [`crate::bits`].
//!
//! Serialized table layout: `u16` little-endian symbol count, then per
//! symbol one byte of symbol value, one byte of code bit-length, and
//! `ceil(length / 8)` bytes of code bits packed MSB-first (final byte
//! zero-padded).

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, BTreeMap};

use bmc_core::error::{Error, Result};
use bmc_core::stage::Stage;

use crate::bits::{BitReader, BitWriter};

/// Inputs shorter than this are stored verbatim; the code table overhead
/// would dominate.
pub const MIN_INPUT_LEN: usize = 100;

/// Fixed allowance added to the packed size when judging whether entropy
/// coding paid off.
const FALLBACK_SLACK: usize = 10;

/// One prefix code: `len` bits packed MSB-first into `bits`
/// (`bits.len() == ceil(len / 8)`, unused trailing bits zero).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeWord {
    pub bits: Vec<u8>,
    pub len: u8,
}

impl CodeWord {
    fn from_path(path: &[bool]) -> Self {
        let mut bits = vec![0u8; path.len().div_ceil(8)];
        for (i, &bit) in path.iter().enumerate() {
            if bit {
                bits[i / 8] |= 1 << (7 - (i % 8));
            }
        }
        Self {
            bits,
            len: path.len() as u8,
        }
    }

    pub fn bit(&self, i: usize) -> bool {
        self.bits[i / 8] >> (7 - (i % 8)) & 1 == 1
    }
}

/// Symbol-to-code mapping for one input buffer.
pub type CodeTable = BTreeMap<u8, CodeWord>;

/// Count occurrences of every byte value.
pub fn build_frequency_table(data: &[u8]) -> [u64; 256] {
    let mut freq = [0u64; 256];
    for &b in data {
        freq[b as usize] += 1;
    }
    freq
}

enum NodeKind {
    Leaf(u8),
    Internal(Box<Node>, Box<Node>),
}

/// Prefix-tree node: a leaf symbol or two owned subtrees.
struct Node {
    weight: u64,
    /// Insertion order, breaking weight ties deterministically.
    seq: u32,
    kind: NodeKind,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.weight == other.weight && self.seq == other.seq
    }
}

impl Eq for Node {}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.weight, self.seq).cmp(&(other.weight, other.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Merge the two lowest-weight nodes until one tree remains.
///
/// Returns `None` for an empty alphabet. A single-symbol alphabet yields a
/// lone leaf, which [`build_codes`] maps to the one-bit code `0`.
fn build_tree(freq: &[u64; 256]) -> Option<Node> {
    let mut seq = 0u32;
    let mut heap: BinaryHeap<Reverse<Node>> = freq
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0)
        .map(|(sym, &w)| {
            let node = Node {
                weight: w,
                seq,
                kind: NodeKind::Leaf(sym as u8),
            };
            seq += 1;
            Reverse(node)
        })
        .collect();

    while heap.len() > 1 {
        let Reverse(lo) = heap.pop()?;
        let Reverse(hi) = heap.pop()?;
        heap.push(Reverse(Node {
            weight: lo.weight + hi.weight,
            seq,
            kind: NodeKind::Internal(Box::new(lo), Box::new(hi)),
        }));
        seq += 1;
    }
    heap.pop().map(|Reverse(root)| root)
}

/// Walk the tree, assigning `0` to left edges and `1` to right edges.
fn build_codes(root: &Node) -> CodeTable {
    let mut codes = CodeTable::new();
    let mut path = Vec::new();
    match &root.kind {
        // No merge happened: give the lone symbol a one-bit code.
        NodeKind::Leaf(sym) => {
            codes.insert(*sym, CodeWord::from_path(&[false]));
        }
        NodeKind::Internal(..) => walk(root, &mut path, &mut codes),
    }
    codes
}

fn walk(node: &Node, path: &mut Vec<bool>, codes: &mut CodeTable) {
    match &node.kind {
        NodeKind::Leaf(sym) => {
            codes.insert(*sym, CodeWord::from_path(path));
        }
        NodeKind::Internal(left, right) => {
            path.push(false);
            walk(left, path, codes);
            path.pop();
            path.push(true);
            walk(right, path, codes);
            path.pop();
        }
    }
}

/// Serialize a code table (layout at module level).
pub fn serialize_table(codes: &CodeTable) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + codes.len() * 3);
    out.extend_from_slice(&(codes.len() as u16).to_le_bytes());
    for (&sym, code) in codes {
        out.push(sym);
        out.push(code.len);
        out.extend_from_slice(&code.bits);
    }
    out
}

/// Exact inverse of [`serialize_table`].
pub fn deserialize_table(data: &[u8]) -> Result<CodeTable> {
    let malformed = |msg: &str| Error::MalformedCodeTable(msg.to_string());
    if data.len() < 2 {
        return Err(malformed("missing symbol count"));
    }
    let count = u16::from_le_bytes([data[0], data[1]]) as usize;

    let mut codes = CodeTable::new();
    let mut pos = 2;
    for _ in 0..count {
        if pos + 2 > data.len() {
            return Err(malformed("truncated entry header"));
        }
        let sym = data[pos];
        let len = data[pos + 1];
        pos += 2;
        if len == 0 {
            return Err(malformed("zero-length code"));
        }
        let nbytes = (len as usize).div_ceil(8);
        if pos + nbytes > data.len() {
            return Err(malformed("code length exceeds available packed bits"));
        }
        let word = CodeWord {
            bits: data[pos..pos + nbytes].to_vec(),
            len,
        };
        pos += nbytes;
        if codes.insert(sym, word).is_some() {
            return Err(malformed("duplicate symbol"));
        }
    }
    Ok(codes)
}

#[derive(Default)]
struct TrieNode {
    symbol: Option<u8>,
    zero: Option<Box<TrieNode>>,
    one: Option<Box<TrieNode>>,
}

/// Build the code → symbol decoding trie, rejecting tables that are not
/// prefix-free.
fn build_decoder(codes: &CodeTable) -> Result<TrieNode> {
    let conflict = || Error::MalformedCodeTable("codes are not prefix-free".to_string());
    let mut root = TrieNode::default();
    for (&sym, code) in codes {
        let mut node = &mut root;
        for i in 0..code.len as usize {
            if node.symbol.is_some() {
                // An existing shorter code is a prefix of this one.
                return Err(conflict());
            }
            let child = if code.bit(i) {
                &mut node.one
            } else {
                &mut node.zero
            };
            node = &mut **child.get_or_insert_with(Default::default);
        }
        if node.symbol.is_some() || node.zero.is_some() || node.one.is_some() {
            return Err(conflict());
        }
        node.symbol = Some(sym);
    }
    Ok(root)
}

/// Metadata the Huffman inverse needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanMetadata {
    /// Serialized code table; empty when `applied` is `false`.
    pub table: Vec<u8>,
    /// Zero bits appended to fill the final packed byte (0–7).
    pub padding_bits: u8,
    /// `false` means the stage output equals its input verbatim.
    pub applied: bool,
}

impl HuffmanMetadata {
    fn passthrough() -> Self {
        Self {
            table: Vec::new(),
            padding_bits: 0,
            applied: false,
        }
    }
}

/// Entropy stage of the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct HuffmanStage;

impl Stage for HuffmanStage {
    type Meta = HuffmanMetadata;

    fn name(&self) -> &'static str {
        "huffman"
    }

    fn encode(&self, input: &[u8]) -> Result<(Vec<u8>, HuffmanMetadata)> {
        if input.len() < MIN_INPUT_LEN {
            return Ok((input.to_vec(), HuffmanMetadata::passthrough()));
        }

        let freq = build_frequency_table(input);
        let root = match build_tree(&freq) {
            Some(root) => root,
            None => return Ok((input.to_vec(), HuffmanMetadata::passthrough())),
        };
        let codes = build_codes(&root);

        let mut writer = BitWriter::with_capacity(input.len());
        for &b in input {
            let code = &codes[&b];
            writer.push_packed(&code.bits, code.len as usize);
        }
        let (packed, padding_bits) = writer.finish();
        let table = serialize_table(&codes);

        if packed.len() + table.len() + FALLBACK_SLACK >= input.len() {
            return Ok((input.to_vec(), HuffmanMetadata::passthrough()));
        }
        Ok((
            packed,
            HuffmanMetadata {
                table,
                padding_bits,
                applied: true,
            },
        ))
    }

    fn decode(&self, input: &[u8], meta: &HuffmanMetadata) -> Result<Vec<u8>> {
        if !meta.applied {
            return Ok(input.to_vec());
        }

        let codes = deserialize_table(&meta.table)?;
        let root = build_decoder(&codes)?;

        let mut out = Vec::with_capacity(input.len() * 2);
        let mut node = &root;
        for bit in BitReader::new(input, meta.padding_bits) {
            let next = if bit { &node.one } else { &node.zero };
            node = next.as_deref().ok_or_else(|| {
                Error::MalformedCodeTable("bit sequence matches no codeword".to_string())
            })?;
            if let Some(sym) = node.symbol {
                out.push(sym);
                node = &root;
            }
        }
        // Bits that end mid-codeword past the declared padding are ignored.
        Ok(out)
    }
}
