pub mod bits;
pub mod huffman;
pub mod lz77;
pub mod pipeline;

pub use huffman::{HuffmanMetadata, HuffmanStage};
pub use lz77::{Lz77Stage, LzMetadata};
pub use pipeline::{
    compress, decode_payload, decompress, encode_payload, Pipeline, PipelineMetadata,
};
