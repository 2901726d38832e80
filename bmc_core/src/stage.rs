use crate::error::Result;

/// A reversible transform over an owned byte buffer.
///
/// Each stage consumes its input and produces a fresh buffer plus a typed
/// metadata record its inverse needs. A stage that decides not to transform
/// (input below its size threshold, or the output would not shrink) returns
/// the input verbatim with `applied = false` in its metadata; `decode` must
/// then be the identity on exactly the bytes it received.
pub trait Stage {
    /// Metadata record produced by `encode` and required by `decode`.
    type Meta;

    /// Human-readable stage name for CLI display.
    fn name(&self) -> &'static str;

    /// Transform `input` into a new buffer plus the metadata that inverts it.
    fn encode(&self, input: &[u8]) -> Result<(Vec<u8>, Self::Meta)>;

    /// Invert `encode`, reconstructing the original bytes.
    fn decode(&self, input: &[u8], meta: &Self::Meta) -> Result<Vec<u8>>;
}
