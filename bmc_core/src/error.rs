use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Decode and validation failures.
///
/// All of these are deterministic and non-retryable: they indicate a
/// corrupted input or a caller error, never a transient condition.
/// Compression itself does not produce them for in-range parameters — a
/// stage that cannot shrink its input falls back to passthrough instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A length prefix asked for more bytes than remain in the buffer.
    #[error("truncated input: needed {needed} bytes but only {remaining} remain")]
    TruncatedInput { needed: usize, remaining: usize },

    /// A serialized Huffman code table that cannot describe a valid
    /// prefix-free code.
    #[error("malformed code table: {0}")]
    MalformedCodeTable(String),

    /// Reconstructed payload length disagrees with the stored geometry.
    #[error("size mismatch: expected {expected} bytes, reconstructed {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// An offset or length outside the 15-bit token encoding range, or a
    /// decoded back-reference pointing outside the reconstructed history.
    #[error("offset or length {value} is outside the encodable window range")]
    InvalidWindowParameters { value: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
