/// Convenience result type used across texprep.
pub type TexprepResult<T> = Result<T, TexprepError>;

/// Top-level error taxonomy used by the loaders and bitmap helpers.
#[derive(thiserror::Error, Debug)]
pub enum TexprepError {
    /// Invalid caller-provided arguments (dimensions, strides, overlay mismatch).
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed or truncated container data.
    #[error("decode error: {0}")]
    Decode(String),

    /// Well-formed data in a variant this crate does not handle.
    #[error("unsupported image: {0}")]
    Unsupported(String),

    /// Wrapped lower-level error from decoders or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TexprepError {
    /// Build a [`TexprepError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`TexprepError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`TexprepError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
