//! Error type shared by every bake in this crate.

/// Failure of a bake. Bakes are deterministic, so none of these are worth
/// retrying without changing the input.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BakeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed cubemap geometry: {width}x{height} faces")]
    MalformedGeometry { width: u32, height: u32 },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),
}

impl BakeError {
    pub fn invalid<T: ToString>(msg: T) -> Self {
        BakeError::InvalidInput(msg.to_string())
    }

    pub fn degenerate<T: ToString>(msg: T) -> Self {
        BakeError::DegenerateInput(msg.to_string())
    }
}

pub type BakeResult<T> = Result<T, BakeError>;
