/// Result alias used throughout the crate.
pub type GridsheetResult<T> = Result<T, GridsheetError>;

/// Errors that escape the composition engine.
///
/// Per-image decode failures and per-resource load failures (overlay, sticker) are absorbed inside
/// the engine and never surface here. Cancellation is not an error either.
#[derive(thiserror::Error, Debug)]
pub enum GridsheetError {
    /// A pre-condition was violated before any work started.
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal drawing failure.
    #[error("render error: {0}")]
    Render(String),

    /// Encoding a sheet failed; the remaining batches were abandoned.
    #[error("encode error on batch {batch} ({completed} sheet(s) completed): {reason}")]
    Encode {
        /// 0-based index of the batch whose sheet failed to encode.
        batch: usize,
        /// Number of sheets fully encoded before the failure.
        completed: usize,
        /// Encoder failure description.
        reason: String,
    },

    /// Persistence collaborator failure.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped I/O or third-party error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GridsheetError {
    /// Build a [`GridsheetError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`GridsheetError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`GridsheetError::Store`].
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Build a [`GridsheetError::Serde`].
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for failures raised before any sheet was rendered.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
