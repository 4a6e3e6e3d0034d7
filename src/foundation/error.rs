/// Convenience result type used across psdgraph.
pub type PsdGraphResult<T> = Result<T, PsdGraphError>;

/// Top-level error taxonomy used by compiler and session APIs.
#[derive(thiserror::Error, Debug)]
pub enum PsdGraphError {
    /// The backing document could not be read, or it produced no layers.
    #[error("document error: {0}")]
    Document(String),

    /// A layer list that violates the nesting or value invariants.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while evaluating a generated graph.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// A sync request that cannot be served in the current session state.
    #[error("sync error: {0}")]
    Sync(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from collaborators or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PsdGraphError {
    /// Build a [`PsdGraphError::Document`] value.
    pub fn document(msg: impl Into<String>) -> Self {
        Self::Document(msg.into())
    }

    /// Build a [`PsdGraphError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PsdGraphError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`PsdGraphError::Sync`] value.
    pub fn sync(msg: impl Into<String>) -> Self {
        Self::Sync(msg.into())
    }

    /// Build a [`PsdGraphError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
