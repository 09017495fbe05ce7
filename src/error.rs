/// Errors produced while turning raw STL bytes into a [`crate::mesh::Mesh`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// The buffer is too short for the geometry its header declares, or a
    /// text record is missing coordinates.
    #[error("malformed STL: {reason}")]
    Format { reason: String },

    /// A token where a float was expected did not parse.
    #[error("line {line}: expected a number, found {token:?}")]
    Parse { line: usize, token: String },

    /// A text `vertex` record appeared before any `facet normal` record.
    #[error("line {line}: vertex has no preceding facet normal")]
    MissingNormal { line: usize },
}

impl DecodeError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        DecodeError::Format { reason: reason.into() }
    }
}

/// Errors reported by a [`crate::viewport::Viewport`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewportError {
    /// The render surface could not be attached to its container.
    #[error("cannot attach render surface: {0}")]
    Container(String),

    /// The viewport was disposed and must not be used again.
    #[error("viewport has been disposed")]
    Disposed,

    /// A fetch result arrived after a newer load superseded it.
    #[error("stale result for fetch #{ticket} (current generation #{current})")]
    Stale { ticket: u64, current: u64 },

    /// The viewport is already inside an operation (reentrant call).
    #[error("viewport is busy")]
    Busy,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ViewportError {
    /// Superseded results are an expected race and are dropped without
    /// telling the user.
    pub fn is_stale(&self) -> bool {
        matches!(self, ViewportError::Stale { .. })
    }
}

/// Errors talking to the remote analysis service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Json(String),

    #[error("the analysis service is only reachable from the browser build")]
    Unsupported,
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Json(e.to_string())
    }
}
