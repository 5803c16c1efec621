use thiserror::Error;

/// A malformed or missing input field.
///
/// `index` is set when the field belongs to one entry of an ingest batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub index: Option<usize>,
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            index: None,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn entry(
        index: usize,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index: Some(index),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field location in the request, `[2].timestamp` for batch entries.
    pub fn path(&self) -> String {
        match self.index {
            Some(index) => format!("[{index}].{}", self.field),
            None => self.field.clone(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path(), self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported resolution `{0}`, expected one of: day, hour, raw")]
pub struct UnsupportedResolutionError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("measurement store unavailable: {0}")]
    Unavailable(String),

    #[error("measurement store operation failed: {0}")]
    Query(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasurementError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    UnsupportedResolution(#[from] UnsupportedResolutionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
