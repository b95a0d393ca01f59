use thiserror::Error;

/// Malformed signal input. Always names the offending field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid side: {0:?} (expected BUY or SELL)")]
    InvalidSide(String),

    #[error("Field {field} is not finite: {value}")]
    NonFinite { field: &'static str, value: f64 },
}

impl ValidationError {
    /// Name of the request field that failed validation.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidSide(_) => "side",
            ValidationError::NonFinite { field, .. } => field,
        }
    }
}

/// Failure inside a trained classifier, at load time or at prediction time.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed model artifact: {0}")]
    Malformed(String),

    #[error("Feature shape mismatch: model expects {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Model produced an invalid probability: {0}")]
    InvalidOutput(f64),

    #[error("Training failed: {0}")]
    Training(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Malformed(err.to_string())
    }
}

/// Anything that stopped a signal from being scored.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Invalid signal: {0}")]
    Validation(#[from] ValidationError),

    #[error("Classifier invocation failed: {0}")]
    Model(#[source] ModelError),
}

/// Historical trade source could not be used. Recovered by the assembler.
#[derive(Debug, Error)]
pub enum DataUnavailableError {
    #[error("Historical source request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Historical source returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Historical source response could not be parsed: {0}")]
    Parse(String),
}
