//! Error types for the planogram core library.

/// Top-level error enum for the planogram core library.
#[derive(Debug, thiserror::Error)]
pub enum PogError {
    #[error("Product not found: {code}")]
    NotFound { code: String },

    #[error("Camera permission required or not available: {0}")]
    DecodeSession(String),

    #[error("Asset load failed: {0}")]
    AssetLoad(String),

    #[error("Unknown store: {0}")]
    UnknownStore(String),

    #[error("Unknown planogram: {0}")]
    UnknownPlanogram(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PogError {
    /// Whether the error is a transient, user-visible notice rather than a
    /// failure of the dataset itself.
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            PogError::NotFound { .. } | PogError::DecodeSession(_) | PogError::AssetLoad(_)
        )
    }
}

#[cfg(feature = "python")]
impl From<PogError> for pyo3::PyErr {
    fn from(err: PogError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyLookupError, PyRuntimeError, PyValueError};

        match &err {
            PogError::NotFound { .. } | PogError::UnknownStore(_) | PogError::UnknownPlanogram(_) => {
                PyLookupError::new_err(err.to_string())
            }
            PogError::DecodeSession(_) | PogError::Sqlite(_) => {
                PyRuntimeError::new_err(err.to_string())
            }
            PogError::AssetLoad(_) | PogError::Io(_) => PyIOError::new_err(err.to_string()),
            PogError::Dataset(_) | PogError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type PogResult<T> = Result<T, PogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_carries_clean_code() {
        let err = PogError::NotFound {
            code: "000111".to_string(),
        };
        assert_eq!(err.to_string(), "Product not found: 000111");
        assert!(err.is_notice());
    }

    #[test]
    fn dataset_errors_are_not_notices() {
        assert!(!PogError::Dataset("bad".into()).is_notice());
        assert!(!PogError::UnknownStore("42".into()).is_notice());
    }
}
