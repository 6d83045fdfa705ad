use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Failed to start generator: {0}")]
    SpawnError(String),
    #[error("Generator timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("Generator exited with {code:?}:\n{stderr}")]
    ProcessFailure { code: Option<i32>, stderr: String },
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

pub type Result<T> = std::result::Result<T, PanelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = PanelError::Timeout(Duration::from_secs(300));
        assert_eq!(err.to_string(), "Generator timed out after 300s");

        let err = PanelError::ProcessFailure {
            code: Some(2),
            stderr: "bad flag".to_string(),
        };
        assert!(err.to_string().ends_with("bad flag"));

        let err: PanelError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, PanelError::IoError(_)));

        let err = PanelError::Forbidden("image paths are disabled".to_string());
        assert_eq!(err.to_string(), "Forbidden: image paths are disabled");
    }
}
