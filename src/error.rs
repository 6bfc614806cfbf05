use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Malformed input record: {0}")]
    MalformedRecord(String),

    #[error("Invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("Enrichment failed: {message}")]
    Enrichment { message: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
