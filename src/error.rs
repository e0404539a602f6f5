use thiserror::Error;

#[derive(Error, Debug)]
pub enum CcscanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Extractor error: {0}")]
    Extractor(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Lock file already held: {0}")]
    LockHeld(String),
}

pub type Result<T> = std::result::Result<T, CcscanError>;
