use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Basis API error: {status} - {body}")]
    Basis {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Report error: {0}")]
    Report(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Callback listener error: {0}")]
    Callback(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Short label for the error kind, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Basis { .. } => "api",
            AppError::Report(_) => "report",
            AppError::Config(_) => "config",
            AppError::Callback(_) => "callback",
            AppError::Http(_) => "transport",
            AppError::Serialization(_) => "malformed",
            AppError::Io(_) => "io",
            AppError::Other(_) => "other",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
