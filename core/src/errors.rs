use thiserror::Error;

/// Failures of the text-completion client and of configuration loading
#[derive(Error, Debug)]
pub enum GeminiError {
    /// Missing API key, unreadable or malformed config file
    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    /// The completion came back without usable text
    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}

pub type GeminiResult<T> = Result<T, GeminiError>;
