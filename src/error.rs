//! Error types for verifact.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifactError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Verification transport errors
    #[error("Verification request failed: {message}")]
    VerificationRequest { message: String },

    #[error("Verification service returned status {status}: {body}")]
    VerificationStatus { status: u16, body: String },

    #[error("Verification stream failed: {message}")]
    VerificationStream { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VerifactError>;
