//! Error types for chain building operations.
//!
//! Only fatal conditions live here. A chain that stops short of a root, or a
//! walk that runs into a trust loop, is reported through
//! [`ChainStatus`](crate::domain::ChainStatus) instead.

use thiserror::Error;

/// Result type for chain building operations
pub type ChainResult<T> = Result<T, ChainError>;

/// Fatal errors raised while loading certificates or configuration
#[derive(Error, Debug, miette::Diagnostic)]
pub enum ChainError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("PEM decoding error: {0}")]
    PemError(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(help("check the config file or the CA_PATH / DEBUG environment variables"))]
    ConfigurationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<std::io::Error> for ChainError {
    fn from(error: std::io::Error) -> Self {
        ChainError::IoError(error.to_string())
    }
}

impl From<der::Error> for ChainError {
    fn from(error: der::Error) -> Self {
        ChainError::Asn1Error(error.to_string())
    }
}

impl From<pem::PemError> for ChainError {
    fn from(error: pem::PemError) -> Self {
        ChainError::PemError(error.to_string())
    }
}
