//! Error types for the admission pipeline.
//!
//! Every failure the pipeline can produce is a variant here. The HTTP
//! boundary maps client-caused variants to 4xx and internal ones to 5xx.

use thiserror::Error;

/// Error type for admission pipeline operations
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Malformed envelope or embedded object bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Well-formed envelope without a request
    #[error("AdmissionReview does not contain a request")]
    MissingRequest,

    /// Malformed bytes reached the patch generator
    #[error("Diff error: {0}")]
    Diff(#[source] serde_json::Error),

    /// Outbound envelope could not be serialized
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

impl AdmissionError {
    /// Stable classification string reported in HTTP error bodies and metrics
    pub fn classification(&self) -> &'static str {
        match self {
            AdmissionError::Decode(_) => "decode_error",
            AdmissionError::MissingRequest => "missing_request",
            AdmissionError::Diff(_) => "diff_error",
            AdmissionError::Encode(_) => "encode_error",
        }
    }

    /// Check if this error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        match self {
            AdmissionError::Decode(_) | AdmissionError::MissingRequest => true,
            AdmissionError::Diff(_) | AdmissionError::Encode(_) => false,
        }
    }
}

/// Result type alias for admission pipeline operations
pub type Result<T> = std::result::Result<T, AdmissionError>;
