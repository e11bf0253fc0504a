use std::path::PathBuf;
use thiserror::Error;

/// Failures obtaining a bearer token. These are fatal to a batch.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to read service account key '{path}': {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Service account key is malformed: {0}")]
    KeyFormat(#[from] serde_json::Error),
    #[error("Failed to sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Failed to reach token endpoint: {0}")]
    Exchange(reqwest::Error),
    #[error("Token endpoint rejected the assertion ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("Token endpoint returned a malformed response: {0}")]
    MalformedResponse(reqwest::Error),
    #[error("Token endpoint returned an unusable lifetime: expires_in={0}")]
    InvalidLifetime(i64),
}

/// Failures of a single remote extraction call.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to send request to Document AI: {0}")]
    Request(reqwest::Error),
    #[error("Document AI returned an error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Failed to deserialize Document AI response: {0}")]
    Deserialization(reqwest::Error),
}

/// Local failures while preparing one uploaded file.
#[derive(Error, Debug)]
pub enum FileProcessingError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Path '{0}' has no file name")]
    MissingFileName(PathBuf),
}

#[derive(Error, Debug)]
pub enum PdfSplitError {
    #[error("Failed to load PDF: {0}")]
    Load(lopdf::Error),
    #[error("Failed to re-encode page {page}: {message}")]
    Page { page: u32, message: String },
}

#[derive(Error, Debug)]
#[error("Failed to build HTTP client: {0}")]
pub struct ClientBuildError(#[from] pub reqwest::Error);
