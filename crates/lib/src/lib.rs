//! # Invoice Parser
//!
//! This crate turns uploaded invoice files (PDF or image) into structured field
//! data using a Google Document AI processor. It authenticates with a service
//! account, optionally splits multi-page PDFs, makes one remote call per unit of
//! work, and reshapes each response into a uniform `FileResult`.

pub mod auth;
pub mod documentai;
pub mod errors;
pub mod parser;
pub mod pdf;
pub mod types;

pub use auth::{
    BearerToken, CachedTokenProvider, ServiceAccountKey, ServiceAccountTokenProvider,
    TokenProvider, CLOUD_PLATFORM_SCOPE,
};
pub use documentai::{DocumentAiClient, DocumentAiSettings, DocumentProcessor};
pub use errors::{
    ClientBuildError, CredentialError, ExtractionError, FileProcessingError, PdfSplitError,
};
pub use parser::{plan_units, InvoiceParser, ParseOptions};
pub use types::{ExtractionOutcome, ExtractionUnit, FieldEntry, FileResult, MediaType};

use std::time::Duration;

/// Builds the shared HTTP client used for both the token exchange and extraction calls.
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client, ClientBuildError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}
