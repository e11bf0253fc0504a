//! # Batch Orchestrator
//!
//! Drives one batch of uploaded files through the credential provider, the page
//! splitter, and the extraction client. Files and units are processed strictly
//! in order, one remote call at a time. A failure in one file is recorded in
//! that file's result and never aborts the rest of the batch; only a failure to
//! obtain a token does.

use crate::{
    auth::{BearerToken, TokenProvider},
    documentai::DocumentProcessor,
    errors::{CredentialError, FileProcessingError},
    pdf,
    types::{ExtractionOutcome, ExtractionUnit, FileResult, MediaType},
};
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Report failed extraction calls as `FileResult::error` instead of empty data.
    pub strict_extraction: bool,
}

#[derive(Clone, Debug)]
pub struct InvoiceParser {
    token_provider: Box<dyn TokenProvider>,
    processor: Box<dyn DocumentProcessor>,
    options: ParseOptions,
}

impl InvoiceParser {
    pub fn new(
        token_provider: Box<dyn TokenProvider>,
        processor: Box<dyn DocumentProcessor>,
        options: ParseOptions,
    ) -> Self {
        Self {
            token_provider,
            processor,
            options,
        }
    }

    /// Parses a batch, returning an empty vector if no token can be obtained.
    pub async fn parse_invoices(&self, file_paths: &[PathBuf], multi_page: bool) -> Vec<FileResult> {
        match self.try_parse_invoices(file_paths, multi_page).await {
            Ok(results) => results,
            Err(e) => {
                error!("Error in parse_invoices: {e}");
                Vec::new()
            }
        }
    }

    /// Parses a batch, surfacing the one failure that aborts it.
    #[instrument(skip(self, file_paths), fields(files = file_paths.len()))]
    pub async fn try_parse_invoices(
        &self,
        file_paths: &[PathBuf],
        multi_page: bool,
    ) -> Result<Vec<FileResult>, CredentialError> {
        if file_paths.is_empty() {
            return Ok(Vec::new());
        }

        let token = self.token_provider.get_token().await?;
        let mut results = Vec::new();

        for file_path in file_paths {
            match self.parse_file(&token, file_path, multi_page).await {
                Ok(file_results) => results.extend(file_results),
                Err(e) => {
                    error!("Error processing file {}: {e}", file_path.display());
                    results.push(FileResult::failure(display_name(file_path), e.to_string()));
                }
            }
        }

        info!(results = results.len(), "Batch complete.");
        Ok(results)
    }

    async fn parse_file(
        &self,
        token: &BearerToken,
        file_path: &Path,
        multi_page: bool,
    ) -> Result<Vec<FileResult>, FileProcessingError> {
        let bytes = tokio::fs::read(file_path)
            .await
            .map_err(|source| FileProcessingError::Io {
                path: file_path.to_path_buf(),
                source,
            })?;

        let units = plan_units(file_path, bytes, multi_page)?;
        if units.is_empty() {
            warn!("No pages could be extracted from {}", file_path.display());
        }

        let mut results = Vec::with_capacity(units.len());
        for unit in units {
            let outcome = self.process_unit(token, &unit).await;
            results.push(outcome.into_file_result(unit.label, self.options.strict_extraction));
        }
        Ok(results)
    }

    async fn process_unit(&self, token: &BearerToken, unit: &ExtractionUnit) -> ExtractionOutcome {
        match self
            .processor
            .process(token, &unit.bytes, unit.media_type)
            .await
        {
            Ok(entries) => {
                info!(unit = %unit.label, entities = entries.len(), "Extracted fields.");
                ExtractionOutcome::from_entries(entries)
            }
            Err(e) => {
                error!(unit = %unit.label, "Error processing document: {e}");
                ExtractionOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Derives the units of work for one file.
///
/// With `multi_page` set, a PDF becomes one unit per successfully split page,
/// labeled `"<name> - Page <k>"`. Anything else is a single unit named after
/// the file, with its media type inferred from the extension.
pub fn plan_units(
    file_path: &Path,
    bytes: Vec<u8>,
    multi_page: bool,
) -> Result<Vec<ExtractionUnit>, FileProcessingError> {
    let file_name = file_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| FileProcessingError::MissingFileName(file_path.to_path_buf()))?;
    let media_type = MediaType::from_path(file_path);

    // Unknown extensions are submitted as PDF but never split.
    let splittable = MediaType::from_extension(file_path).is_some_and(|m| m.is_paginated());

    if multi_page && splittable {
        return Ok(pdf::split_pages(&bytes)
            .into_iter()
            .enumerate()
            .map(|(i, page)| ExtractionUnit {
                label: format!("{file_name} - Page {}", i + 1),
                bytes: page,
                media_type: MediaType::Pdf,
            })
            .collect());
    }

    Ok(vec![ExtractionUnit {
        label: file_name,
        bytes,
        media_type,
    }])
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
