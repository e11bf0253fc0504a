//! # Page Splitter
//!
//! Splits a multi-page PDF into standalone single-page PDFs using `lopdf`.
//! Each output buffer is a complete document the same reader can load back.

use crate::errors::PdfSplitError;
use lopdf::Document;
use tracing::{debug, warn};

/// Returns the number of pages in `bytes`.
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfSplitError> {
    let document = Document::load_mem(bytes).map_err(PdfSplitError::Load)?;
    Ok(document.get_pages().len())
}

/// Splits `bytes` into one document per page, reporting each page's outcome.
///
/// The outer error means the document itself could not be loaded. The inner
/// results are in source page order.
pub fn split_pages_detailed(
    bytes: &[u8],
) -> Result<Vec<Result<Vec<u8>, PdfSplitError>>, PdfSplitError> {
    let document = Document::load_mem(bytes).map_err(PdfSplitError::Load)?;
    let page_numbers: Vec<u32> = document.get_pages().keys().copied().collect();
    debug!(pages = page_numbers.len(), "Loaded PDF for splitting.");

    Ok(page_numbers
        .iter()
        .map(|&page| extract_page(&document, page, &page_numbers))
        .collect())
}

/// Splits `bytes` into one document per page.
///
/// Unreadable documents yield an empty vector and pages that fail to re-encode
/// are dropped; both are logged.
pub fn split_pages(bytes: &[u8]) -> Vec<Vec<u8>> {
    match split_pages_detailed(bytes) {
        Ok(outcomes) => keep_successful_pages(outcomes),
        Err(e) => {
            warn!("Error extracting PDF pages: {e}");
            Vec::new()
        }
    }
}

// Drops failed pages, keeping the rest in source order.
fn keep_successful_pages(outcomes: Vec<Result<Vec<u8>, PdfSplitError>>) -> Vec<Vec<u8>> {
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Skipping page: {e}");
                None
            }
        })
        .collect()
}

fn extract_page(
    document: &Document,
    page: u32,
    all_pages: &[u32],
) -> Result<Vec<u8>, PdfSplitError> {
    let mut single = document.clone();
    let others: Vec<u32> = all_pages.iter().copied().filter(|&p| p != page).collect();
    single.delete_pages(&others);
    single.prune_objects();

    let mut buffer = Vec::new();
    single
        .save_to(&mut buffer)
        .map_err(|e| PdfSplitError::Page {
            page,
            message: e.to_string(),
        })?;
    Ok(buffer)
}
