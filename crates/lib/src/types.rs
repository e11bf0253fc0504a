//! # Core Data Types
//!
//! The value types that flow through an extraction batch: the media type of a
//! unit of work, the field entries pulled out of the remote response, and the
//! per-file results handed back to the caller.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The media types the remote processor accepts from this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Pdf,
    Jpeg,
    Png,
}

impl MediaType {
    /// The MIME string sent as `rawDocument.mimeType`.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaType::Pdf => "application/pdf",
            MediaType::Jpeg => "image/jpeg",
            MediaType::Png => "image/png",
        }
    }

    /// Recognizes a file extension, case-insensitively.
    pub fn from_extension(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(MediaType::Pdf),
            "jpg" | "jpeg" => Some(MediaType::Jpeg),
            "png" => Some(MediaType::Png),
            _ => None,
        }
    }

    /// Infers the media type to submit, falling back to PDF for unknown extensions.
    pub fn from_path(path: &Path) -> Self {
        Self::from_extension(path).unwrap_or(MediaType::Pdf)
    }

    /// Whether documents of this type can be split into pages.
    pub fn is_paginated(&self) -> bool {
        matches!(self, MediaType::Pdf)
    }
}

/// One labeled datum extracted from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: String,
}

impl FieldEntry {
    pub fn new(field_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            value: value.into(),
        }
    }
}

/// The result reported for one uploaded file, or for one page of it when split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    pub file_name: String,
    pub data: Vec<FieldEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileResult {
    pub fn success(file_name: impl Into<String>, data: Vec<FieldEntry>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
            error: None,
        }
    }

    pub fn failure(file_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            data: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A single blob submitted to the remote processor in one call.
#[derive(Clone)]
pub struct ExtractionUnit {
    /// The `fileName` the unit's result is reported under.
    pub label: String,
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
}

impl std::fmt::Debug for ExtractionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionUnit")
            .field("label", &self.label)
            .field("size", &self.bytes.len())
            .field("media_type", &self.media_type)
            .finish()
    }
}

/// What came back from processing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// The processor found at least one entity.
    Entries(Vec<FieldEntry>),
    /// The call succeeded but nothing was found.
    Empty,
    /// The call failed; the reason is kept for logging or strict reporting.
    Failed(String),
}

impl ExtractionOutcome {
    pub fn from_entries(entries: Vec<FieldEntry>) -> Self {
        if entries.is_empty() {
            ExtractionOutcome::Empty
        } else {
            ExtractionOutcome::Entries(entries)
        }
    }

    /// Collapses the outcome into a `FileResult`.
    ///
    /// When `strict` is false, failures are reported as empty data with no error.
    pub fn into_file_result(self, label: String, strict: bool) -> FileResult {
        match self {
            ExtractionOutcome::Entries(entries) => FileResult::success(label, entries),
            ExtractionOutcome::Empty => FileResult::success(label, Vec::new()),
            ExtractionOutcome::Failed(reason) if strict => FileResult::failure(label, reason),
            ExtractionOutcome::Failed(_) => FileResult::success(label, Vec::new()),
        }
    }
}
