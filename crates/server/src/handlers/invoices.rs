//! # Invoice Parsing Handler
//!
//! Accepts a multipart batch of invoice files, stages the valid ones in a
//! scratch directory, and runs them through the shared `InvoiceParser`.

use super::{AppError, AppState};
use crate::upload::{is_allowed, secure_filename, ScratchDir};
use axum::{body::Bytes, extract::State, Json};
use axum_extra::extract::Multipart;
use invoice_parser::FileResult;
use std::{path::PathBuf, time::Duration};
use tracing::{debug, info, warn};

/// A multipart `files` part as received.
struct UploadedFile {
    file_name: String,
    bytes: Bytes,
}

/// Reads the `multi_page` form value. Only `true`, in any case, enables splitting.
fn parse_multi_page(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// The handler for `POST /parse-invoices`.
pub async fn parse_invoices_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<FileResult>>, AppError> {
    let mut uploads: Vec<UploadedFile> = Vec::new();
    let mut saw_files_part = false;
    let mut multi_page = true;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                saw_files_part = true;
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                uploads.push(UploadedFile { file_name, bytes });
            }
            "multi_page" => {
                multi_page = parse_multi_page(&field.text().await?);
            }
            other => debug!("Ignoring multipart field '{other}'."),
        }
    }

    if !saw_files_part {
        return Err(AppError::BadRequest(
            "No files part in the request".to_string(),
        ));
    }
    if uploads.first().is_none_or(|upload| upload.file_name.is_empty()) {
        return Err(AppError::BadRequest("No files selected".to_string()));
    }

    let allowed = &app_state.config.allowed_extensions;
    let accepted: Vec<(String, Bytes)> = uploads
        .into_iter()
        .filter_map(|upload| match secure_filename(&upload.file_name) {
            Some(safe_name) if is_allowed(&safe_name, allowed) => Some((safe_name, upload.bytes)),
            _ => {
                warn!("Skipping disallowed upload '{}'.", upload.file_name);
                None
            }
        })
        .collect();

    if accepted.is_empty() {
        return Err(AppError::BadRequest("No valid files uploaded".to_string()));
    }

    info!(
        files = accepted.len(),
        multi_page, "Received invoice parsing request."
    );

    let scratch = ScratchDir::create(&app_state.config.upload_dir)?;
    let outcome = run_batch(&app_state, &scratch, accepted, multi_page).await;
    scratch.cleanup();

    Ok(Json(outcome?))
}

async fn run_batch(
    app_state: &AppState,
    scratch: &ScratchDir,
    accepted: Vec<(String, Bytes)>,
    multi_page: bool,
) -> Result<Vec<FileResult>, AppError> {
    let mut file_paths: Vec<PathBuf> = Vec::with_capacity(accepted.len());
    for (index, (file_name, bytes)) in accepted.into_iter().enumerate() {
        file_paths.push(scratch.write(index, &file_name, &bytes).await?);
    }

    let batch = app_state.parser.try_parse_invoices(&file_paths, multi_page);
    let results = match app_state.config.batch_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), batch)
            .await
            .map_err(|_| AppError::Timeout(secs))??,
        None => batch.await?,
    };

    Ok(results)
}
