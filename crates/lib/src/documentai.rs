//! # Extraction Client
//!
//! A thin client for the Document AI `:process` endpoint. One call per unit,
//! no retries; the reshaped response is a flat list of `FieldEntry` values.

use crate::{
    auth::BearerToken,
    errors::ExtractionError,
    types::{FieldEntry, MediaType},
};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use dyn_clone::DynClone;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, instrument};

// --- Document AI request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRequest<'a> {
    raw_document: RawDocument<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument<'a> {
    mime_type: &'a str,
    content: String,
}

#[derive(Deserialize, Debug, Default)]
struct ProcessResponse {
    #[serde(default)]
    document: Option<Document>,
}

#[derive(Deserialize, Debug, Default)]
struct Document {
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Entity {
    #[serde(rename = "type", default)]
    entity_type: Option<String>,
    #[serde(default)]
    mention_text: Option<String>,
}

impl From<Entity> for FieldEntry {
    fn from(entity: Entity) -> Self {
        FieldEntry::new(
            entity.entity_type.unwrap_or_else(|| "Unknown".to_string()),
            entity.mention_text.unwrap_or_default(),
        )
    }
}

// --- Processor trait ---

/// Submits one blob to a document-understanding service.
#[async_trait]
pub trait DocumentProcessor: Send + Sync + Debug + DynClone {
    async fn process(
        &self,
        token: &BearerToken,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<Vec<FieldEntry>, ExtractionError>;
}

dyn_clone::clone_trait_object!(DocumentProcessor);

// --- Document AI implementation ---

/// Identifies the processor to call.
#[derive(Debug, Clone)]
pub struct DocumentAiSettings {
    pub project_id: String,
    pub location: String,
    pub processor_id: String,
    /// Overrides `https://{location}-documentai.googleapis.com`.
    pub api_base_url: Option<String>,
}

impl DocumentAiSettings {
    pub fn endpoint(&self) -> String {
        let base = self
            .api_base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}-documentai.googleapis.com", self.location));
        format!(
            "{}/v1/projects/{}/locations/{}/processors/{}:process",
            base.trim_end_matches('/'),
            self.project_id,
            self.location,
            self.processor_id
        )
    }
}

#[derive(Clone, Debug)]
pub struct DocumentAiClient {
    client: ReqwestClient,
    endpoint: String,
}

impl DocumentAiClient {
    pub fn new(settings: &DocumentAiSettings, client: ReqwestClient) -> Self {
        Self {
            client,
            endpoint: settings.endpoint(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentProcessor for DocumentAiClient {
    #[instrument(skip(self, token, bytes), fields(size = bytes.len(), mime = media_type.mime()))]
    async fn process(
        &self,
        token: &BearerToken,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<Vec<FieldEntry>, ExtractionError> {
        let request_body = ProcessRequest {
            raw_document: RawDocument {
                mime_type: media_type.mime(),
                content: general_purpose::STANDARD.encode(bytes),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token.secret())
            .json(&request_body)
            .send()
            .await
            .map_err(ExtractionError::Request)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api { status, body });
        }

        let process_response: ProcessResponse = response
            .json()
            .await
            .map_err(ExtractionError::Deserialization)?;

        let entries: Vec<FieldEntry> = process_response
            .document
            .unwrap_or_default()
            .entities
            .into_iter()
            .map(FieldEntry::from)
            .collect();

        debug!(entities = entries.len(), "Document AI call succeeded.");
        Ok(entries)
    }
}
