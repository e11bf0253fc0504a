//! # Application State
//!
//! The shared state handed to every request handler: the resolved configuration
//! and the invoice parser wired to its credential provider and Document AI client.

use crate::config::AppConfig;
use invoice_parser::{
    build_http_client, CachedTokenProvider, DocumentAiClient, DocumentAiSettings, InvoiceParser,
    ParseOptions, ServiceAccountTokenProvider, TokenProvider,
};
use std::{sync::Arc, time::Duration};
use tracing::info;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub parser: Arc<InvoiceParser>,
}

impl AppState {
    pub fn new(config: AppConfig, parser: InvoiceParser) -> Self {
        Self {
            config: Arc::new(config),
            parser: Arc::new(parser),
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// This creates the upload directory, one HTTP client shared by the token
/// exchange and extraction calls, and the invoice parser itself.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;

    let http_client = build_http_client(Some(Duration::from_secs(
        config.document_ai.request_timeout_secs,
    )))?;

    let service_account = ServiceAccountTokenProvider::new(
        &config.credentials.key_path,
        config.credentials.scope.clone(),
        http_client.clone(),
    );
    let token_provider: Box<dyn TokenProvider> = if config.credentials.cache_tokens {
        Box::new(CachedTokenProvider::new(
            service_account,
            chrono::Duration::seconds(config.credentials.refresh_margin_secs),
        ))
    } else {
        Box::new(service_account)
    };

    let settings = DocumentAiSettings {
        project_id: config.document_ai.project_id.clone(),
        location: config.document_ai.location.clone(),
        processor_id: config.document_ai.processor_id.clone(),
        api_base_url: config.document_ai.api_base_url.clone(),
    };
    let processor = DocumentAiClient::new(&settings, http_client);
    info!(endpoint = %processor.endpoint(), "Initialized Document AI client.");

    let parser = InvoiceParser::new(
        token_provider,
        Box::new(processor),
        ParseOptions {
            strict_extraction: config.strict_extraction,
        },
    );

    Ok(AppState::new(config, parser))
}
