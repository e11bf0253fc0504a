//! # Common Test Utilities
//!
//! `TestApp` spawns the real router on a random port. Both Google endpoints
//! (the OAuth token exchange and the Document AI processor) are served by one
//! `httpmock::MockServer`, and the service-account key, config file and upload
//! directory live in a temporary directory owned by the harness.

// Not every test file uses every helper.
#![allow(unused)]

use anyhow::Result;
use axum::serve;
use httpmock::{prelude::*, Mock};
use invoice_parser_server::{
    config, router,
    state::{build_app_state, AppState},
};
use invoice_parser_test_utils::helpers::write_service_account_key;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde_json::{json, Value};
use std::{net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const ACCESS_TOKEN: &str = "test-access-token";
pub const PROCESS_PATH: &str = "/v1/projects/test-project/locations/us/processors/proc-123:process";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    pub upload_dir: PathBuf,
    _workdir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the server with the default test configuration.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_config("").await
    }

    /// Spawns the server, appending `extra_yaml` (top-level keys) to the test config.
    pub async fn spawn_with_config(extra_yaml: &str) -> Result<Self> {
        let mock_server = MockServer::start_async().await;
        let workdir = tempdir()?;

        let key_path = workdir.path().join("googleKey.json");
        write_service_account_key(&key_path, &mock_server.url("/token"))?;

        let upload_dir = workdir.path().join("uploads");
        let config_path = workdir.path().join("config.yml");
        let config_content = format!(
            r#"
upload_dir: "{}"
credentials:
  key_path: "{}"
document_ai:
  project_id: "test-project"
  location: "us"
  processor_id: "proc-123"
  api_base_url: "{}"
{extra_yaml}
"#,
            upload_dir.display(),
            key_path.display(),
            mock_server.base_url(),
        );
        std::fs::write(&config_path, config_content)?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = build_app_state(config).await?;

        Self::spawn_with_state(app_state, mock_server, workdir, upload_dir).await
    }

    pub async fn spawn_with_state(
        app_state: AppState,
        mock_server: MockServer,
        workdir: TempDir,
        upload_dir: PathBuf,
    ) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let app_state_for_harness = app_state.clone();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            upload_dir,
            _workdir: workdir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Mocks a successful token exchange.
    pub async fn mock_token(&self) -> Mock<'_> {
        self.mock_server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/token")
                    .body_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer");
                then.status(200).json_body(json!({
                    "access_token": ACCESS_TOKEN,
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }));
            })
            .await
    }

    /// Posts a multipart form to `/parse-invoices`.
    pub async fn post_form(&self, form: Form) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(format!("{}/parse-invoices", self.address))
            .multipart(form)
            .send()
            .await?)
    }

    /// Number of entries left in the upload directory.
    pub fn upload_dir_entries(&self) -> usize {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// An empty form that sends file names verbatim, without percent-encoding.
pub fn new_form() -> Form {
    Form::new().percent_encode_noop()
}

/// A `files` part carrying `bytes` under `file_name`.
pub fn file_part(file_name: &str, bytes: Vec<u8>) -> Part {
    Part::bytes(bytes).file_name(file_name.to_string())
}

/// A Document AI response body listing `(type, mentionText)` entities.
pub fn entities_body(entities: &[(&str, &str)]) -> Value {
    let entities: Vec<Value> = entities
        .iter()
        .map(|(entity_type, text)| json!({"type": entity_type, "mentionText": text}))
        .collect();
    json!({ "document": { "entities": entities } })
}
