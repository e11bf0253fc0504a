use async_trait::async_trait;
use chrono::{Duration, Utc};
use invoice_parser::{
    BearerToken, CredentialError, DocumentProcessor, ExtractionError, FieldEntry, MediaType,
    TokenProvider,
};
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// --- Mock Token Provider ---

#[derive(Clone, Debug, Default)]
pub struct MockTokenProvider {
    calls: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
}

impl MockTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call is rejected.
    pub fn failing() -> Self {
        let provider = Self::default();
        provider.fail.store(true, Ordering::SeqCst);
        provider
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for MockTokenProvider {
    async fn get_token(&self) -> Result<BearerToken, CredentialError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(CredentialError::Rejected {
                status: 401,
                body: "MockTokenProvider: configured to fail".to_string(),
            });
        }
        Ok(BearerToken::new(
            format!("mock-token-{n}"),
            Utc::now() + Duration::hours(1),
        ))
    }
}

// --- Mock Document Processor ---

/// One recorded call to `MockDocumentProcessor::process`.
#[derive(Clone, Debug)]
pub struct ProcessCall {
    pub token: String,
    pub media_type: MediaType,
    pub bytes: Vec<u8>,
}

/// Responses are consumed in call order; once exhausted, calls return no entities.
#[derive(Clone, Debug, Default)]
pub struct MockDocumentProcessor {
    responses: Arc<Mutex<VecDeque<Result<Vec<FieldEntry>, (u16, String)>>>>,
    calls: Arc<Mutex<Vec<ProcessCall>>>,
}

impl MockDocumentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response.
    pub fn push_entries(&self, entries: Vec<FieldEntry>) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(entries));
        self
    }

    /// Queues a failed response with the given HTTP status.
    pub fn push_failure(&self, status: u16, body: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err((status, body.to_string())));
        self
    }

    pub fn get_calls(&self) -> Vec<ProcessCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentProcessor for MockDocumentProcessor {
    async fn process(
        &self,
        token: &BearerToken,
        bytes: &[u8],
        media_type: MediaType,
    ) -> Result<Vec<FieldEntry>, ExtractionError> {
        self.calls.lock().unwrap().push(ProcessCall {
            token: token.secret().to_string(),
            media_type,
            bytes: bytes.to_vec(),
        });

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(entries)) => Ok(entries),
            Some(Err((status, body))) => Err(ExtractionError::Api { status, body }),
            None => Ok(Vec::new()),
        }
    }
}

// --- Test-Specific Helpers ---
pub mod helpers {
    use anyhow::Result;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use serde_json::json;
    use std::path::Path;

    /// A throwaway RSA key pair for signing tests. Never use it for anything real.
    pub const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_rsa_key.pem");
    pub const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_rsa_key.pub.pem");

    pub const TEST_CLIENT_EMAIL: &str = "invoice-parser@test-project.iam.gserviceaccount.com";

    /// Generates a PDF with one page per entry of `page_texts`.
    pub fn generate_test_pdf(page_texts: &[&str]) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(page_texts.len());
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 14.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }

    /// Writes a service-account key file whose token endpoint is `token_uri`.
    pub fn write_service_account_key(path: &Path, token_uri: &str) -> Result<()> {
        let key = json!({
            "type": "service_account",
            "project_id": "test-project",
            "private_key_id": "test-key-id",
            "private_key": TEST_PRIVATE_KEY,
            "client_email": TEST_CLIENT_EMAIL,
            "token_uri": token_uri,
        });
        std::fs::write(path, serde_json::to_vec_pretty(&key)?)?;
        Ok(())
    }
}
