use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReaderServer;
use crate::error::ServerError;
use crate::types::TermForm;

const USER_AGENT: &str = concat!("readweave/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// `ReaderServer` over HTTP. Connection failures and timeouts become
/// `ServerError::Network`; any non-2xx answer becomes `Rejected`.
#[derive(Debug, Clone)]
pub struct HttpReaderServer {
    client: Client,
    base_url: String,
}

/// A builder that cannot produce a client falls back to reqwest's defaults.
fn build_client(builder: reqwest::ClientBuilder) -> Client {
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "HTTP client setup failed; using defaults");
        Client::new()
    })
}

impl HttpReaderServer {
    pub fn new(base_url: &str) -> Self {
        let mut builder = Client::builder().user_agent(USER_AGENT).connect_timeout(CONNECT_TIMEOUT);
        if base_url.starts_with("http://127.0.0.1") || base_url.starts_with("http://localhost") {
            builder = builder.no_proxy();
        }
        let client = build_client(builder);
        HttpReaderServer { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_text(&self, path: &str) -> Result<String, ServerError> {
        debug!(path, "GET");
        let response = self.client.get(self.url(path)).send().await.map_err(network)?;
        let response = check_status(response).await?;
        response.text().await.map_err(network)
    }

    async fn post_form(&self, path: &str, fields: &[(&str, String)]) -> Result<(), ServerError> {
        debug!(path, "POST");
        let response = self.client.post(self.url(path)).form(fields).send().await.map_err(network)?;
        check_status(response).await.map(drop)
    }
}

fn network(err: reqwest::Error) -> ServerError {
    ServerError::Network(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, ServerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = match body.trim() {
        "" => status.canonical_reason().unwrap_or("request failed").to_string(),
        text => text.chars().take(200).collect(),
    };
    Err(ServerError::Rejected { status: status.as_u16(), message })
}

#[async_trait]
impl ReaderServer for HttpReaderServer {
    async fn fetch_page(&self, book_id: u64, page_num: u32) -> Result<String, ServerError> {
        self.get_text(&format!("/read/{book_id}/page/{page_num}")).await
    }

    async fn open_current_page(&self, book_id: u64) -> Result<String, ServerError> {
        self.get_text(&format!("/read/{book_id}")).await
    }

    async fn get_term_popup(&self, term_id: u64) -> Result<String, ServerError> {
        self.get_text(&format!("/read/termpopup/{term_id}")).await
    }

    async fn get_term_edit_page(&self, term_id: u64) -> Result<String, ServerError> {
        self.get_text(&format!("/read/edit_term/{term_id}")).await
    }

    async fn save_term(&self, term_id: u64, form: &TermForm) -> Result<(), ServerError> {
        self.post_form(&format!("/read/edit_term/{term_id}"), &form.to_form_fields()).await
    }

    async fn mark_page_read(&self, book_id: u64, page_num: u32, rest_known: bool) -> Result<(), ServerError> {
        let fields = [
            ("bookid", book_id.to_string()),
            ("pagenum", page_num.to_string()),
            ("restknown", rest_known.to_string()),
        ];
        self.post_form("/read/page_done", &fields).await
    }

    async fn fetch_language_index(&self) -> Result<String, ServerError> {
        self.get_text("/language/index").await
    }

    async fn fetch_book_edit_page(&self, book_id: u64) -> Result<String, ServerError> {
        self.get_text(&format!("/book/edit/{book_id}")).await
    }

    async fn test_audio_availability(&self, book_id: u64) -> Result<bool, ServerError> {
        let path = format!("/useraudio/stream/{book_id}");
        debug!(path = %path, "GET (audio check)");
        let response = self.client.get(self.url(&path)).send().await.map_err(network)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await.map(|_| true)
    }
}
