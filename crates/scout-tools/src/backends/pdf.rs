//! PDF download and text extraction

use async_trait::async_trait;
use reqwest::{header, Client};
use scout_core::http::build_client;
use std::time::Duration;
use tracing::{error, info};

use super::DocumentTextBackend;

pub const USER_AGENT: &str = "Mozilla/5.0 (Scientific Paper Scout Bot)";
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads a PDF over HTTP and extracts its text on a blocking thread
pub struct PdfTextExtractor {
    client: Client,
}

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self {
            client: build_client(
                Client::builder().timeout(DOWNLOAD_TIMEOUT).user_agent(USER_AGENT),
                "pdf download",
            ),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self
            .client
            .get(url)
            .timeout(DOWNLOAD_TIMEOUT)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| format!("download failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("download failed with status {}", response.status()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| format!("download interrupted: {}", e))
    }
}

impl Default for PdfTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract text from PDF bytes; blank output counts as failure
pub fn extract_from_bytes(bytes: &[u8]) -> Result<String, String> {
    // pdf-extract panics on some malformed documents.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| "malformed PDF".to_string())?
        .map_err(|e| e.to_string())?;
    let text = text.trim();
    if text.is_empty() {
        Err("document contains no extractable text".to_string())
    } else {
        Ok(text.to_string())
    }
}

#[async_trait]
impl DocumentTextBackend for PdfTextExtractor {
    async fn extract_text(&self, url: &str) -> Option<String> {
        info!("Downloading PDF from: {}", url);

        let result = match self.download(url).await {
            Ok(bytes) => tokio::task::spawn_blocking(move || extract_from_bytes(&bytes))
                .await
                .unwrap_or_else(|e| Err(format!("extraction task failed: {}", e))),
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => {
                info!("Extracted {} characters from PDF", text.chars().count());
                Some(text)
            }
            Err(e) => {
                error!("Error processing PDF {}: {}", url, e);
                None
            }
        }
    }
}
