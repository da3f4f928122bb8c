//! External collaborators consumed by the built-in tools
//!
//! - [`SearchBackend`]: literature search (arXiv in production)
//! - [`DocumentTextBackend`]: PDF download and text extraction

pub mod arxiv;
pub mod pdf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scout_core::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use arxiv::ArxivClient;
pub use pdf::PdfTextExtractor;

/// A link attached to a paper record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub source_url: String,
    #[serde(default)]
    pub links: Vec<PaperLink>,
}

/// Literature search
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Up to `max_results` papers, in backend order
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>>;
}

/// Document download and text extraction
#[async_trait]
pub trait DocumentTextBackend: Send + Sync {
    /// Extracted text, or `None` on any failure
    async fn extract_text(&self, url: &str) -> Option<String>;
}

pub type BoxedSearchBackend = Arc<dyn SearchBackend>;
pub type BoxedDocumentBackend = Arc<dyn DocumentTextBackend>;
