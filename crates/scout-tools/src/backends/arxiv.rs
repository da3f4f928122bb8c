//! arXiv search over the public Atom API
//!
//! `GET {api}?search_query=..&start=0&max_results=N&sortBy=submittedDate&sortOrder=descending`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scout_core::http::build_client;
use scout_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{Paper, PaperLink, SearchBackend};

pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    published: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    #[serde(rename = "category", default)]
    categories: Vec<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

impl AtomEntry {
    fn into_paper(self) -> Option<Paper> {
        let published = match self.published.as_deref().and_then(parse_timestamp) {
            Some(ts) => ts,
            None => {
                warn!(id = %self.id, "Skipping entry without a valid published date");
                return None;
            }
        };

        let source_url = self
            .links
            .iter()
            .find(|l| l.title.as_deref() == Some("pdf"))
            .map(|l| l.href.clone())
            .unwrap_or_else(|| self.id.replacen("/abs/", "/pdf/", 1));

        Some(Paper {
            title: collapse_whitespace(&self.title),
            authors: self.authors.into_iter().map(|a| a.name.trim().to_string()).collect(),
            summary: self.summary.trim().to_string(),
            published,
            updated: self.updated.as_deref().and_then(parse_timestamp),
            categories: self.categories.into_iter().map(|c| c.term).collect(),
            source_url,
            links: self
                .links
                .into_iter()
                .map(|l| PaperLink {
                    href: l.href,
                    title: l.title,
                })
                .collect(),
            id: self.id,
        })
    }
}

/// Decode an arXiv Atom feed into papers, in feed order
pub fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)
        .map_err(|e| Error::backend_unavailable(format!("Malformed arXiv feed: {}", e)))?;

    // The API reports query errors as a single entry under /api/errors.
    if let Some(error) = feed.entries.iter().find(|e| e.id.contains("/api/errors")) {
        return Err(Error::backend_unavailable(format!(
            "arXiv rejected the query: {}",
            collapse_whitespace(&error.summary)
        )));
    }

    Ok(feed
        .entries
        .into_iter()
        .filter_map(AtomEntry::into_paper)
        .collect())
}

/// arXiv API client
pub struct ArxivClient {
    client: Client,
    api_url: String,
}

impl ArxivClient {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_API_URL)
    }

    pub fn with_endpoint(api_url: impl Into<String>) -> Self {
        Self {
            client: build_client(Client::builder().timeout(REQUEST_TIMEOUT), "arXiv search"),
            api_url: api_url.into(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchBackend for ArxivClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<Paper>> {
        debug!("arXiv request to: {} query={:?}", self.api_url, query);

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.api_url)
            .timeout(REQUEST_TIMEOUT)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| Error::backend_unavailable(format!("arXiv request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::backend_unavailable(format!(
                "arXiv API error {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let papers = parse_feed(&body)?;
        info!("Found {} papers for query: {}", papers.len(), query);
        Ok(papers)
    }
}
