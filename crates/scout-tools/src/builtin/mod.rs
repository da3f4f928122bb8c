//! Built-in Tools
//!
//! | source | tool | argument policy |
//! |--------|------|-----------------|
//! | `paper_search` | `search_papers` | `max_results` clamped to 1..=50 |
//! | `pdf_summarize` | `summarize_pdf` | `max_length` outside 50..=1000 rejected |

pub mod search;
pub mod summarize;

pub use search::SearchPapersTool;
pub use summarize::SummarizePdfTool;

use scout_core::ToolPortsConfig;
use scout_llm::BoxedBackend;
use std::sync::Arc;
use tracing::info;

use crate::backends::{BoxedDocumentBackend, BoxedSearchBackend};
use crate::ToolRegistry;

/// Backends the built-in tools are wired to
pub struct BuiltinBackends {
    pub search: BoxedSearchBackend,
    pub documents: BoxedDocumentBackend,
    /// Generator used for PDF summaries
    pub summarizer: BoxedBackend,
}

/// Register both tool sources and their tools
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    backends: BuiltinBackends,
    ports: &ToolPortsConfig,
) {
    info!("Registering built-in research tools");

    registry.register_source(search::SOURCE, ports.paper_search);
    registry.register(Arc::new(SearchPapersTool::new(backends.search)));

    registry.register_source(summarize::SOURCE, ports.pdf_summarize);
    registry.register(Arc::new(SummarizePdfTool::new(
        backends.documents,
        backends.summarizer,
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::{DocumentTextBackend, Paper, SearchBackend};
    use async_trait::async_trait;
    use scout_core::{Error, ProviderType, Result};
    use scout_llm::{ChunkReceiver, GenerationBackend, GenerationRequest, GenerationResponse};
    use serde_json::{json, Map};

    struct NoPapers;

    #[async_trait]
    impl SearchBackend for NoPapers {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<Paper>> {
            Ok(Vec::new())
        }
    }

    struct NoText;

    #[async_trait]
    impl DocumentTextBackend for NoText {
        async fn extract_text(&self, _url: &str) -> Option<String> {
            None
        }
    }

    struct Offline;

    #[async_trait]
    impl GenerationBackend for Offline {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Gemini
        }

        fn model(&self) -> &str {
            "offline"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse> {
            Err(Error::backend_unavailable("offline"))
        }

        async fn stream_generate(&self, _request: GenerationRequest) -> Result<ChunkReceiver> {
            Err(Error::backend_unavailable("offline"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(
            &mut registry,
            BuiltinBackends {
                search: Arc::new(NoPapers),
                documents: Arc::new(NoText),
                summarizer: Arc::new(Offline),
            },
            &ToolPortsConfig::default(),
        );
        registry
    }

    #[test]
    fn test_both_sources_registered() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("paper_search", "search_papers"));
        assert!(registry.contains("pdf_summarize", "summarize_pdf"));

        let ports: Vec<u16> = registry.sources().iter().map(|s| s.port).collect();
        assert_eq!(ports, vec![8001, 8002]);
    }

    #[test]
    fn test_extraction_failure_becomes_failed_result() {
        let registry = registry();
        let mut args = Map::new();
        args.insert("pdf_url".to_string(), json!("https://arxiv.org/pdf/2401.00001.pdf"));

        let result = tokio_test::block_on(registry.invoke("pdf_summarize", "summarize_pdf", args));
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("Extraction failed"));
        assert_eq!(tokio_test::block_on(registry.call_log().len()), 1);
    }

    #[test]
    fn test_schemas_declare_bounds() {
        let definitions = registry().list();
        let search = definitions.iter().find(|d| d.name == "search_papers").unwrap();
        assert_eq!(search.input_schema["properties"]["max_results"]["maximum"], 50);
        assert_eq!(search.input_schema["required"], json!(["query"]));
    }
}
