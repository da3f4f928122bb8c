//! `pdf_summarize.summarize_pdf`

use async_trait::async_trait;
use scout_core::text::truncate_chars;
use scout_core::{Error, Result, Turn};
use scout_llm::{BoxedBackend, GenerationRequest};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::args::{required_str, BoundsPolicy, IntegerBounds};
use crate::backends::BoxedDocumentBackend;
use crate::Tool;

pub const SOURCE: &str = "pdf_summarize";
pub const NAME: &str = "summarize_pdf";

/// Extracted text beyond this many characters is cut before prompting
pub const MAX_INPUT_CHARS: usize = 10_000;

pub const MAX_LENGTH: IntegerBounds = IntegerBounds {
    key: "max_length",
    description: "Maximum length of summary in words",
    default: 200,
    min: 50,
    max: 1000,
    policy: BoundsPolicy::Reject,
};

pub struct SummarizePdfTool {
    documents: BoxedDocumentBackend,
    generator: BoxedBackend,
}

impl SummarizePdfTool {
    pub fn new(documents: BoxedDocumentBackend, generator: BoxedBackend) -> Self {
        Self {
            documents,
            generator,
        }
    }
}

fn summary_request(text: &str, max_length: i64) -> GenerationRequest {
    let excerpt = if text.chars().count() > MAX_INPUT_CHARS {
        format!("{}...", truncate_chars(text, MAX_INPUT_CHARS))
    } else {
        text.to_string()
    };

    GenerationRequest::new(vec![Turn::user(format!(
        "Please summarize this paper:\n\n{}",
        excerpt
    ))])
    .with_system(format!(
        "You are a research assistant. Summarize the following academic paper in approximately {} words. \
         Focus on the main contributions, methodology, and key findings.",
        max_length
    ))
    .with_max_output_tokens((max_length * 2) as u32)
}

#[async_trait]
impl Tool for SummarizePdfTool {
    fn source(&self) -> &str {
        SOURCE
    }

    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Download and summarize a PDF document"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pdf_url": {
                    "type": "string",
                    "description": "URL of the PDF to summarize"
                },
                "max_length": MAX_LENGTH.schema_property()
            },
            "required": ["pdf_url"]
        })
    }

    async fn execute(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let pdf_url = required_str(arguments, "pdf_url")?;
        if !(pdf_url.starts_with("http://") || pdf_url.starts_with("https://")) {
            return Err(Error::invalid_arguments(format!(
                "pdf_url must be an http(s) URL, got {}",
                pdf_url
            )));
        }
        let max_length = MAX_LENGTH.resolve(arguments)?;

        info!("Summarizing PDF: {}", pdf_url);
        let text = self
            .documents
            .extract_text(pdf_url)
            .await
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::extraction_failed(format!("Failed to extract text from PDF {}", pdf_url)))?;
        debug!(chars = text.chars().count(), "Extracted document text");

        let response = self
            .generator
            .generate(summary_request(&text, max_length))
            .await?;

        Ok(json!({
            "success": true,
            "summary": response.content,
            "model_used": response.model,
            "usage": response.usage,
        }))
    }
}
