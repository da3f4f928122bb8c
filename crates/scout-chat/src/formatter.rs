//! Renders tool results as context text for the generation backend

use scout_core::text::truncate_chars;
use scout_core::{ToolInvocationResult, Turn};
use scout_tools::builtin::{search, summarize};
use serde_json::Value;

/// Search hits rendered per result
pub const MAX_RENDERED_PAPERS: usize = 3;
/// Authors listed per paper
pub const MAX_RENDERED_AUTHORS: usize = 3;
/// Characters of each paper summary kept before the ellipsis
pub const SUMMARY_PREVIEW_CHARS: usize = 200;

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn format_search(payload: &Value, out: &mut String) {
    let papers: &[Value] = payload
        .get("results")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    out.push_str(&format!("\nFound {} papers:\n", papers.len()));
    for (i, paper) in papers.iter().take(MAX_RENDERED_PAPERS).enumerate() {
        let authors: Vec<&str> = paper
            .get("authors")
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).take(MAX_RENDERED_AUTHORS).collect())
            .unwrap_or_default();

        out.push_str(&format!("{}. {}\n", i + 1, str_field(paper, "title")));
        out.push_str(&format!("   Authors: {}\n", authors.join(", ")));
        out.push_str(&format!("   URL: {}\n", str_field(paper, "source_url")));
        out.push_str(&format!(
            "   Summary: {}...\n\n",
            truncate_chars(str_field(paper, "summary"), SUMMARY_PREVIEW_CHARS)
        ));
    }
}

/// Render results in input order as one text block
pub fn format_results(results: &[ToolInvocationResult]) -> String {
    let mut out = String::new();

    for result in results {
        if !result.success {
            out.push_str(&format!(
                "\nError with {}: {}\n",
                result.tool,
                result.error.as_deref().unwrap_or("Unknown error")
            ));
            continue;
        }

        let payload = result.payload.as_ref().unwrap_or(&Value::Null);
        match result.tool.as_str() {
            search::NAME => format_search(payload, &mut out),
            summarize::NAME => {
                out.push_str(&format!("\nPDF Summary:\n{}\n\n", str_field(payload, "summary")));
            }
            other => {
                let pretty = serde_json::to_string_pretty(payload).unwrap_or_default();
                out.push_str(&format!("\nResult from {}:\n{}\n\n", other, pretty));
            }
        }
    }

    out
}

/// Auxiliary system turn carrying formatted results
pub fn results_turn(results: &[ToolInvocationResult]) -> Turn {
    Turn::system(format!(
        "Here are the results from the tools you called:\n\n{}\n\nNow provide a helpful response based on these results.",
        format_results(results)
    ))
}
