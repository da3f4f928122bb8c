//! System prompt listing the registered tools

use scout_tools::{ToolDefinition, ToolRegistry};
use serde_json::Value;

const INTRO: &str = "You are a Scientific Paper Scout, an AI assistant specialized in discovering \
and summarizing recent research papers. You have access to the following tools:";

const GUIDANCE: &str = "When a user asks about research papers:
1. Use search_papers to find relevant papers
2. Present the results in a clear, organized way
3. If the user wants more details, use summarize_pdf to provide summaries
4. Always cite your sources and provide paper URLs

Be helpful, accurate, and focused on scientific research. Explain complex concepts clearly.";

fn type_name(schema: &Value) -> &str {
    match schema.get("type").and_then(Value::as_str) {
        Some("string") => "str",
        Some("integer") => "int",
        Some("number") => "float",
        Some("boolean") => "bool",
        Some("array") => "list",
        Some("object") => "dict",
        Some(other) => other,
        None => "any",
    }
}

/// `name(arg: type, opt: type = default)`; required arguments first
pub fn signature(definition: &ToolDefinition) -> String {
    let empty = serde_json::Map::new();
    let properties = definition
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let required: Vec<&str> = definition
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut params: Vec<String> = required
        .iter()
        .filter_map(|name| properties.get(*name).map(|schema| (*name, schema)))
        .map(|(name, schema)| format!("{}: {}", name, type_name(schema)))
        .collect();

    params.extend(
        properties
            .iter()
            .filter(|(name, _)| !required.contains(&name.as_str()))
            .map(|(name, schema)| match schema.get("default") {
                Some(default) => format!("{}: {} = {}", name, type_name(schema), default),
                None => format!("{}: {}", name, type_name(schema)),
            }),
    );

    format!("{}({})", definition.name, params.join(", "))
}

/// Build the system instruction for the registered tool set
pub fn build_system_prompt(registry: &ToolRegistry) -> String {
    let mut prompt = String::from(INTRO);
    prompt.push_str("\n\n");

    for (i, definition) in registry.list().iter().enumerate() {
        prompt.push_str(&format!(
            "{}. {} - {}\n",
            i + 1,
            signature(definition),
            definition.description
        ));
    }

    prompt.push('\n');
    prompt.push_str(GUIDANCE);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use scout_tools::SimpleTool;
    use serde_json::json;
    use std::sync::Arc;

    fn definition() -> ToolDefinition {
        ToolDefinition {
            source: "paper_search".to_string(),
            name: "search_papers".to_string(),
            description: "Search for academic papers on ArXiv".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer", "default": 10}
                },
                "required": ["query"]
            }),
        }
    }

    #[test]
    fn test_signature_required_first() {
        assert_eq!(
            signature(&definition()),
            "search_papers(query: str, max_results: int = 10)"
        );
    }

    #[test]
    fn test_prompt_lists_registered_tools() {
        let mut registry = ToolRegistry::new();
        let def = definition();
        registry.register(Arc::new(SimpleTool::new(
            &def.source,
            &def.name,
            &def.description,
            def.input_schema.clone(),
            |_| Ok(Value::Null),
        )));

        let prompt = build_system_prompt(&registry);
        assert!(prompt.starts_with("You are a Scientific Paper Scout"));
        assert!(prompt.contains(
            "1. search_papers(query: str, max_results: int = 10) - Search for academic papers on ArXiv\n"
        ));
        assert!(prompt.ends_with("Explain complex concepts clearly."));
    }
}
