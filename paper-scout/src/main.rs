//! Scientific Paper Scout
//!
//! Interactive terminal over the conversation orchestrator:
//! - arXiv search and PDF summarization tools
//! - OpenAI, Anthropic or Gemini generation backend
//! - Streamed answers with tool-call trace lines

use anyhow::{Context, Result};
use clap::Parser;
use scout_chat::{ConversationOrchestrator, KeywordPlanner, OrchestratorConfig};
use scout_core::config::{get_config_opt, load_env_file, load_environment};
use scout_core::ScoutConfig;
use scout_execution_tracker::CallLog;
use scout_tools::backends::{ArxivClient, PdfTextExtractor};
use scout_tools::{BuiltinBackends, ToolRegistry};
use std::sync::Arc;
use tracing::info;

mod repl;

#[derive(Parser, Debug)]
#[command(name = "paper-scout")]
#[command(about = "Discover and summarize recent research papers from the terminal")]
struct Args {
    /// Verbose logging on stderr
    #[arg(long)]
    debug: bool,

    /// Environment file to load instead of the default locations
    #[arg(long)]
    env_file: Option<String>,

    /// Generation provider (openai, anthropic, gemini); overrides LLM_PROVIDER
    #[arg(long)]
    provider: Option<String>,

    /// Model name; overrides LLM_MODEL
    #[arg(long)]
    model: Option<String>,
}

fn init_tracing(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("paper_scout={}", level).parse()?)
                .add_directive(format!("scout_chat={}", level).parse()?)
                .add_directive(format!("scout_tools={}", level).parse()?)
                .add_directive(format!("scout_llm={}", level).parse()?)
                .add_directive("scout_execution_tracker=warn".parse()?),
        )
        .init();
    Ok(())
}

/// Environment configuration with command-line overrides applied first
fn load_config(args: &Args) -> Result<ScoutConfig> {
    let config = ScoutConfig::from_lookup(|key| {
        let flag = match key {
            "LLM_PROVIDER" => args.provider.clone(),
            "LLM_MODEL" => args.model.clone(),
            _ => None,
        };
        flag.or_else(|| get_config_opt(key))
    })?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_path = match &args.env_file {
        Some(path) => Some(load_env_file(path).with_context(|| format!("Cannot read env file {}", path))?),
        None => load_environment(),
    };

    init_tracing(args.debug)?;
    if let Some(path) = env_path {
        info!("Loaded environment from {}", path);
    }

    let config = load_config(&args).context("Invalid configuration")?;
    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        dispatch = ?config.dispatch,
        "Starting Scientific Paper Scout"
    );

    // --- Backends ---
    let backend = scout_llm::create_backend(&config.llm)?;
    let summarizer = scout_llm::create_backend_for_model(&config.llm, &config.llm.summary_model)?;

    // --- Tools ---
    let mut registry = ToolRegistry::with_call_log(CallLog::with_capacity(config.call_log_capacity));
    scout_tools::register_builtin_tools(
        &mut registry,
        BuiltinBackends {
            search: Arc::new(ArxivClient::with_endpoint(config.arxiv_api_url.clone())),
            documents: Arc::new(PdfTextExtractor::new()),
            summarizer,
        },
        &config.ports,
    );
    let registry = Arc::new(registry);
    info!("Initialized tool registry with {} tools", registry.len());

    // --- Orchestrator ---
    let mut orchestrator = ConversationOrchestrator::new(
        Box::new(KeywordPlanner::default()),
        registry.clone(),
        backend,
        OrchestratorConfig {
            dispatch: config.dispatch,
            show_trace: true,
            max_output_tokens: Some(config.llm.max_output_tokens),
        },
    );

    let outcome = repl::run(&mut orchestrator).await;
    registry.shutdown();
    outcome
}
