//! End-to-end turn processing with in-memory backends

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use scout_chat::{ConversationOrchestrator, KeywordPlanner, OrchestratorConfig, TurnPhase};
use scout_core::{DispatchMode, Error, ProviderType, Result, Role, ToolPortsConfig, Turn};
use scout_llm::{ChunkReceiver, GenerationBackend, GenerationRequest, GenerationResponse, TokenUsage};
use scout_tools::backends::{DocumentTextBackend, Paper, SearchBackend};
use scout_tools::{register_builtin_tools, BuiltinBackends, ToolRegistry};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// =============================================================================
// TEST DOUBLES
// =============================================================================

/// Returns `count` papers after an optional delay
struct FakeSearch {
    count: usize,
    delay: Duration,
}

#[async_trait]
impl SearchBackend for FakeSearch {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<Paper>> {
        tokio::time::sleep(self.delay).await;
        Ok((1..=self.count.min(max_results))
            .map(|i| Paper {
                id: format!("http://arxiv.org/abs/2401.0000{}", i),
                title: format!("Quantum Paper {}", i),
                authors: vec!["Ada".into(), "Alan".into(), "Grace".into(), "Edsger".into()],
                summary: "q".repeat(500),
                published: Utc::now(),
                updated: None,
                categories: vec!["quant-ph".into()],
                source_url: format!("http://arxiv.org/pdf/2401.0000{}", i),
                links: vec![],
            })
            .collect())
    }
}

/// Document backend that never yields text
struct Unreadable;

#[async_trait]
impl DocumentTextBackend for Unreadable {
    async fn extract_text(&self, _url: &str) -> Option<String> {
        None
    }
}

enum Script {
    /// Send these items, then close the stream
    Items(Vec<Result<String>>),
    /// Send one chunk and keep the stream open
    Hang(String),
}

/// Streams scripted chunks, one script per call, and records every request
struct ScriptedBackend {
    scripts: Mutex<Vec<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
    open: Mutex<Vec<mpsc::Sender<Result<String>>>>,
}

impl ScriptedBackend {
    fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts),
            requests: Mutex::new(Vec::new()),
            open: Mutex::new(Vec::new()),
        })
    }

    fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(
            replies
                .iter()
                .map(|r| Script::Items(vec![Ok(r.to_string())]))
                .collect(),
        )
    }

    fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAI
    }

    fn model(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse> {
        Ok(GenerationResponse {
            content: "summary".to_string(),
            model: "scripted".to_string(),
            provider: "openai".to_string(),
            finish_reason: None,
            usage: Some(TokenUsage::new(1, 1)),
        })
    }

    async fn stream_generate(&self, request: GenerationRequest) -> Result<ChunkReceiver> {
        self.requests.lock().unwrap().push(request);
        let script = {
            let mut scripts = self.scripts.lock().unwrap();
            if scripts.is_empty() {
                return Err(Error::generation_failed("no script left"));
            }
            scripts.remove(0)
        };

        let (tx, rx) = mpsc::channel(16);
        match script {
            Script::Items(items) => {
                for item in items {
                    tx.send(item).await.ok();
                }
            }
            Script::Hang(chunk) => {
                tx.send(Ok(chunk)).await.ok();
                self.open.lock().unwrap().push(tx);
            }
        }
        Ok(rx)
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn orchestrator_with(
    backend: Arc<ScriptedBackend>,
    search_delay: Duration,
    dispatch: DispatchMode,
) -> ConversationOrchestrator {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(
        &mut registry,
        BuiltinBackends {
            search: Arc::new(FakeSearch {
                count: 5,
                delay: search_delay,
            }),
            documents: Arc::new(Unreadable),
            summarizer: backend.clone(),
        },
        &ToolPortsConfig::default(),
    );

    ConversationOrchestrator::new(
        Box::new(KeywordPlanner::default()),
        Arc::new(registry),
        backend,
        OrchestratorConfig {
            dispatch,
            ..Default::default()
        },
    )
}

fn orchestrator(backend: Arc<ScriptedBackend>) -> ConversationOrchestrator {
    orchestrator_with(backend, Duration::ZERO, DispatchMode::Sequential)
}

async fn run(orchestrator: &mut ConversationOrchestrator, text: &str) -> Vec<String> {
    orchestrator.process_turn(text).collect().await
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn test_no_match_sends_unmodified_history() {
    let backend = ScriptedBackend::replying(&["Hello!", "Fine, thanks."]);
    let mut orch = orchestrator(backend.clone());

    let chunks = run(&mut orch, "hello there").await;
    assert_eq!(chunks, vec!["\n📝 Generating response...\n\n", "Hello!"]);

    run(&mut orch, "how are you").await;

    let requests = backend.requests();
    assert_eq!(requests[1].messages, vec![
        Turn::user("hello there"),
        Turn::assistant("Hello!"),
        Turn::user("how are you"),
    ]);
    assert!(requests.iter().all(|r| r.messages.iter().all(|t| t.role != Role::System)));
    assert!(requests[0].system.as_deref().unwrap().contains("search_papers"));
    assert!(orch.get_call_log().await.is_empty());
}

#[tokio::test]
async fn test_search_turn_traces_and_appends_context() {
    let backend = ScriptedBackend::replying(&["Here are three papers."]);
    let mut orch = orchestrator(backend.clone());

    let chunks = run(&mut orch, "Find papers about quantum computing research").await;
    assert_eq!(
        chunks[0],
        "\n🔧 Calling paper_search.search_papers with {\"max_results\":5,\"query\":\"quantum computing\"}\n"
    );
    assert_eq!(chunks[1], "✅ Tool call completed successfully\n");
    assert_eq!(chunks[2], "\n📝 Analyzing results and generating response...\n\n");
    assert_eq!(chunks[3], "Here are three papers.");

    let requests = backend.requests();
    let context = requests[0].messages.last().unwrap();
    assert_eq!(context.role, Role::System);
    assert!(context.content.contains("Found 5 papers:"));
    assert_eq!(context.content.matches("   URL: ").count(), 3);
    for line in context.content.lines().filter(|l| l.starts_with("   Summary: ")) {
        assert!(line.trim_start_matches("   Summary: ").chars().count() <= 203);
    }

    // The auxiliary turn is prompt-only; history keeps just the exchange.
    assert_eq!(orch.history(), &[
        Turn::user("Find papers about quantum computing research"),
        Turn::assistant("Here are three papers."),
    ]);
}

#[tokio::test]
async fn test_log_grows_by_plan_length_even_on_failure() {
    let backend = ScriptedBackend::replying(&["ok"]);
    let mut orch = orchestrator(backend);

    let before = orch.get_call_log().await.len();
    run(
        &mut orch,
        "summarize https://example.org/a.pdf and http://example.org/b.pdf",
    )
    .await;
    let after = orch.get_call_log().await;

    assert_eq!(after.len() - before, 2);
    assert!(after.iter().all(|e| !e.success));
    assert_eq!(after[0].arguments["pdf_url"], "https://example.org/a.pdf");
    assert_eq!(after[1].arguments["pdf_url"], "http://example.org/b.pdf");
}

#[tokio::test]
async fn test_call_log_snapshot_is_idempotent() {
    let backend = ScriptedBackend::replying(&["ok"]);
    let mut orch = orchestrator(backend);
    run(&mut orch, "find quantum error correction papers").await;

    assert_eq!(orch.get_call_log().await, orch.get_call_log().await);
}

#[tokio::test]
async fn test_document_failure_still_completes_turn() {
    let backend = ScriptedBackend::replying(&["I could not read that PDF."]);
    let mut orch = orchestrator(backend.clone());

    let chunks = run(&mut orch, "summarize https://example.org/paper.pdf").await;
    assert!(chunks[1].starts_with("❌ Tool call failed: Extraction failed"));
    assert_eq!(chunks.last().unwrap(), "I could not read that PDF.");

    let context = backend.requests()[0].messages.last().unwrap().content.clone();
    assert!(context.contains("Error with summarize_pdf: Extraction failed"));
    assert_eq!(orch.history().len(), 2);
}

#[tokio::test]
async fn test_mid_stream_error_discards_turn() {
    let backend = ScriptedBackend::new(vec![
        Script::Items(vec![
            Ok("Partial ".to_string()),
            Err(Error::generation_failed("connection reset")),
            Ok("never seen".to_string()),
        ]),
        Script::Items(vec![Ok("Second answer".to_string())]),
    ]);
    let mut orch = orchestrator(backend.clone());

    let chunks = run(&mut orch, "hello").await;
    assert_eq!(chunks[1], "Partial ");
    assert_eq!(chunks[2], "Error: Generation failed: connection reset");
    assert_eq!(chunks.len(), 3);
    assert!(orch.history().is_empty());
    assert_eq!(orch.phase(), TurnPhase::Idle);

    run(&mut orch, "second try").await;
    assert_eq!(backend.requests()[1].messages, vec![Turn::user("second try")]);
    assert_eq!(orch.history().len(), 2);
}

#[tokio::test]
async fn test_backend_refusal_is_single_error_chunk() {
    let backend = ScriptedBackend::new(vec![]);
    let mut orch = orchestrator(backend);

    let chunks = run(&mut orch, "hello").await;
    assert_eq!(chunks.last().unwrap(), "Error: Generation failed: no script left");
    assert!(orch.history().is_empty());
}

#[tokio::test]
async fn test_dropping_stream_cancels_turn() {
    let backend = ScriptedBackend::new(vec![Script::Hang("Thinking".to_string())]);
    let mut orch = orchestrator(backend);
    let phases = orch.subscribe_phase();

    {
        let stream = orch.process_turn("hello");
        futures::pin_mut!(stream);
        assert_eq!(stream.next().await.as_deref(), Some("\n📝 Generating response...\n\n"));
        assert_eq!(stream.next().await.as_deref(), Some("Thinking"));
        assert_eq!(*phases.borrow(), TurnPhase::Generating);
    }

    assert!(orch.history().is_empty());
    assert_eq!(orch.phase(), TurnPhase::Idle);
}

#[tokio::test]
async fn test_cancel_during_dispatch_still_logs_call() {
    let backend = ScriptedBackend::replying(&["unused"]);
    let mut orch = orchestrator_with(backend, Duration::from_millis(500), DispatchMode::Sequential);

    {
        let stream = orch.process_turn("find quantum papers");
        futures::pin_mut!(stream);
        let first = stream.next().await.unwrap();
        assert!(first.contains("🔧 Calling paper_search.search_papers"));

        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
    }

    let log = orch.get_call_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].tool, "search_papers");
    assert!(!log[0].success);
    assert_eq!(log[0].error.as_deref(), Some("cancelled"));
    assert!(orch.history().is_empty());
    assert_eq!(orch.phase(), TurnPhase::Idle);
}

#[tokio::test]
async fn test_cancel_during_concurrent_dispatch_logs_every_call() {
    let backend = ScriptedBackend::replying(&["unused"]);
    let mut orch = orchestrator_with(backend, Duration::from_millis(500), DispatchMode::Concurrent);

    {
        let stream = orch.process_turn(
            "find quantum papers and summarize https://arxiv.org/pdf/2401.00001.pdf",
        );
        futures::pin_mut!(stream);
        stream.next().await;
        stream.next().await;
        let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(pending.is_err());
    }

    let tools: Vec<String> = orch.get_call_log().await.into_iter().map(|e| e.tool).collect();
    assert_eq!(tools, vec!["search_papers", "summarize_pdf"]);
}

#[tokio::test]
async fn test_concurrent_dispatch_logs_in_plan_order() {
    let backend = ScriptedBackend::replying(&["done"]);
    let mut orch = orchestrator_with(
        backend,
        Duration::from_millis(50),
        DispatchMode::Concurrent,
    );

    let chunks = run(
        &mut orch,
        "find quantum papers and summarize https://arxiv.org/pdf/2401.00001.pdf",
    )
    .await;
    assert!(chunks[0].contains("paper_search.search_papers"));
    assert!(chunks[1].contains("pdf_summarize.summarize_pdf"));

    let tools: Vec<String> = orch.get_call_log().await.into_iter().map(|e| e.tool).collect();
    assert_eq!(tools, vec!["search_papers", "summarize_pdf"]);
}

#[tokio::test]
async fn test_trace_can_be_disabled() {
    let backend = ScriptedBackend::replying(&["answer"]);
    let mut registry = ToolRegistry::new();
    register_builtin_tools(
        &mut registry,
        BuiltinBackends {
            search: Arc::new(FakeSearch {
                count: 1,
                delay: Duration::ZERO,
            }),
            documents: Arc::new(Unreadable),
            summarizer: backend.clone(),
        },
        &ToolPortsConfig::default(),
    );
    let mut orch = ConversationOrchestrator::new(
        Box::new(KeywordPlanner::default()),
        Arc::new(registry),
        backend,
        OrchestratorConfig {
            show_trace: false,
            max_output_tokens: Some(1000),
            ..Default::default()
        },
    );

    let chunks = run(&mut orch, "find quantum papers").await;
    assert_eq!(chunks, vec!["answer"]);
    assert_eq!(orch.get_call_log().await.len(), 1);
}
