//! Interactive prompt loop

use anyhow::Result;
use chrono::Local;
use futures::StreamExt;
use scout_chat::ConversationOrchestrator;
use scout_execution_tracker::{CallLogEntry, CallLogStats};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Rows shown by the `log` command
const LOG_ROWS: usize = 10;

/// Erase the display and home the cursor
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

pub const BANNER: &str = "\
╔══════════════════════════════════════════════════════════════╗
║                  🔬 Scientific Paper Scout                   ║
║        Discover and summarize recent research papers         ║
╚══════════════════════════════════════════════════════════════╝
Type 'help' for commands, 'quit' to exit.";

pub const HELP: &str = "\
Commands:
  help              Show this message
  log               Show the last tool calls
  clear             Clear the screen
  quit, exit, bye   Leave

Anything else is sent to the assistant, for example:
  Find recent papers about quantum error correction
  Summarize https://arxiv.org/pdf/2301.00001.pdf

Press Ctrl-C while an answer is streaming to cancel it.";

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Help,
    Log,
    Clear,
    Quit,
    Message(&'a str),
}

pub fn parse_command(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => Command::Empty,
        "help" | "?" => Command::Help,
        "log" => Command::Log,
        "clear" => Command::Clear,
        "quit" | "exit" | "bye" => Command::Quit,
        _ => Command::Message(trimmed),
    }
}

/// Table of call-log entries followed by a totals line
pub fn format_log(entries: &[CallLogEntry], stats: &CallLogStats) -> String {
    if entries.is_empty() {
        return "No tool calls yet.".to_string();
    }

    let mut out = format!(
        "{:<10} {:<15} {:<15} {:>9}  {}\n",
        "Time", "Source", "Tool", "Latency", "Status"
    );
    for entry in entries {
        let status = match &entry.error {
            None => "✅ ok".to_string(),
            Some(error) => format!("❌ {}", error),
        };
        out.push_str(&format!(
            "{:<10} {:<15} {:<15} {:>8.2}s  {}\n",
            entry.timestamp.with_timezone(&Local).format("%H:%M:%S"),
            entry.source,
            entry.tool,
            entry.latency_seconds,
            status
        ));
    }
    out.push_str(&format!(
        "\n{} calls, {} failed, {:.2}s average",
        stats.total_calls,
        stats.failed_calls,
        stats.average_latency_seconds()
    ));
    out
}

fn flush() -> Result<()> {
    std::io::stdout().flush()?;
    Ok(())
}

/// Stream one turn to stdout; Ctrl-C drops the stream and cancels the turn
async fn run_turn(orchestrator: &mut ConversationOrchestrator, text: &str) -> Result<()> {
    print!("\n🤖 Scout: ");
    flush()?;

    let turn = orchestrator.process_turn(text);
    futures::pin_mut!(turn);

    loop {
        tokio::select! {
            chunk = turn.next() => match chunk {
                Some(chunk) => {
                    print!("{}", chunk);
                    flush()?;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Turn cancelled from the terminal");
                println!("\n[cancelled]");
                break;
            }
        }
    }

    println!();
    Ok(())
}

/// Read lines until quit, end of input or Ctrl-C at the prompt
pub async fn run(orchestrator: &mut ConversationOrchestrator) -> Result<()> {
    println!("{}", BANNER);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n👤 You: ");
        flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match parse_command(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Clear => {
                print!("{}", CLEAR_SCREEN);
                flush()?;
            }
            Command::Log => {
                let call_log = orchestrator.registry().call_log();
                let entries = call_log.recent(LOG_ROWS).await;
                let stats = call_log.stats().await;
                println!("{}", format_log(&entries, &stats));
            }
            Command::Message(text) => run_turn(orchestrator, text).await?,
        }
    }

    info!(turns = orchestrator.history().len(), "Session ended");
    println!("\nGoodbye! 👋");
    Ok(())
}
