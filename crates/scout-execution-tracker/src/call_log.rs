use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::entry::CallLogEntry;

/// Cumulative statistics. Not affected by capacity eviction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLogStats {
    pub total_calls: u64,
    pub successful_calls: u64,
    pub failed_calls: u64,
    pub total_latency_seconds: f64,
    pub calls_by_tool: HashMap<String, u64>,
    pub failures_by_tool: HashMap<String, u64>,
}

impl CallLogStats {
    fn record(&mut self, entry: &CallLogEntry) {
        self.total_calls += 1;
        self.total_latency_seconds += entry.latency_seconds;
        *self.calls_by_tool.entry(entry.tool.clone()).or_insert(0) += 1;
        if entry.success {
            self.successful_calls += 1;
        } else {
            self.failed_calls += 1;
            *self.failures_by_tool.entry(entry.tool.clone()).or_insert(0) += 1;
        }
    }

    /// Average latency across all recorded calls
    pub fn average_latency_seconds(&self) -> f64 {
        if self.total_calls == 0 {
            0.0
        } else {
            self.total_latency_seconds / self.total_calls as f64
        }
    }
}

/// Append-only call log.
///
/// Cloning yields another handle onto the same log.
#[derive(Clone)]
pub struct CallLog {
    entries: Arc<RwLock<VecDeque<CallLogEntry>>>,
    stats: Arc<RwLock<CallLogStats>>,
    /// Maximum entries kept; oldest are dropped first. `None` = unbounded.
    capacity: Option<usize>,
}

impl CallLog {
    /// Create an unbounded log
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// Create a log that keeps at most `capacity` entries (ring buffer)
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::new())),
            stats: Arc::new(RwLock::new(CallLogStats::default())),
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Append one entry
    pub async fn append(&self, entry: CallLogEntry) {
        self.append_all(std::iter::once(entry)).await;
    }

    /// Append several entries under one lock, preserving iteration order
    pub async fn append_all<I>(&self, batch: I)
    where
        I: IntoIterator<Item = CallLogEntry>,
    {
        let mut entries = self.entries.write().await;
        let mut stats = self.stats.write().await;
        self.push_batch(&mut entries, &mut stats, batch);
    }

    /// Append from a synchronous context such as `Drop`.
    ///
    /// Writes in place when the log is uncontended, otherwise hands the entry
    /// to a task on the current runtime.
    pub fn append_detached(&self, entry: CallLogEntry) {
        if let (Ok(mut entries), Ok(mut stats)) = (self.entries.try_write(), self.stats.try_write()) {
            self.push_batch(&mut entries, &mut stats, std::iter::once(entry));
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let log = self.clone();
                handle.spawn(async move { log.append(entry).await });
            }
            Err(_) => warn!(
                source = %entry.source,
                tool = %entry.tool,
                "No runtime to record call log entry; entry lost"
            ),
        }
    }

    fn push_batch<I>(&self, entries: &mut VecDeque<CallLogEntry>, stats: &mut CallLogStats, batch: I)
    where
        I: IntoIterator<Item = CallLogEntry>,
    {
        for entry in batch {
            debug!(
                source = %entry.source,
                tool = %entry.tool,
                success = entry.success,
                latency_seconds = entry.latency_seconds,
                "Call logged"
            );
            stats.record(&entry);
            entries.push_back(entry);
        }

        if let Some(capacity) = self.capacity {
            let overflow = entries.len().saturating_sub(capacity);
            if overflow > 0 {
                entries.drain(..overflow);
                info!(evicted = overflow, capacity, "Call log trimmed to capacity");
            }
        }
    }

    /// Copy of every retained entry, oldest first
    pub async fn snapshot(&self) -> Vec<CallLogEntry> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Copy of the newest `limit` entries, oldest first
    pub async fn recent(&self, limit: usize) -> Vec<CallLogEntry> {
        let entries = self.entries.read().await;
        let start = entries.len().saturating_sub(limit);
        entries.iter().skip(start).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CallLogStats {
        self.stats.read().await.clone()
    }
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;
    use std::time::Duration;

    fn entry(tool: &str, error: Option<&str>) -> CallLogEntry {
        CallLogEntry::new(
            Utc::now(),
            "source",
            tool,
            Map::new(),
            Duration::from_millis(10),
            error.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let log = CallLog::new();
        log.append(entry("a", None)).await;

        let before = log.snapshot().await;
        log.append(entry("b", None)).await;

        assert_eq!(before.len(), 1);
        assert_eq!(log.len().await, 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_idempotent() {
        let log = CallLog::new();
        log.append(entry("a", None)).await;
        log.append(entry("b", Some("boom"))).await;

        assert_eq!(log.snapshot().await, log.snapshot().await);
    }

    #[tokio::test]
    async fn test_append_all_preserves_order() {
        let log = CallLog::new();
        log.append_all(vec![entry("first", None), entry("second", None), entry("third", None)])
            .await;

        let tools: Vec<String> = log.snapshot().await.into_iter().map(|e| e.tool).collect();
        assert_eq!(tools, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let log = CallLog::with_capacity(Some(2));
        for tool in ["a", "b", "c"] {
            log.append(entry(tool, None)).await;
        }

        let tools: Vec<String> = log.snapshot().await.into_iter().map(|e| e.tool).collect();
        assert_eq!(tools, vec!["b", "c"]);
        assert_eq!(log.stats().await.total_calls, 3);
    }

    #[tokio::test]
    async fn test_append_detached_uncontended_is_immediate() {
        let log = CallLog::new();
        log.append_detached(entry("a", Some("cancelled")));

        assert_eq!(log.len().await, 1);
        assert_eq!(log.stats().await.failed_calls, 1);
    }

    #[tokio::test]
    async fn test_append_detached_waits_for_held_lock() {
        let log = CallLog::new();
        let reader = log.entries.read().await;
        log.append_detached(entry("late", None));
        drop(reader);

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_recent_returns_tail() {
        let log = CallLog::new();
        for tool in ["a", "b", "c"] {
            log.append(entry(tool, None)).await;
        }

        let tools: Vec<String> = log.recent(2).await.into_iter().map(|e| e.tool).collect();
        assert_eq!(tools, vec!["b", "c"]);
        assert_eq!(log.recent(10).await.len(), 3);
    }

    #[tokio::test]
    async fn test_stats() {
        let log = CallLog::new();
        log.append(entry("search_papers", None)).await;
        log.append(entry("summarize_pdf", Some("no text"))).await;

        let stats = log.stats().await;
        assert_eq!(stats.total_calls, 2);
        assert_eq!(stats.successful_calls, 1);
        assert_eq!(stats.failed_calls, 1);
        assert_eq!(stats.failures_by_tool.get("summarize_pdf"), Some(&1));
        assert!((stats.average_latency_seconds() - 0.01).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_clones_share_entries() {
        let log = CallLog::new();
        let observer = log.clone();
        log.append(entry("a", None)).await;
        assert_eq!(observer.len().await, 1);
    }
}
