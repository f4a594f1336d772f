//! Test doubles: in-memory index, counting metrics, captured log output

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Dispatch;
use tracing_subscriber::fmt::format::FmtSpan;

use super::error::{IndexError, Result};
use super::types::{Attribute, SqlType};
use super::{Indexer, Metrics};

/// In-memory index matching on case-insensitive substrings
pub struct MemoryIndex<K: SqlType, V: SqlType> {
    entries: Mutex<Vec<Attribute<K, V>>>,
    failing: AtomicBool,
    pub calls: AtomicUsize,
    pub shutdowns: AtomicUsize,
}

impl<K: SqlType, V: SqlType> MemoryIndex<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
        }
    }

    /// Every following call fails with an injected error
    pub fn failing() -> Self {
        let index = Self::new();
        index.failing.store(true, Ordering::SeqCst);
        index
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(injected());
        }

        Ok(())
    }
}

pub fn injected() -> IndexError {
    IndexError::Io(io::Error::new(io::ErrorKind::Other, "injected failure"))
}

#[async_trait]
impl<K: SqlType, V: SqlType> Indexer<K, V> for MemoryIndex<K, V> {
    async fn search(&self, term: &V) -> Result<Vec<Attribute<K, V>>> {
        self.enter()?;

        let needle = term.render().to_lowercase();
        tracing::debug!(term = %needle, "scanning memory index");

        let res: Vec<_> = self
            .entries
            .lock()
            .iter()
            .filter(|a| a.value.render().to_lowercase().contains(&needle))
            .cloned()
            .collect();

        if res.is_empty() {
            return Err(IndexError::not_found(term.render()));
        }

        Ok(res)
    }

    async fn insert(&self, attrs: &[Attribute<K, V>]) -> Result<()> {
        self.enter()?;
        self.entries.lock().extend_from_slice(attrs);
        Ok(())
    }

    async fn delete(&self, keys: &[K]) -> Result<()> {
        self.enter()?;

        let keys: Vec<String> = keys.iter().map(SqlType::render).collect();
        self.entries.lock().retain(|a| !keys.contains(&a.key.render()));
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        self.enter()
    }
}

/// Metrics sink counting every call
#[derive(Default)]
pub struct CountingMetrics {
    pub searches_total: AtomicUsize,
    pub searches_failed: AtomicUsize,
    pub search_latencies: AtomicUsize,
    pub inserts_total: AtomicUsize,
    pub inserts_failed: AtomicUsize,
    pub insert_latencies: AtomicUsize,
    pub deletes_total: AtomicUsize,
    pub deletes_failed: AtomicUsize,
    pub delete_latencies: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub fail_shutdown: bool,
}

impl CountingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_shutdown() -> Arc<Self> {
        Arc::new(Self {
            fail_shutdown: true,
            ..Self::default()
        })
    }

    pub fn shared() -> Arc<dyn Metrics> {
        Self::new()
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

#[async_trait]
impl Metrics for CountingMetrics {
    fn inc_searches_total(&self) {
        bump(&self.searches_total);
    }

    fn inc_searches_failed(&self) {
        bump(&self.searches_failed);
    }

    fn observe_search_latency(&self, _dur: Duration) {
        bump(&self.search_latencies);
    }

    fn inc_inserts_total(&self) {
        bump(&self.inserts_total);
    }

    fn inc_inserts_failed(&self) {
        bump(&self.inserts_failed);
    }

    fn observe_insert_latency(&self, _dur: Duration) {
        bump(&self.insert_latencies);
    }

    fn inc_deletes_total(&self) {
        bump(&self.deletes_total);
    }

    fn inc_deletes_failed(&self) {
        bump(&self.deletes_failed);
    }

    fn observe_delete_latency(&self, _dur: Duration) {
        bump(&self.delete_latencies);
    }

    async fn shutdown(&self) -> Result<()> {
        bump(&self.shutdowns);

        if self.fail_shutdown {
            return Err(IndexError::server("metrics server already stopped"));
        }

        Ok(())
    }
}

/// Shared buffer collecting formatted subscriber output
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Plain-text subscriber writing events and span closes into a buffer
pub fn capture() -> (Dispatch, Captured) {
    let captured = Captured::default();
    let writer = captured.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(move || writer.clone())
        .finish();

    (Dispatch::new(subscriber), captured)
}
