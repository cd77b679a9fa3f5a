//! In-memory collaborators for driving cycles without the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use threebody_models::{DashboardRecord, MarketSnapshot, Notification};
use threebody_state::{StateError, StateStore};

use crate::error::{ExecutionError, NotifyError, SourceError};
use crate::execution::{ExecutionReceipt, Executor};
use crate::notify::NotificationSink;
use crate::sources::MarketDataProvider;

enum MarketBehavior {
    Snapshot(MarketSnapshot),
    Fail,
    Panic,
}

/// Hands out a fixed snapshot, fails, or panics, and counts calls.
pub struct MockMarketData {
    behavior: MarketBehavior,
    calls: AtomicUsize,
}

impl MockMarketData {
    pub fn returning(snapshot: MarketSnapshot) -> Self {
        Self::with(MarketBehavior::Snapshot(snapshot))
    }

    pub fn failing() -> Self {
        Self::with(MarketBehavior::Fail)
    }

    pub fn panicking() -> Self {
        Self::with(MarketBehavior::Panic)
    }

    fn with(behavior: MarketBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, asset: &str) -> Result<MarketSnapshot, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MarketBehavior::Snapshot(s) => {
                let mut snapshot = s.clone();
                snapshot.target_asset = asset.to_string();
                Ok(snapshot)
            }
            MarketBehavior::Fail => Err(SourceError::MarketData(format!(
                "no data for {asset}"
            ))),
            MarketBehavior::Panic => panic!("market feed exploded"),
        }
    }
}

/// Executor that succeeds with a fixed reference or always fails.
pub struct MockExecutor {
    reference: Option<String>,
    calls: AtomicUsize,
    last_voters: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn succeeding(reference: &str) -> Self {
        Self {
            reference: Some(reference.to_string()),
            calls: AtomicUsize::new(0),
            last_voters: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reference: None,
            ..Self::succeeding("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_voters(&self) -> Vec<String> {
        self.last_voters
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Executor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        _decision: &threebody_models::Decision,
        voters: &[String],
    ) -> Result<ExecutionReceipt, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_voters.lock() {
            *last = voters.to_vec();
        }
        match &self.reference {
            Some(reference) => Ok(ExecutionReceipt {
                reference: reference.clone(),
            }),
            None => Err(ExecutionError::Rpc {
                code: -32000,
                message: "mock revert".to_string(),
            }),
        }
    }
}

/// Sink that records what it receives, or rejects everything.
pub struct RecordingSink {
    name: String,
    fail: bool,
    attempts: AtomicUsize,
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            attempts: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(NotifyError::Rejected {
                sink: self.name.clone(),
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        if let Ok(mut received) = self.received.lock() {
            received.push(notification.clone());
        }
        Ok(())
    }
}

/// Single-slot store kept in memory. Can be told to fail every write.
#[derive(Default)]
pub struct MemoryStore {
    record: Mutex<Option<DashboardRecord>>,
    fail_writes: bool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl StateStore for MemoryStore {
    fn save(&self, record: &DashboardRecord) -> Result<(), StateError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StateError::Io {
                path: "memory".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        let mut slot = self.record.lock().map_err(|_| StateError::Poisoned)?;
        *slot = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<DashboardRecord>, StateError> {
        let slot = self.record.lock().map_err(|_| StateError::Poisoned)?;
        Ok(slot.clone())
    }
}
