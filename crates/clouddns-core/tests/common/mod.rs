//! Test doubles and common utilities for contract tests
//!
//! These doubles count and record calls so tests can assert on exactly what
//! reached the external systems.

#![allow(dead_code)]

use clouddns_core::error::{Error, Result};
use clouddns_core::traits::{
    ChangeBatch, ChangeReceipt, ImageDigest, RecordSet, RegistryClient, ZoneClient,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A zone that records every call and applies batches without validation
pub struct RecordingZone {
    /// Current record sets
    records: Arc<std::sync::Mutex<Vec<RecordSet>>>,
    /// Every submitted batch
    submitted: Arc<std::sync::Mutex<Vec<ChangeBatch>>>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Delay before list_records() answers, to force overlapping calls
    list_delay: Duration,
}

impl RecordingZone {
    pub fn new(records: Vec<RecordSet>) -> Self {
        Self {
            records: Arc::new(std::sync::Mutex::new(records)),
            submitted: Arc::new(std::sync::Mutex::new(Vec::new())),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            list_delay: Duration::ZERO,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Delay every listing by `delay`
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = delay;
        self
    }

    /// Create a RecordingZone that shares state with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            records: Arc::clone(&other.records),
            submitted: Arc::clone(&other.submitted),
            list_call_count: Arc::clone(&other.list_call_count),
            list_delay: other.list_delay,
        }
    }

    /// Get the number of times list_records() was called
    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    /// Get every submitted batch, oldest first
    pub fn submitted(&self) -> Vec<ChangeBatch> {
        self.submitted.lock().unwrap().clone()
    }

    /// Snapshot of the zone's record sets
    pub fn records(&self) -> Vec<RecordSet> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ZoneClient for RecordingZone {
    async fn list_records(&self) -> Result<Vec<RecordSet>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        if !self.list_delay.is_zero() {
            tokio::time::sleep(self.list_delay).await;
        }
        Ok(self.records())
    }

    async fn submit_change(&self, batch: &ChangeBatch) -> Result<ChangeReceipt> {
        self.submitted.lock().unwrap().push(batch.clone());

        let mut records = self.records.lock().unwrap();
        records.retain(|existing| !batch.deletions.contains(existing));
        records.extend(batch.additions.iter().cloned());

        Ok(ChangeReceipt {
            id: self.submitted.lock().unwrap().len().to_string(),
            status: "done".to_string(),
            started_at: None,
        })
    }

    fn zone_name(&self) -> &str {
        "recording"
    }
}

/// A zone whose every call fails
pub struct FailingZone {
    /// Call counter for submit_change()
    submit_call_count: Arc<AtomicUsize>,
    /// Whether listing succeeds (with no records) so only submission fails
    list_ok: bool,
}

impl FailingZone {
    pub fn new() -> Self {
        Self {
            submit_call_count: Arc::new(AtomicUsize::new(0)),
            list_ok: false,
        }
    }

    /// Let listing succeed so the failure happens at submission
    pub fn failing_on_submit() -> Self {
        Self {
            list_ok: true,
            ..Self::new()
        }
    }

    pub fn submit_call_count(&self) -> usize {
        self.submit_call_count.load(Ordering::SeqCst)
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            submit_call_count: Arc::clone(&other.submit_call_count),
            list_ok: other.list_ok,
        }
    }
}

#[async_trait::async_trait]
impl ZoneClient for FailingZone {
    async fn list_records(&self) -> Result<Vec<RecordSet>> {
        if self.list_ok {
            Ok(Vec::new())
        } else {
            Err(Error::zone("zone unavailable"))
        }
    }

    async fn submit_change(&self, _batch: &ChangeBatch) -> Result<ChangeReceipt> {
        self.submit_call_count.fetch_add(1, Ordering::SeqCst);
        Err(Error::provider("test", "change rejected"))
    }

    fn zone_name(&self) -> &str {
        "failing"
    }
}

/// A registry that records every call and reports a fixed digest
pub struct RecordingRegistry {
    /// Calls in order, e.g. `"push reg/img:1"`
    calls: Arc<std::sync::Mutex<Vec<String>>>,
    /// Call counter for push()
    push_call_count: Arc<AtomicUsize>,
    /// Digest reported by inspect()
    digest: String,
}

impl RecordingRegistry {
    pub fn new(digest: &str) -> Self {
        Self {
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            push_call_count: Arc::new(AtomicUsize::new(0)),
            digest: digest.to_string(),
        }
    }

    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            push_call_count: Arc::clone(&other.push_call_count),
            digest: other.digest.clone(),
        }
    }

    /// Get every call, oldest first
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the number of times push() was called
    pub fn push_call_count(&self) -> usize {
        self.push_call_count.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl RegistryClient for RecordingRegistry {
    async fn pull(&self, reference: &str) -> Result<()> {
        self.record(format!("pull {}", reference));
        Ok(())
    }

    async fn tag(&self, from: &str, to: &str) -> Result<()> {
        self.record(format!("tag {} {}", from, to));
        Ok(())
    }

    async fn push(&self, reference: &str) -> Result<()> {
        self.push_call_count.fetch_add(1, Ordering::SeqCst);
        self.record(format!("push {}", reference));
        Ok(())
    }

    async fn inspect(&self, reference: &str) -> Result<ImageDigest> {
        self.record(format!("inspect {}", reference));
        Ok(ImageDigest {
            digest: self.digest.clone(),
        })
    }

    fn client_name(&self) -> &'static str {
        "recording"
    }
}

/// A sentinel-ttl A record
pub fn managed(name: &str, ip: &str) -> RecordSet {
    RecordSet::managed_a(name, ip.parse().unwrap())
}
