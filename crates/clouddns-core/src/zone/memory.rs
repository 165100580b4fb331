// # Memory Zone
//
// In-memory implementation of ZoneClient.
//
// ## Purpose
//
// Provides a managed zone that lives in the process. Useful for testing,
// local runs of the daemon without cloud credentials, and as a reference
// for the change-batch semantics real zones enforce.
//
// ## Batch Semantics
//
// Mirrors Cloud DNS:
// - Every deletion must match an existing record set exactly (name, type, ttl, data)
// - An addition may not collide with an existing (name, type) unless that
//   record set is deleted in the same batch
// - The batch is validated completely before anything is applied, so a
//   rejected batch leaves the zone untouched

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::config::ZoneConfig;
use crate::traits::zone_client::{
    ChangeBatch, ChangeReceipt, RecordSet, ZoneClient, ZoneClientFactory, same_name,
};

/// In-memory managed zone
///
/// Cloning shares the underlying records, so a test can keep a handle while
/// the reconciler owns another.
///
/// # Example
///
/// ```rust
/// use clouddns_core::traits::{ChangeBatch, RecordSet, ZoneClient};
/// use clouddns_core::zone::MemoryZone;
///
/// # tokio_test::block_on(async {
/// let zone = MemoryZone::new("home");
/// let batch = ChangeBatch::new().add(RecordSet::managed_a("a.example.com.", "1.2.3.4".parse().unwrap()));
/// zone.submit_change(&batch).await.unwrap();
/// assert_eq!(zone.list_records().await.unwrap().len(), 1);
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct MemoryZone {
    name: String,
    records: Arc<RwLock<Vec<RecordSet>>>,
    history: Arc<RwLock<Vec<ChangeBatch>>>,
    next_change_id: Arc<AtomicU64>,
}

impl MemoryZone {
    /// Create a new empty zone
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_records(name, Vec::new())
    }

    /// Create a zone pre-populated with record sets
    pub fn with_records(name: impl Into<String>, records: Vec<RecordSet>) -> Self {
        Self {
            name: name.into(),
            records: Arc::new(RwLock::new(records)),
            history: Arc::new(RwLock::new(Vec::new())),
            next_change_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Snapshot of the zone's record sets
    pub async fn records(&self) -> Vec<RecordSet> {
        self.records.read().await.clone()
    }

    /// Every batch the zone has accepted, oldest first
    pub async fn accepted_changes(&self) -> Vec<ChangeBatch> {
        self.history.read().await.clone()
    }

    /// Get the number of record sets in the zone
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the zone is empty
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn validate_batch(current: &[RecordSet], batch: &ChangeBatch) -> Result<(), Error> {
    if batch.is_empty() {
        return Err(Error::invalid_input("The change batch is empty"));
    }

    for deletion in &batch.deletions {
        if !current.contains(deletion) {
            return Err(Error::zone(format!(
                "The resource record set '{} {}' to delete does not match an existing one",
                deletion.name, deletion.record_type
            )));
        }
    }

    for addition in &batch.additions {
        let collides = current.iter().any(|existing| {
            existing.record_type == addition.record_type
                && same_name(&existing.name, &addition.name)
                && !batch.deletions.contains(existing)
        });
        if collides {
            return Err(Error::zone(format!(
                "The resource record set '{} {}' already exists",
                addition.name, addition.record_type
            )));
        }
    }

    Ok(())
}

#[async_trait]
impl ZoneClient for MemoryZone {
    async fn list_records(&self) -> Result<Vec<RecordSet>, Error> {
        Ok(self.records.read().await.clone())
    }

    async fn submit_change(&self, batch: &ChangeBatch) -> Result<ChangeReceipt, Error> {
        let mut records = self.records.write().await;
        validate_batch(&records, batch)?;

        records.retain(|existing| !batch.deletions.contains(existing));
        records.extend(batch.additions.iter().cloned());
        self.history.write().await.push(batch.clone());

        let id = self.next_change_id.fetch_add(1, Ordering::SeqCst);
        Ok(ChangeReceipt {
            id: id.to_string(),
            status: "done".to_string(),
            started_at: Some(chrono::Utc::now()),
        })
    }

    fn zone_name(&self) -> &str {
        &self.name
    }
}

/// Factory for creating memory zones
pub struct MemoryZoneFactory;

#[async_trait]
impl ZoneClientFactory for MemoryZoneFactory {
    async fn create(&self, config: &ZoneConfig) -> Result<Arc<dyn ZoneClient>, Error> {
        match config {
            ZoneConfig::Memory => Ok(Arc::new(MemoryZone::new("memory"))),
            _ => Err(Error::config("Invalid config for memory zone")),
        }
    }
}
