//! DNS record reconciler
//!
//! The DnsReconciler is responsible for:
//! - Reading the managed zone's current record sets
//! - Finding the record it owns for a name (type A, sentinel TTL)
//! - Deciding whether the record already points at the desired address
//! - Submitting the minimal atomic change batch when it does not
//!
//! ## Flow
//!
//! ```text
//!   reconcile(name, addr)
//!          │
//!          ▼
//!   ┌──────────────┐   list_records   ┌────────────┐
//!   │ name lock    │ ───────────────▶ │ ZoneClient │
//!   └──────────────┘                  └────────────┘
//!          │ plan_change                    ▲
//!          ▼                                │ submit_change
//!   NotModified | Apply(batch) ─────────────┘
//! ```
//!
//! ## Ownership
//!
//! Only records with `type == A` and `ttl == MANAGED_TTL` are candidates.
//! Anything else in the zone belongs to other tooling and is never deleted.
//!
//! ## Concurrency
//!
//! Calls for the same record name are serialized for the whole
//! read-then-write, so two overlapping requests cannot both act on the same
//! stale listing. Calls for different names run independently. Nothing is
//! retried here; adapter errors reach the caller unmodified.

use crate::error::Result;
use crate::traits::{ChangeBatch, RecordSet, ZoneClient};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconcileStatus {
    /// The managed record already had exactly the desired address
    NotModified,
    /// No managed record existed; one was added
    Created,
    /// A stale managed record was replaced
    Updated,
}

impl ReconcileStatus {
    /// Lower-case message reported to HTTP callers
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileStatus::NotModified => "not modified",
            ReconcileStatus::Created => "created",
            ReconcileStatus::Updated => "updated",
        }
    }
}

impl std::fmt::Display for ReconcileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reconciliation needs to do, computed from one zone listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangePlan {
    /// The managed record already matches
    Unchanged {
        /// The matching record, as listed
        current: RecordSet,
    },
    /// Submit `batch`; report `status` once the zone accepts it
    Apply {
        /// `Created` or `Updated`
        status: ReconcileStatus,
        /// Additions and deletions to submit atomically
        batch: ChangeBatch,
    },
}

/// Decide how to bring `name -> addr` into the zone
///
/// The first record set with the managed sentinel whose name matches is the
/// one this system owns. A stale one is echoed verbatim into the deletions,
/// as zones require deletions to match the existing record exactly.
pub fn plan_change(observed: &[RecordSet], name: &str, addr: Ipv4Addr) -> ChangePlan {
    let existing = observed
        .iter()
        .find(|record| record.is_managed() && record.has_name(name));

    match existing {
        Some(current) if current.points_only_to(addr) => ChangePlan::Unchanged {
            current: current.clone(),
        },
        Some(stale) => ChangePlan::Apply {
            status: ReconcileStatus::Updated,
            batch: ChangeBatch::new()
                .add(RecordSet::managed_a(fqdn(name), addr))
                .delete(stale.clone()),
        },
        None => ChangePlan::Apply {
            status: ReconcileStatus::Created,
            batch: ChangeBatch::new().add(RecordSet::managed_a(fqdn(name), addr)),
        },
    }
}

/// Fully qualify `name` with the trailing root dot zones expect
pub fn fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Keeps one sentinel-TTL A record per name in sync with a desired address
///
/// The zone client is injected by the caller; the reconciler owns no state
/// other than the per-name serialization points.
pub struct DnsReconciler {
    /// Managed zone adapter
    zone: Arc<dyn ZoneClient>,

    /// One async mutex per record name currently being reconciled
    name_locks: std::sync::Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DnsReconciler {
    /// Create a reconciler over an already-initialized zone client
    pub fn new(zone: Arc<dyn ZoneClient>) -> Self {
        Self {
            zone,
            name_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// The zone this reconciler manages
    pub fn zone(&self) -> &Arc<dyn ZoneClient> {
        &self.zone
    }

    /// Converge the zone so that `name` resolves to exactly `addr`
    ///
    /// # Returns
    ///
    /// - `Ok(NotModified)`: Nothing was submitted
    /// - `Ok(Created)` / `Ok(Updated)`: One change batch was accepted
    /// - `Err(Error)`: Listing or submission failed; the zone is unchanged
    pub async fn reconcile(&self, name: &str, addr: Ipv4Addr) -> Result<ReconcileStatus> {
        let key = name.trim_end_matches('.').to_ascii_lowercase();
        let lock = self.acquire_name_lock(&key);

        let result = {
            let _guard = lock.lock().await;
            self.reconcile_locked(name, addr).await
        };

        self.release_name_lock(&key, lock);
        result
    }

    async fn reconcile_locked(&self, name: &str, addr: Ipv4Addr) -> Result<ReconcileStatus> {
        let zone_name = self.zone.zone_name();
        let observed = self.zone.list_records().await?;
        debug!(
            "Zone {} lists {} record set(s) while reconciling {}",
            zone_name,
            observed.len(),
            name
        );

        match plan_change(&observed, name, addr) {
            ChangePlan::Unchanged { current } => {
                debug!(
                    "Zone {} record {} -> {:?} doesn't need modifications",
                    zone_name, current.name, current.values
                );
                Ok(ReconcileStatus::NotModified)
            }
            ChangePlan::Apply { status, batch } => {
                match batch.deletions.first() {
                    Some(stale) => info!(
                        "Updating zone {} record {} {:?} with {}",
                        zone_name, stale.name, stale.values, addr
                    ),
                    None => info!("Creating zone {} record {} -> {}", zone_name, name, addr),
                }

                let receipt = self.zone.submit_change(&batch).await?;
                info!(
                    "Zone {} accepted change {} ({}): {} {}",
                    zone_name, receipt.id, receipt.status, name, status
                );
                Ok(status)
            }
        }
    }

    fn acquire_name_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn release_name_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self
            .name_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Clones are only handed out under this map lock, so a count of two
        // (map + ours) means no other call is waiting on this name.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn tracked_names(&self) -> usize {
        self.name_locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MANAGED_TTL, RecordType};
    use crate::zone::MemoryZone;

    fn a(name: &str, ttl: u32, values: &[&str]) -> RecordSet {
        RecordSet::new(
            name,
            RecordType::A,
            ttl,
            values.iter().map(|v| v.to_string()).collect(),
        )
    }

    #[test]
    fn test_plan_creates_when_absent() {
        let plan = plan_change(&[], "home.example.com", Ipv4Addr::new(1, 2, 3, 4));
        assert_eq!(
            plan,
            ChangePlan::Apply {
                status: ReconcileStatus::Created,
                batch: ChangeBatch::new().add(a("home.example.com.", MANAGED_TTL, &["1.2.3.4"])),
            }
        );
    }

    #[test]
    fn test_plan_unchanged_when_matching() {
        let current = a("home.example.com.", MANAGED_TTL, &["1.2.3.4"]);
        let plan = plan_change(
            std::slice::from_ref(&current),
            "home.example.com",
            Ipv4Addr::new(1, 2, 3, 4),
        );
        assert_eq!(plan, ChangePlan::Unchanged { current });
    }

    #[test]
    fn test_plan_echoes_stale_record_verbatim() {
        let stale = a("Home.Example.com.", MANAGED_TTL, &["1.2.3.4", "9.9.9.9"]);
        let plan = plan_change(
            std::slice::from_ref(&stale),
            "home.example.com.",
            Ipv4Addr::new(1, 2, 3, 4),
        );
        match plan {
            ChangePlan::Apply { status, batch } => {
                assert_eq!(status, ReconcileStatus::Updated);
                assert_eq!(batch.deletions, vec![stale]);
                assert_eq!(
                    batch.additions,
                    vec![a("home.example.com.", MANAGED_TTL, &["1.2.3.4"])]
                );
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_ignores_foreign_ttl() {
        let foreign = a("home.example.com.", 300, &["5.6.7.8"]);
        let plan = plan_change(&[foreign], "home.example.com", Ipv4Addr::new(1, 2, 3, 4));
        match plan {
            ChangePlan::Apply { status, batch } => {
                assert_eq!(status, ReconcileStatus::Created);
                assert!(batch.deletions.is_empty());
            }
            other => panic!("expected Apply, got {:?}", other),
        }
    }

    #[test]
    fn test_fqdn() {
        assert_eq!(fqdn("home.example.com"), "home.example.com.");
        assert_eq!(fqdn("home.example.com."), "home.example.com.");
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ReconcileStatus::NotModified).unwrap(),
            "NOT_MODIFIED"
        );
        assert_eq!(ReconcileStatus::NotModified.to_string(), "not modified");
    }

    #[tokio::test]
    async fn test_name_locks_are_released() {
        let reconciler = DnsReconciler::new(Arc::new(MemoryZone::new("test")));
        reconciler
            .reconcile("home.example.com", Ipv4Addr::new(1, 2, 3, 4))
            .await
            .unwrap();
        assert_eq!(reconciler.tracked_names(), 0);
    }
}
