// # Zone Client Trait
//
// Defines the interface to a managed DNS zone.
//
// ## Implementations
//
// - Google Cloud DNS: `clouddns-zone-gcp` crate
// - In-process zone: [`crate::zone::MemoryZone`]
//
// ## Usage
//
// ```rust,ignore
// use clouddns_core::traits::{ChangeBatch, RecordSet, ZoneClient};
//
// let records = zone.list_records().await?;
// let batch = ChangeBatch::new()
//     .add(RecordSet::managed_a("home.example.com.", "1.2.3.4".parse()?));
// zone.submit_change(&batch).await?;
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// TTL that marks a record as owned by the reconciler
///
/// Records with any other TTL were created by other tooling and are never
/// modified or deleted.
pub const MANAGED_TTL: u32 = 5;

/// DNS record type
///
/// Only `A` is produced by this system; the other variants exist so that
/// foreign record sets read from the zone round-trip without loss.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// IPv6 address record
    Aaaa,
    /// Canonical name record
    Cname,
    /// Text record
    Txt,
    /// Any other type, kept verbatim
    Other(String),
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "TXT" => RecordType::Txt,
            _ => RecordType::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Aaaa => f.write_str("AAAA"),
            RecordType::Cname => f.write_str("CNAME"),
            RecordType::Txt => f.write_str("TXT"),
            RecordType::Other(other) => f.write_str(other),
        }
    }
}

/// One resource record set as the zone reports it
///
/// Serializes to the Cloud DNS `ResourceRecordSet` shape
/// (`{"name", "type", "ttl", "rrdatas"}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSet {
    /// Owner name, usually fully qualified with a trailing dot
    pub name: String,
    /// Record type
    #[serde(rename = "type")]
    pub record_type: RecordType,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Record data, in zone order
    #[serde(rename = "rrdatas", default)]
    pub values: Vec<String>,
}

impl RecordSet {
    /// Create a record set
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        ttl: u32,
        values: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            ttl,
            values,
        }
    }

    /// The A record the reconciler writes for `name -> addr`
    pub fn managed_a(name: impl Into<String>, addr: Ipv4Addr) -> Self {
        Self::new(name, RecordType::A, MANAGED_TTL, vec![addr.to_string()])
    }

    /// Whether this record set carries the managed-record sentinel
    pub fn is_managed(&self) -> bool {
        self.record_type == RecordType::A && self.ttl == MANAGED_TTL
    }

    /// Whether this record set's owner name is `name`
    ///
    /// DNS names compare case-insensitively and the trailing root dot is
    /// optional on either side.
    pub fn has_name(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }

    /// Whether the record data is exactly one value equal to `addr`
    pub fn points_only_to(&self, addr: Ipv4Addr) -> bool {
        matches!(self.values.as_slice(), [only] if only.parse::<Ipv4Addr>().ok() == Some(addr))
    }
}

/// Compare two DNS owner names
pub fn same_name(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// An atomic set of record additions and deletions
///
/// Serializes to the Cloud DNS `Change` request body. Zones apply a batch
/// entirely or reject it entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    /// Record sets to add
    #[serde(default)]
    pub additions: Vec<RecordSet>,
    /// Record sets to delete; each must echo the existing record exactly
    #[serde(default)]
    pub deletions: Vec<RecordSet>,
}

impl ChangeBatch {
    /// Create an empty change batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record set to the additions
    pub fn add(mut self, record: RecordSet) -> Self {
        self.additions.push(record);
        self
    }

    /// Add a record set to the deletions
    pub fn delete(mut self, record: RecordSet) -> Self {
        self.deletions.push(record);
        self
    }

    /// Whether the batch contains no mutations
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }
}

/// Acknowledgement of a submitted change batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeReceipt {
    /// Zone-assigned change id
    pub id: String,
    /// Zone-reported status (e.g. "pending", "done")
    pub status: String,
    /// When the zone accepted the change, if reported
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Trait for managed zone adapters
///
/// # Trust Level: Untrusted
///
/// Zone clients are stateless gateways: they perform one API call per
/// method invocation and return the result. They never decide whether a
/// change is needed, never retry, and never cache the record list.
/// Zone identity (project, zone name, credentials) is bound at construction.
#[async_trait]
pub trait ZoneClient: Send + Sync {
    /// List every resource record set in the zone
    ///
    /// Only the records returned by a single call are reported; zones large
    /// enough to paginate are outside the intended use.
    async fn list_records(&self) -> Result<Vec<RecordSet>, crate::Error>;

    /// Submit an atomic change batch
    ///
    /// # Returns
    ///
    /// - `Ok(ChangeReceipt)`: The zone accepted the whole batch
    /// - `Err(Error)`: The zone rejected the batch; nothing was applied
    async fn submit_change(&self, batch: &ChangeBatch) -> Result<ChangeReceipt, crate::Error>;

    /// Human-readable zone identity (for logging)
    fn zone_name(&self) -> &str;
}

/// Helper trait for constructing zone clients from configuration
#[async_trait]
pub trait ZoneClientFactory: Send + Sync {
    /// Create a zone client from configuration
    ///
    /// Construction may perform network calls (credential and project
    /// discovery); it runs once at process start-up.
    async fn create(
        &self,
        config: &crate::config::ZoneConfig,
    ) -> Result<std::sync::Arc<dyn ZoneClient>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_set_wire_shape() {
        let record = RecordSet::managed_a("home.example.com.", Ipv4Addr::new(1, 2, 3, 4));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "home.example.com.",
                "type": "A",
                "ttl": 5,
                "rrdatas": ["1.2.3.4"],
            })
        );
    }

    #[test]
    fn test_foreign_record_type_is_kept_verbatim() {
        let record: RecordSet = serde_json::from_value(serde_json::json!({
            "kind": "dns#resourceRecordSet",
            "name": "example.com.",
            "type": "SOA",
            "ttl": 21600,
            "rrdatas": ["ns-cloud-a1.googledomains.com. admin. 1 21600 3600 259200 300"],
        }))
        .unwrap();
        assert_eq!(record.record_type, RecordType::Other("SOA".to_string()));
        assert_eq!(serde_json::to_value(&record).unwrap()["type"], "SOA");
    }

    #[test]
    fn test_same_name_ignores_root_dot_and_case() {
        assert!(same_name("home.example.com.", "home.example.com"));
        assert!(same_name("Home.Example.COM", "home.example.com."));
        assert!(!same_name("www.example.com", "home.example.com"));
    }

    #[test]
    fn test_points_only_to() {
        let addr = Ipv4Addr::new(1, 2, 3, 4);
        let single = RecordSet::managed_a("a.example.com.", addr);
        assert!(single.points_only_to(addr));
        assert!(!single.points_only_to(Ipv4Addr::new(5, 6, 7, 8)));

        let multi = RecordSet::new(
            "a.example.com.",
            RecordType::A,
            MANAGED_TTL,
            vec!["1.2.3.4".to_string(), "5.6.7.8".to_string()],
        );
        assert!(!multi.points_only_to(addr));
    }

    #[test]
    fn test_is_managed_requires_sentinel_ttl() {
        let addr = Ipv4Addr::new(1, 2, 3, 4);
        assert!(RecordSet::managed_a("a.example.com.", addr).is_managed());
        let foreign = RecordSet::new("a.example.com.", RecordType::A, 300, vec![addr.to_string()]);
        assert!(!foreign.is_managed());
    }
}
