//! Core traits for the dynamic Cloud DNS system
//!
//! This module defines the abstract interfaces that all adapters must follow.
//!
//! - [`ZoneClient`]: List and mutate a managed DNS zone
//! - [`RegistryClient`]: Pull, tag, push and inspect container images
//! - [`SecretSource`]: Read the shared secret that authorizes updates

pub mod zone_client;
pub mod registry_client;
pub mod secret_source;

pub use zone_client::{
    ChangeBatch, ChangeReceipt, MANAGED_TTL, RecordSet, RecordType, ZoneClient, ZoneClientFactory,
};
pub use registry_client::{ImageDigest, RegistryClient, RegistryClientFactory};
pub use secret_source::{SecretSource, StaticSecret};
