//! Name-keyed adapter registry
//!
//! Zone and registry adapters register a factory under the type name their
//! configuration carries, so entry points select an adapter from config
//! instead of hardcoding it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clouddns_core::registry::AdapterRegistry;
//! use clouddns_core::config::ZoneConfig;
//!
//! let registry = AdapterRegistry::with_builtin();
//! clouddns_zone_gcp::register(&registry);
//!
//! let zone = registry.create_zone_client(&config.zone).await?;
//! ```
//!
//! Adapter crates expose a `register` function that inserts their factory:
//!
//! ```rust,ignore
//! pub fn register(registry: &AdapterRegistry) {
//!     registry.register_zone_client("cloud_dns", Box::new(CloudDnsFactory::default()));
//! }
//! ```

use crate::config::{RegistryConfig, ZoneConfig};
use crate::error::{Error, Result};
use crate::traits::{RegistryClient, RegistryClientFactory, ZoneClient, ZoneClientFactory};
use crate::zone::MemoryZoneFactory;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

/// Registry of zone and registry adapter factories
///
/// Interior mutability with RwLock allows registration through a shared
/// reference and concurrent lookups.
#[derive(Default)]
pub struct AdapterRegistry {
    /// Zone client factories, keyed by `ZoneConfig::type_name`
    zone_clients: RwLock<HashMap<String, Arc<dyn ZoneClientFactory>>>,

    /// Registry client factories, keyed by `RegistryConfig::type_name`
    registry_clients: RwLock<HashMap<String, Box<dyn RegistryClientFactory>>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the in-process `memory` zone registered
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_zone_client("memory", Box::new(MemoryZoneFactory));
        registry
    }

    /// Register a zone client factory under `name`
    pub fn register_zone_client(&self, name: impl Into<String>, factory: Box<dyn ZoneClientFactory>) {
        let mut factories = self
            .zone_clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(name.into(), Arc::from(factory));
    }

    /// Register a registry client factory under `name`
    pub fn register_registry_client(
        &self,
        name: impl Into<String>,
        factory: Box<dyn RegistryClientFactory>,
    ) {
        let mut factories = self
            .registry_clients
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        factories.insert(name.into(), factory);
    }

    /// Build a zone client from configuration
    ///
    /// Fails with `Error::Config` when no factory is registered for the
    /// config's type, or with whatever the factory reports.
    pub async fn create_zone_client(&self, config: &ZoneConfig) -> Result<Arc<dyn ZoneClient>> {
        let zone_type = config.type_name();
        let factory = read(&self.zone_clients)
            .get(zone_type)
            .cloned()
            .ok_or_else(|| Error::config(format!("Unknown zone type: {}", zone_type)))?;

        // Guard is dropped above; factories may await network calls
        factory.create(config).await
    }

    /// Build a registry client from configuration
    pub fn create_registry_client(&self, config: &RegistryConfig) -> Result<Box<dyn RegistryClient>> {
        let client_type = config.type_name();
        let factories = read(&self.registry_clients);

        let factory = factories
            .get(client_type)
            .ok_or_else(|| Error::config(format!("Unknown registry client type: {}", client_type)))?;

        factory.create(config)
    }

    /// Registered zone types
    pub fn list_zone_clients(&self) -> Vec<String> {
        read(&self.zone_clients).keys().cloned().collect()
    }

    /// Registered registry client types
    pub fn list_registry_clients(&self) -> Vec<String> {
        read(&self.registry_clients).keys().cloned().collect()
    }

    /// Whether a zone type is registered
    pub fn has_zone_client(&self, name: &str) -> bool {
        read(&self.zone_clients).contains_key(name)
    }

    /// Whether a registry client type is registered
    pub fn has_registry_client(&self, name: &str) -> bool {
        read(&self.registry_clients).contains_key(name)
    }
}
