// # clouddns-core
//
// Core library for the dynamic Cloud DNS system.
//
// ## Architecture Overview
//
// This library holds the two convergence engines and the seams they talk through:
// - **ZoneClient**: Trait for listing and mutating a managed DNS zone
// - **RegistryClient**: Trait for pulling, tagging, pushing and inspecting images
// - **SecretSource**: Trait for reading the shared update secret
// - **DnsReconciler**: Keeps one sentinel-ttl A record in sync with a desired address
// - **ImagePublisher**: Declarative lifecycle that publishes an image under its digest
// - **AdapterRegistry**: Name-keyed factories for zone and registry adapters
//
// ## Design Principles
//
// 1. **Adapters are stateless**: The zone and the registry are the only durable stores
// 2. **Injected clients**: Adapters are constructed once by the entry point and passed in
// 3. **No hidden retries**: Adapter failures propagate to the caller unmodified
// 4. **Idempotency**: Repeating a call against unchanged external state is a no-op

pub mod traits;
pub mod reconciler;
pub mod publish;
pub mod reference;
pub mod registry;
pub mod config;
pub mod error;
pub mod zone;

// Re-export core types for convenience
pub use traits::{RegistryClient, SecretSource, ZoneClient};
pub use reconciler::{DnsReconciler, ReconcileStatus};
pub use publish::{ImagePublisher, PublishInputs, PublishOutputs, ResourceState};
pub use registry::AdapterRegistry;
pub use config::{ServiceConfig, ZoneConfig, SecretConfig};
pub use error::{Error, Result};
pub use zone::MemoryZone;
