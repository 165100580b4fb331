// # Zone Implementations
//
// In-process implementations of the ZoneClient trait.

pub mod memory;

pub use memory::{MemoryZone, MemoryZoneFactory};
