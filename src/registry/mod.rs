//! Provider registration and lookup
//!
//! The registry is the single source of truth for which signing agents are
//! live. Registration validates the provider contract (id, metadata,
//! declared chains) before the provider becomes visible, and every change
//! is announced on a broadcast event channel.

pub mod events;
pub mod registry;

pub use events::{RegistryEvent, REGISTRY_EVENT_CAPACITY};
pub use registry::ProviderRegistry;
