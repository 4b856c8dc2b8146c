//! Registry lifecycle events

use crate::provider::ChainKind;
use serde::{Deserialize, Serialize};

/// Events buffered per subscriber before the oldest are dropped
pub const REGISTRY_EVENT_CAPACITY: usize = 64;

/// Emitted whenever the provider set changes
///
/// Events are fanned out over a broadcast channel. Every subscriber owns an
/// independent receiver, so a slow or dropped listener never stalls the
/// registry or the other listeners.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegistryEvent {
    /// A provider passed validation and joined the registry
    ProviderRegistered {
        provider_id: String,
        chains: Vec<ChainKind>,
    },
    /// A provider was removed from the registry
    ProviderUnregistered { provider_id: String },
}

impl RegistryEvent {
    /// Id of the provider the event refers to
    pub fn provider_id(&self) -> &str {
        match self {
            RegistryEvent::ProviderRegistered { provider_id, .. } => provider_id,
            RegistryEvent::ProviderUnregistered { provider_id } => provider_id,
        }
    }
}
