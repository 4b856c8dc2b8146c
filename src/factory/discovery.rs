//! Provider builders and discovery records

use crate::error::ProviderError;
use crate::provider::{ChainKind, ProviderKind, SignatureProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Recipe for one provider instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which builder produces the instance
    pub kind: ProviderKind,
    /// Explicit instance id; derived from the kind when omitted
    pub id: Option<String>,
    /// Free-form settings passed through to the builder
    pub settings: Map<String, Value>,
}

impl ProviderConfig {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            id: None,
            settings: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }
}

/// Result of probing one provider kind
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    pub kind: ProviderKind,
    /// Whether an agent of this kind can currently be built
    pub available: bool,
    /// Agent version reported by the probe, when available
    pub version: Option<String>,
    /// Extra probe details (device model, extension id, ...)
    pub metadata: Option<Value>,
    /// Why the probe failed, when unavailable
    pub error: Option<String>,
}

impl DiscoveryRecord {
    pub fn available(kind: ProviderKind, version: impl Into<String>) -> Self {
        Self {
            kind,
            available: true,
            version: Some(version.into()),
            metadata: None,
            error: None,
        }
    }

    pub fn unavailable(kind: ProviderKind, error: impl Into<String>) -> Self {
        Self {
            kind,
            available: false,
            version: None,
            metadata: None,
            error: Some(error.into()),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Produces providers of one kind
///
/// Each signing agent family registers a builder with the factory. `probe`
/// answers "is an agent of this kind reachable right now" without building
/// anything; `build` constructs a disconnected instance from a config.
#[async_trait]
pub trait ProviderBuilder: Send + Sync {
    /// The provider kind this builder produces
    fn kind(&self) -> ProviderKind;

    /// Chains every instance from this builder can sign for
    fn supported_chains(&self) -> Vec<ChainKind>;

    /// Check whether an agent of this kind is currently available
    async fn probe(&self) -> DiscoveryRecord;

    /// Construct a disconnected provider instance
    fn build(&self, config: &ProviderConfig)
        -> Result<Arc<dyn SignatureProvider>, ProviderError>;
}
