//! Central provider registry
//!
//! Holds every live signing agent keyed by id, enforces the registration
//! contract up front, and broadcasts lifecycle events so other components
//! can react to providers coming and going.

use crate::error::{ErrorKind, ProviderError};
use crate::provider::{ChainKind, SignatureProvider};
use crate::registry::events::{RegistryEvent, REGISTRY_EVENT_CAPACITY};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

struct RegistryInner {
    providers: HashMap<String, Arc<dyn SignatureProvider>>,
    /// Registration order, kept for deterministic listing and selection ties
    order: Vec<String>,
}

/// Registry of live signature providers
///
/// All methods take `&self`; the provider map lives behind an async RwLock
/// so the registry can be shared via `Arc` across tasks.
pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
    event_tx: broadcast::Sender<RegistryEvent>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(REGISTRY_EVENT_CAPACITY);
        Self {
            inner: RwLock::new(RegistryInner {
                providers: HashMap::new(),
                order: Vec::new(),
            }),
            event_tx,
        }
    }

    /// Subscribe to registry lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }

    /// Validate a provider and add it to the registry
    ///
    /// Rejects empty ids, incomplete metadata, implementations that declare
    /// no supported chains, and duplicate ids.
    pub async fn register(
        &self,
        provider: Arc<dyn SignatureProvider>,
    ) -> Result<(), ProviderError> {
        let id = provider.id().to_string();
        if id.trim().is_empty() {
            return Err(ProviderError::new(
                ErrorKind::InvalidId,
                "provider id must be a non-empty string",
            ));
        }

        let metadata = provider.metadata();
        if metadata.name.trim().is_empty()
            || metadata.version.trim().is_empty()
            || metadata.description.trim().is_empty()
        {
            return Err(ProviderError::new(
                ErrorKind::InvalidMetadata,
                format!(
                    "provider '{}' metadata must include name, version, and description",
                    id
                ),
            )
            .with_provider(&id));
        }

        let capabilities = provider.capabilities();
        if capabilities.supported_chains.is_empty() {
            return Err(ProviderError::new(
                ErrorKind::InvalidImplementation,
                format!("provider '{}' declares no supported chains", id),
            )
            .with_provider(&id));
        }

        let mut inner = self.inner.write().await;
        if inner.providers.contains_key(&id) {
            return Err(ProviderError::new(
                ErrorKind::AlreadyRegistered,
                format!("provider '{}' is already registered", id),
            )
            .with_provider(&id));
        }

        let chains = capabilities.supported_chains.clone();
        inner.providers.insert(id.clone(), provider);
        inner.order.push(id.clone());
        drop(inner);

        log::info!(
            "Registered provider {} ({}, {} chain(s))",
            id,
            metadata.name,
            chains.len()
        );
        self.emit(RegistryEvent::ProviderRegistered {
            provider_id: id,
            chains,
        });
        Ok(())
    }

    /// Remove a provider, disconnecting it first if it is connected
    ///
    /// A failed disconnect is logged and does not abort the removal.
    pub async fn unregister(&self, id: &str) -> Result<(), ProviderError> {
        let provider = {
            let mut inner = self.inner.write().await;
            let provider = inner.providers.remove(id).ok_or_else(|| {
                ProviderError::not_found(format!("provider '{}' is not registered", id))
            })?;
            inner.order.retain(|entry| entry != id);
            provider
        };

        if provider.is_connected().await {
            if let Err(e) = provider.disconnect().await {
                log::warn!("Disconnect during unregister of {} failed: {}", id, e);
            }
        }

        log::info!("Unregistered provider {}", id);
        self.emit(RegistryEvent::ProviderUnregistered {
            provider_id: id.to_string(),
        });
        Ok(())
    }

    /// Look up a provider by id
    pub async fn get(&self, id: &str) -> Option<Arc<dyn SignatureProvider>> {
        self.inner.read().await.providers.get(id).cloned()
    }

    pub async fn has_provider(&self, id: &str) -> bool {
        self.inner.read().await.providers.contains_key(id)
    }

    pub async fn count(&self) -> usize {
        self.inner.read().await.providers.len()
    }

    /// Registered ids in registration order
    pub async fn provider_ids(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }

    /// All providers in registration order
    pub async fn list(&self) -> Vec<Arc<dyn SignatureProvider>> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|id| inner.providers.get(id).cloned())
            .collect()
    }

    /// Providers that can sign for the given chain, in registration order
    pub async fn find_providers_for_chain(
        &self,
        chain: ChainKind,
    ) -> Vec<Arc<dyn SignatureProvider>> {
        self.list()
            .await
            .into_iter()
            .filter(|p| p.capabilities().supports_chain(chain))
            .collect()
    }

    /// Providers that can sign for every one of the given chains
    pub async fn find_multi_chain_providers(
        &self,
        chains: &[ChainKind],
    ) -> Vec<Arc<dyn SignatureProvider>> {
        self.list()
            .await
            .into_iter()
            .filter(|p| p.capabilities().supports_all_chains(chains))
            .collect()
    }

    /// Remove every provider, disconnecting each best-effort
    pub async fn clear(&self) {
        let removed = {
            let mut inner = self.inner.write().await;
            let order = std::mem::take(&mut inner.order);
            let mut providers = std::mem::take(&mut inner.providers);
            order
                .into_iter()
                .filter_map(|id| providers.remove(&id).map(|p| (id, p)))
                .collect::<Vec<_>>()
        };

        for (id, provider) in removed {
            if provider.is_connected().await {
                if let Err(e) = provider.disconnect().await {
                    log::warn!("Disconnect during clear of {} failed: {}", id, e);
                }
            }
            self.emit(RegistryEvent::ProviderUnregistered { provider_id: id });
        }
        log::info!("Cleared provider registry");
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
