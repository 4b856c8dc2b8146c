//! Provider factory
//!
//! Builds provider instances from registered [`ProviderBuilder`]s, drives
//! the connect/retry/register lifecycle, and keeps a discovery cache so
//! callers can ask "what can sign for this chain" without re-probing every
//! agent kind.

use crate::error::{ErrorKind, ProviderError};
use crate::factory::discovery::{DiscoveryRecord, ProviderBuilder, ProviderConfig};
use crate::factory::selection::{score_candidate, SelectionPreferences};
use crate::provider::{ChainKind, ProviderKind, SignatureProvider};
use crate::registry::ProviderRegistry;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Default per-attempt connect timeout
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Default number of connect attempts
const DEFAULT_CONNECT_RETRIES: u32 = 3;
/// Base delay between connect attempts
const CONNECT_BACKOFF_BASE_MS: u64 = 1_000;
/// Ceiling for the delay between connect attempts
const CONNECT_BACKOFF_MAX_MS: u64 = 5_000;

/// Lifecycle options for [`ProviderFactory::create_provider`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CreateOptions {
    /// Connect the provider after building it
    pub auto_connect: bool,
    /// Register the provider into the factory's registry
    pub auto_register: bool,
    /// Per-attempt connect timeout in milliseconds
    pub timeout_ms: u64,
    /// Number of connect attempts before giving up
    pub retries: u32,
}

impl CreateOptions {
    /// Build only: no connect, no registration
    pub fn detached() -> Self {
        Self {
            auto_connect: false,
            auto_register: false,
            ..Default::default()
        }
    }
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            auto_register: true,
            timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            retries: DEFAULT_CONNECT_RETRIES,
        }
    }
}

/// Builds, connects, and tracks signature providers
pub struct ProviderFactory {
    registry: Arc<ProviderRegistry>,
    builders: RwLock<Vec<Arc<dyn ProviderBuilder>>>,
    instances: RwLock<HashMap<String, Arc<dyn SignatureProvider>>>,
    discovery_cache: RwLock<HashMap<ProviderKind, DiscoveryRecord>>,
}

impl ProviderFactory {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            builders: RwLock::new(Vec::new()),
            instances: RwLock::new(HashMap::new()),
            discovery_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The registry new providers are registered into
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Add a builder, replacing any existing builder of the same kind
    pub async fn register_builder(&self, builder: Arc<dyn ProviderBuilder>) {
        let mut builders = self.builders.write().await;
        if let Some(slot) = builders.iter_mut().find(|b| b.kind() == builder.kind()) {
            log::warn!("Replacing builder for {} providers", builder.kind());
            *slot = builder;
        } else {
            log::debug!("Registered builder for {} providers", builder.kind());
            builders.push(builder);
        }
    }

    /// Builder kinds in registration order
    pub async fn builder_kinds(&self) -> Vec<ProviderKind> {
        self.builders.read().await.iter().map(|b| b.kind()).collect()
    }

    async fn builder_for(&self, kind: ProviderKind) -> Option<Arc<dyn ProviderBuilder>> {
        self.builders
            .read()
            .await
            .iter()
            .find(|b| b.kind() == kind)
            .cloned()
    }

    /// Build one provider and walk it through the requested lifecycle
    ///
    /// With `auto_connect`, connect attempts are raced against
    /// `options.timeout_ms` and retried with exponential backoff; the final
    /// failure surfaces as `ConnectionFailed` carrying the provider id.
    pub async fn create_provider(
        &self,
        config: &ProviderConfig,
        options: CreateOptions,
    ) -> Result<Arc<dyn SignatureProvider>, ProviderError> {
        let builder = self.builder_for(config.kind).await.ok_or_else(|| {
            ProviderError::new(
                ErrorKind::InvalidImplementation,
                format!("no builder registered for {} providers", config.kind),
            )
        })?;

        let provider = builder.build(config)?;
        let id = provider.id().to_string();

        if options.auto_connect {
            self.connect_with_retries(&provider, &options).await?;
        }
        if options.auto_register {
            self.registry.register(provider.clone()).await?;
        }

        self.instances.write().await.insert(id.clone(), provider.clone());
        log::info!("Created {} provider {}", config.kind, id);
        Ok(provider)
    }

    async fn connect_with_retries(
        &self,
        provider: &Arc<dyn SignatureProvider>,
        options: &CreateOptions,
    ) -> Result<(), ProviderError> {
        let attempts = options.retries.max(1);
        let mut last_error: Option<ProviderError> = None;

        for attempt in 1..=attempts {
            let result = tokio::time::timeout(
                Duration::from_millis(options.timeout_ms),
                provider.connect(),
            )
            .await;

            let error = match result {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::connection_timeout(format!(
                    "connect attempt timed out after {} ms",
                    options.timeout_ms
                ))
                .with_provider(provider.id()),
            };

            log::warn!(
                "Connect attempt {}/{} for {} failed: {}",
                attempt,
                attempts,
                provider.id(),
                error
            );
            last_error = Some(error);

            if attempt < attempts {
                let delay =
                    (CONNECT_BACKOFF_BASE_MS * 2u64.pow((attempt - 1).min(16))).min(CONNECT_BACKOFF_MAX_MS);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        let detail = last_error
            .map(|e| e.message)
            .unwrap_or_else(|| "no attempts were made".to_string());
        Err(ProviderError::connection_failed(format!(
            "failed to connect provider '{}' after {} attempt(s): {}",
            provider.id(),
            attempts,
            detail
        ))
        .with_provider(provider.id()))
    }

    /// Build several providers in one call
    ///
    /// Without `auto_connect` the batch is best-effort: failures are logged
    /// and skipped, and only a batch where every config failed errors out.
    /// With `auto_connect` the batch fails fast on the first failure.
    pub async fn create_providers(
        &self,
        configs: &[ProviderConfig],
        options: CreateOptions,
    ) -> Result<Vec<Arc<dyn SignatureProvider>>, ProviderError> {
        if options.auto_connect {
            let mut providers = Vec::with_capacity(configs.len());
            for config in configs {
                providers.push(self.create_provider(config, options).await?);
            }
            return Ok(providers);
        }

        let mut providers = Vec::new();
        for config in configs {
            match self.create_provider(config, options).await {
                Ok(provider) => providers.push(provider),
                Err(e) => log::warn!("Skipping {} provider: {}", config.kind, e),
            }
        }

        if providers.is_empty() && !configs.is_empty() {
            return Err(ProviderError::signing_failed(format!(
                "all {} provider config(s) failed to build",
                configs.len()
            )));
        }
        Ok(providers)
    }

    /// Probe every registered builder
    ///
    /// Probes run concurrently, each in its own task so a panicking probe
    /// degrades to an unavailable record instead of taking the batch down.
    /// Results are cached by kind; `use_cache` serves the cache when it
    /// covers every registered builder.
    pub async fn discover_providers(&self, use_cache: bool) -> Vec<DiscoveryRecord> {
        let builders: Vec<Arc<dyn ProviderBuilder>> = self.builders.read().await.clone();

        if use_cache {
            let cache = self.discovery_cache.read().await;
            if !builders.is_empty() && builders.iter().all(|b| cache.contains_key(&b.kind())) {
                return builders
                    .iter()
                    .filter_map(|b| cache.get(&b.kind()).cloned())
                    .collect();
            }
        }

        log::debug!("Probing {} provider builder(s)", builders.len());
        let handles: Vec<_> = builders
            .iter()
            .map(|builder| {
                let builder = builder.clone();
                tokio::spawn(async move { builder.probe().await })
            })
            .collect();

        let mut records = Vec::with_capacity(builders.len());
        for (builder, joined) in builders.iter().zip(join_all(handles).await) {
            let record = match joined {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Probe for {} providers panicked: {}", builder.kind(), e);
                    DiscoveryRecord::unavailable(builder.kind(), "probe task failed")
                }
            };
            records.push(record);
        }

        let mut cache = self.discovery_cache.write().await;
        for record in &records {
            cache.insert(record.kind, record.clone());
        }
        records
    }

    /// Drop all cached discovery results
    pub async fn clear_discovery_cache(&self) {
        self.discovery_cache.write().await.clear();
    }

    /// Build one disconnected provider per available kind supporting `chain`
    pub async fn create_providers_for_chain(
        &self,
        chain: ChainKind,
    ) -> Result<Vec<Arc<dyn SignatureProvider>>, ProviderError> {
        let candidates = self.chain_candidates(chain).await;

        let mut providers = Vec::new();
        for builder in candidates {
            let config = ProviderConfig::new(builder.kind());
            match self.create_provider(&config, CreateOptions::detached()).await {
                Ok(provider) => providers.push(provider),
                Err(e) => log::warn!(
                    "Skipping {} provider for {}: {}",
                    builder.kind(),
                    chain,
                    e
                ),
            }
        }

        if providers.is_empty() {
            return Err(ProviderError::unsupported_chain(
                format!("no available provider supports {}", chain),
                chain,
            ));
        }
        Ok(providers)
    }

    /// Pick the highest-scoring provider for a chain
    ///
    /// Candidates are built disconnected; the caller decides when to
    /// connect. Ties keep the earliest-discovered candidate.
    pub async fn get_best_provider_for_chain(
        &self,
        chain: ChainKind,
        preferences: &SelectionPreferences,
    ) -> Result<Arc<dyn SignatureProvider>, ProviderError> {
        let candidates = self.chain_candidates(chain).await;
        let mut best: Option<(u32, Arc<dyn SignatureProvider>)> = None;

        for builder in candidates {
            let config = ProviderConfig::new(builder.kind());
            let provider = match self.create_provider(&config, CreateOptions::detached()).await {
                Ok(provider) => provider,
                Err(e) => {
                    log::warn!("Skipping {} candidate: {}", builder.kind(), e);
                    continue;
                }
            };

            let score =
                score_candidate(builder.kind(), &provider.capabilities(), chain, preferences);
            log::debug!("Provider {} scored {} for {}", provider.id(), score, chain);

            // Strict comparison keeps the earliest candidate on ties
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, provider));
            }
        }

        best.map(|(_, provider)| provider).ok_or_else(|| {
            ProviderError::unsupported_chain(
                format!("no available provider supports {}", chain),
                chain,
            )
        })
    }

    /// Builders that are currently available and support `chain`,
    /// in discovery order
    async fn chain_candidates(&self, chain: ChainKind) -> Vec<Arc<dyn ProviderBuilder>> {
        let records = self.discover_providers(true).await;
        let builders = self.builders.read().await.clone();

        builders
            .into_iter()
            .filter(|builder| {
                let available = records
                    .iter()
                    .any(|r| r.kind == builder.kind() && r.available);
                available && builder.supported_chains().contains(&chain)
            })
            .collect()
    }

    /// Look up a tracked instance by id
    pub async fn get_provider(&self, id: &str) -> Option<Arc<dyn SignatureProvider>> {
        self.instances.read().await.get(id).cloned()
    }

    /// Number of instances this factory has built and still tracks
    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Disconnect and forget every tracked instance, and drop the
    /// discovery cache
    pub async fn dispose(&self) {
        let instances = {
            let mut map = self.instances.write().await;
            std::mem::take(&mut *map)
        };

        for (id, provider) in instances {
            if provider.is_connected().await {
                if let Err(e) = provider.disconnect().await {
                    log::warn!("Disconnect during dispose of {} failed: {}", id, e);
                }
            }
        }
        self.clear_discovery_cache().await;
        log::info!("Disposed provider factory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        Account, CapabilityFlags, MockBehavior, MockProvider, MockProviderBuilder,
        ProviderCapabilities, ProviderMetadata, SignRequest, SignResponse,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBuilder {
        inner: MockProviderBuilder,
        probes: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ProviderBuilder for CountingBuilder {
        fn kind(&self) -> ProviderKind {
            self.inner.kind()
        }

        fn supported_chains(&self) -> Vec<ChainKind> {
            self.inner.supported_chains()
        }

        async fn probe(&self) -> DiscoveryRecord {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.inner.probe().await
        }

        fn build(
            &self,
            config: &ProviderConfig,
        ) -> Result<Arc<dyn SignatureProvider>, ProviderError> {
            self.inner.build(config)
        }
    }

    /// Fails its first two connect attempts, then behaves like the inner mock
    #[derive(Debug)]
    struct FlakyConnectProvider {
        inner: MockProvider,
        connects: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl SignatureProvider for FlakyConnectProvider {
        fn id(&self) -> &str {
            self.inner.id()
        }

        fn metadata(&self) -> ProviderMetadata {
            self.inner.metadata()
        }

        fn capabilities(&self) -> ProviderCapabilities {
            self.inner.capabilities()
        }

        async fn connect(&self) -> Result<(), ProviderError> {
            if self.connects.fetch_add(1, Ordering::SeqCst) < 2 {
                return Err(ProviderError::connection_failed("agent not ready"));
            }
            self.inner.connect().await
        }

        async fn disconnect(&self) -> Result<(), ProviderError> {
            self.inner.disconnect().await
        }

        async fn is_connected(&self) -> bool {
            self.inner.is_connected().await
        }

        async fn get_accounts(&self, chain: ChainKind) -> Result<Vec<Account>, ProviderError> {
            self.inner.get_accounts(chain).await
        }

        async fn sign(&self, request: &SignRequest) -> Result<SignResponse, ProviderError> {
            self.inner.sign(request).await
        }
    }

    struct FlakyConnectBuilder {
        connects: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl ProviderBuilder for FlakyConnectBuilder {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Mock
        }

        fn supported_chains(&self) -> Vec<ChainKind> {
            vec![ChainKind::Ethereum]
        }

        async fn probe(&self) -> DiscoveryRecord {
            DiscoveryRecord::available(ProviderKind::Mock, "test")
        }

        fn build(
            &self,
            config: &ProviderConfig,
        ) -> Result<Arc<dyn SignatureProvider>, ProviderError> {
            let id = config.id.clone().unwrap_or_else(|| "flaky".to_string());
            Ok(Arc::new(FlakyConnectProvider {
                inner: MockProvider::new(id),
                connects: self.connects.clone(),
            }))
        }
    }

    fn factory() -> ProviderFactory {
        ProviderFactory::new(Arc::new(ProviderRegistry::new()))
    }

    #[tokio::test]
    async fn test_create_provider_connects_and_registers() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;

        let config = ProviderConfig::new(ProviderKind::Mock);
        let provider = factory
            .create_provider(&config, CreateOptions::default())
            .await
            .unwrap();

        assert!(provider.is_connected().await);
        assert!(factory.registry().has_provider(provider.id()).await);
        assert_eq!(factory.instance_count().await, 1);
        assert!(factory.get_provider(provider.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_unknown_kind_rejected() {
        let factory = factory();
        let config = ProviderConfig::new(ProviderKind::HardwareWallet);

        let err = factory
            .create_provider(&config, CreateOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidImplementation);
    }

    #[tokio::test]
    async fn test_explicit_id() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;

        let config = ProviderConfig::new(ProviderKind::Mock).with_id("primary");
        let provider = factory
            .create_provider(&config, CreateOptions::detached())
            .await
            .unwrap();

        assert_eq!(provider.id(), "primary");
        assert!(!provider.is_connected().await);
        assert_eq!(factory.registry().count().await, 0);
    }

    #[tokio::test]
    async fn test_connect_failure_after_retries() {
        let factory = factory();
        factory
            .register_builder(Arc::new(
                MockProviderBuilder::new().with_provider_behavior(MockBehavior::FailConnect),
            ))
            .await;

        let options = CreateOptions {
            retries: 2,
            ..Default::default()
        };
        let err = factory
            .create_provider(&ProviderConfig::new(ProviderKind::Mock), options)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ConnectionFailed);
        assert!(err.provider_id.is_some());
        assert!(err.message.contains("2 attempt"));
    }

    #[tokio::test]
    async fn test_connect_retry_eventually_succeeds() {
        let factory = factory();
        let connects = Arc::new(AtomicUsize::new(0));
        factory
            .register_builder(Arc::new(FlakyConnectBuilder {
                connects: connects.clone(),
            }))
            .await;

        let provider = factory
            .create_provider(
                &ProviderConfig::new(ProviderKind::Mock),
                CreateOptions::default(),
            )
            .await
            .unwrap();

        assert!(provider.is_connected().await);
        assert_eq!(connects.load(Ordering::SeqCst), 3);
        assert!(factory.registry().has_provider(provider.id()).await);
    }

    #[tokio::test]
    async fn test_connect_timeout() {
        let factory = factory();
        factory
            .register_builder(Arc::new(
                MockProviderBuilder::new().with_provider_behavior(MockBehavior::Delay(500)),
            ))
            .await;

        let options = CreateOptions {
            timeout_ms: 50,
            retries: 1,
            ..Default::default()
        };
        let err = factory
            .create_provider(&ProviderConfig::new(ProviderKind::Mock), options)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ConnectionFailed);
        assert!(err.message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_batch_best_effort_skips_failures() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;

        let configs = vec![
            ProviderConfig::new(ProviderKind::Mock),
            ProviderConfig::new(ProviderKind::HardwareWallet),
        ];
        let providers = factory
            .create_providers(&configs, CreateOptions::detached())
            .await
            .unwrap();
        assert_eq!(providers.len(), 1);

        let err = factory
            .create_providers(
                &[ProviderConfig::new(ProviderKind::HardwareWallet)],
                CreateOptions::detached(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SigningFailed);
    }

    #[tokio::test]
    async fn test_batch_fail_fast_with_auto_connect() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;

        let configs = vec![
            ProviderConfig::new(ProviderKind::HardwareWallet),
            ProviderConfig::new(ProviderKind::Mock),
        ];
        let err = factory
            .create_providers(&configs, CreateOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidImplementation);
        assert_eq!(factory.instance_count().await, 0);
    }

    #[tokio::test]
    async fn test_discovery_caches_probes() {
        let factory = factory();
        let probes = Arc::new(AtomicUsize::new(0));
        factory
            .register_builder(Arc::new(CountingBuilder {
                inner: MockProviderBuilder::new(),
                probes: probes.clone(),
            }))
            .await;

        let records = factory.discover_providers(true).await;
        assert_eq!(records.len(), 1);
        assert!(records[0].available);
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        factory.discover_providers(true).await;
        assert_eq!(probes.load(Ordering::SeqCst), 1);

        factory.discover_providers(false).await;
        assert_eq!(probes.load(Ordering::SeqCst), 2);

        factory.clear_discovery_cache().await;
        factory.discover_providers(true).await;
        assert_eq!(probes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_discovery_reports_unavailable_kinds() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;
        factory
            .register_builder(Arc::new(
                MockProviderBuilder::for_kind(ProviderKind::HardwareWallet)
                    .with_availability(false),
            ))
            .await;

        let records = factory.discover_providers(false).await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ProviderKind::Mock);
        assert!(records[0].available);
        assert_eq!(records[1].kind, ProviderKind::HardwareWallet);
        assert!(!records[1].available);
        assert!(records[1].error.is_some());
    }

    #[tokio::test]
    async fn test_create_providers_for_chain() {
        let factory = factory();
        factory
            .register_builder(Arc::new(
                MockProviderBuilder::new().with_chains(vec![ChainKind::Bitcoin]),
            ))
            .await;

        let providers = factory
            .create_providers_for_chain(ChainKind::Bitcoin)
            .await
            .unwrap();
        assert_eq!(providers.len(), 1);
        assert!(!providers[0].is_connected().await);

        let err = factory
            .create_providers_for_chain(ChainKind::Solana)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedChain);
        assert_eq!(err.chain, Some(ChainKind::Solana));
    }

    #[tokio::test]
    async fn test_best_provider_honors_preferences() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;
        factory
            .register_builder(Arc::new(MockProviderBuilder::for_kind(
                ProviderKind::HardwareWallet,
            )))
            .await;

        // Without preferences the mock wins on concurrency
        let best = factory
            .get_best_provider_for_chain(
                ChainKind::Ethereum,
                &SelectionPreferences::default(),
            )
            .await
            .unwrap();
        assert!(best.id().starts_with("mock"));

        let preferences = SelectionPreferences {
            prefer_hardware_wallet: true,
            ..Default::default()
        };
        let best = factory
            .get_best_provider_for_chain(ChainKind::Ethereum, &preferences)
            .await
            .unwrap();
        assert!(best.id().starts_with("hardware_wallet"));
    }

    #[tokio::test]
    async fn test_best_provider_tie_keeps_discovery_order() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;
        factory
            .register_builder(Arc::new(
                MockProviderBuilder::for_kind(ProviderKind::BrowserExtension)
                    .with_flags(
                        CapabilityFlags::MULTIPLE_ACCOUNTS | CapabilityFlags::MESSAGE_SIGNING,
                    )
                    .with_max_concurrent(5),
            ))
            .await;

        let best = factory
            .get_best_provider_for_chain(
                ChainKind::Ethereum,
                &SelectionPreferences::default(),
            )
            .await
            .unwrap();
        assert!(best.id().starts_with("mock"));
    }

    #[tokio::test]
    async fn test_best_provider_without_candidates() {
        let factory = factory();
        let err = factory
            .get_best_provider_for_chain(
                ChainKind::Ethereum,
                &SelectionPreferences::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnsupportedChain);
    }

    #[tokio::test]
    async fn test_dispose_disconnects_instances() {
        let factory = factory();
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;

        let provider = factory
            .create_provider(
                &ProviderConfig::new(ProviderKind::Mock),
                CreateOptions::default(),
            )
            .await
            .unwrap();
        assert!(provider.is_connected().await);

        factory.dispose().await;
        assert!(!provider.is_connected().await);
        assert_eq!(factory.instance_count().await, 0);
    }
}
