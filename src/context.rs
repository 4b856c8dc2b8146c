//! Shared service wiring
//!
//! One [`SigningContext`] per process replaces module-level singletons:
//! construct it once, clone it freely, and thread it through whatever
//! surface consumes the signing services.

use crate::coordinator::MultisigCoordinator;
use crate::factory::ProviderFactory;
use crate::provider::MockProviderBuilder;
use crate::recovery::ErrorRecovery;
use crate::registry::ProviderRegistry;
use std::sync::Arc;

/// Shared handles to the signing services
#[derive(Clone)]
pub struct SigningContext {
    pub registry: Arc<ProviderRegistry>,
    pub factory: Arc<ProviderFactory>,
    pub coordinator: Arc<MultisigCoordinator>,
    pub recovery: Arc<ErrorRecovery>,
}

impl SigningContext {
    /// Wire a fresh context
    ///
    /// The registry is shared by the factory and the coordinator, the mock
    /// builder comes pre-registered, and the recovery engine carries the
    /// default strategy set.
    pub async fn new() -> Self {
        let registry = Arc::new(ProviderRegistry::new());
        let factory = Arc::new(ProviderFactory::new(registry.clone()));
        factory
            .register_builder(Arc::new(MockProviderBuilder::new()))
            .await;
        let coordinator = Arc::new(MultisigCoordinator::new(registry.clone()));
        let recovery = Arc::new(ErrorRecovery::new());

        Self {
            registry,
            factory,
            coordinator,
            recovery,
        }
    }
}
