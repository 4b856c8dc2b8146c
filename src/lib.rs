//! Quorum Signer: threshold transaction signing orchestration
//!
//! This crate coordinates m-of-n signing workflows across pluggable
//! signature providers, featuring:
//! - Multi-signature coordinator with sequential and parallel execution
//! - Per-signature and whole-workflow timeouts with partial-result policy
//! - Capability-based provider registry with broadcast change events
//! - Provider factory with discovery probing, candidate scoring, and
//!   connect retries
//! - Category-based error recovery with pluggable backoff strategies
//! - ECDSA mock provider (secp256k1) for development and tests
//!
//! # Example
//!
//! ```no_run
//! use quorum_signer::{
//!     ChainKind, CreateOptions, ProviderConfig, ProviderKind, SignatureProvider,
//!     Signer, SigningContext, TransactionPayload, WorkflowConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quorum_signer::ProviderError> {
//!     let context = SigningContext::new().await;
//!
//!     // Build and connect a mock signing agent
//!     let provider = context
//!         .factory
//!         .create_provider(&ProviderConfig::new(ProviderKind::Mock), CreateOptions::default())
//!         .await?;
//!     let accounts = provider.get_accounts(ChainKind::Ethereum).await?;
//!
//!     // Run a 1-of-1 signing workflow against it
//!     let transaction = TransactionPayload::new(
//!         ChainKind::Ethereum,
//!         serde_json::json!({"to": "0xfeed", "value": 42}),
//!     );
//!     let signers = vec![Signer::new(provider.id(), accounts[0].address.clone())];
//!     let workflow = context
//!         .coordinator
//!         .start_workflow(transaction, signers, WorkflowConfig::new(1, 1))
//!         .await?;
//!
//!     println!("workflow {} ended {:?}", workflow.id, workflow.status);
//!     Ok(())
//! }
//! ```

pub mod context;
pub mod coordinator;
pub mod error;
pub mod factory;
pub mod provider;
pub mod recovery;
pub mod registry;

// Re-export commonly used types
pub use context::SigningContext;
pub use coordinator::{
    AttemptStatus, MultisigCoordinator, SignatureAttempt, Signer, SigningProgress, Workflow,
    WorkflowConfig, WorkflowEvent, WorkflowStatus,
};
pub use error::{ErrorCategory, ErrorKind, ProviderError};
pub use factory::{
    CreateOptions, DiscoveryRecord, ProviderBuilder, ProviderConfig, ProviderFactory,
    SelectionPreferences,
};
pub use provider::{
    Account, CapabilityFlags, ChainKind, MockBehavior, MockProvider, MockProviderBuilder,
    ProviderCapabilities, ProviderKind, ProviderMetadata, SignRequest, SignResponse,
    SignatureProvider, TransactionPayload,
};
pub use recovery::{ErrorRecovery, RecoveryContext, RecoveryOutcome, RecoveryStrategy};
pub use registry::{ProviderRegistry, RegistryEvent};
