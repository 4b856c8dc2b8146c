//! Provider construction and discovery
//!
//! The factory owns the map from provider kind to [`ProviderBuilder`] and
//! everything that follows from it: building configured instances, the
//! connect/retry lifecycle, probing which agent kinds are reachable, and
//! scoring candidates when a caller just wants the best signer for a chain.
//!
//! # Example
//!
//! ```ignore
//! use quorum_signer::factory::{ProviderFactory, ProviderConfig, CreateOptions};
//! use quorum_signer::provider::{MockProviderBuilder, ProviderKind};
//!
//! let factory = ProviderFactory::new(registry);
//! factory.register_builder(Arc::new(MockProviderBuilder::new())).await;
//!
//! let provider = factory
//!     .create_provider(&ProviderConfig::new(ProviderKind::Mock), CreateOptions::default())
//!     .await?;
//! ```

pub mod discovery;
pub mod factory;
pub mod selection;

pub use discovery::{DiscoveryRecord, ProviderBuilder, ProviderConfig};
pub use factory::{CreateOptions, ProviderFactory};
pub use selection::SelectionPreferences;
