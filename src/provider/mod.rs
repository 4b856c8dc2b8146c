//! Signature provider contract and capability model
//!
//! A provider is one signing agent (hardware wallet, browser extension, or
//! in-process software signer) behind the [`SignatureProvider`] trait. The
//! contract is capability-driven: callers inspect [`ProviderCapabilities`]
//! to learn which chains an agent signs for and which optional features it
//! carries, instead of branching on the concrete type.
//!
//! # Example
//!
//! ```ignore
//! use quorum_signer::provider::{MockProvider, SignatureProvider, ChainKind};
//!
//! let provider = MockProvider::new("mock-1");
//! provider.connect().await?;
//!
//! let accounts = provider.get_accounts(ChainKind::Ethereum).await?;
//! let request = SignRequest::new(transaction, &accounts[0].address);
//! let response = provider.sign(&request).await?;
//! ```

pub mod capabilities;
pub mod contract;
pub mod mock;

pub use capabilities::{
    Account, CapabilityFlags, ChainKind, ProviderCapabilities, ProviderKind, ProviderMetadata,
};
pub use contract::{
    MessageSignRequest, SignRequest, SignResponse, SignatureProvider, TransactionPayload,
};
pub use mock::{MockBehavior, MockProvider, MockProviderBuilder};
