//! Capability descriptors for signing providers
//!
//! Providers advertise which chains they can sign for, which optional
//! features they carry, and how many signatures they can service at once.
//! The coordinator and factory only ever reason about providers through
//! these descriptors.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chains a provider can produce signatures for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainKind {
    Bitcoin,
    Ethereum,
    Solana,
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainKind::Bitcoin => "bitcoin",
            ChainKind::Ethereum => "ethereum",
            ChainKind::Solana => "solana",
        };
        write!(f, "{}", name)
    }
}

/// The class of signing agent behind a provider
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Physical signing device (USB/BLE hardware wallet)
    HardwareWallet,
    /// In-browser wallet extension
    BrowserExtension,
    /// In-process software signer (tests, development)
    Mock,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::HardwareWallet => "hardware_wallet",
            ProviderKind::BrowserExtension => "browser_extension",
            ProviderKind::Mock => "mock",
        };
        write!(f, "{}", name)
    }
}

bitflags! {
    /// Optional features a provider may advertise
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CapabilityFlags: u8 {
        /// Provider exposes more than one signing account
        const MULTIPLE_ACCOUNTS = 0b0000_0001;
        /// Signing blocks on a physical confirmation from the user
        const USER_INTERACTION = 0b0000_0010;
        /// Provider implements free-form message signing
        const MESSAGE_SIGNING = 0b0000_0100;
    }
}

/// Identifying metadata every provider must carry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Human-readable provider name
    pub name: String,
    /// Implementation version
    pub version: String,
    /// Short description of the signing agent
    pub description: String,
}

impl ProviderMetadata {
    /// Create provider metadata
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: description.into(),
        }
    }
}

/// What a provider can do
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Chains this provider can sign for
    pub supported_chains: Vec<ChainKind>,
    /// Optional feature flags
    pub flags: CapabilityFlags,
    /// How many signatures the agent can service concurrently (advisory;
    /// hardware wallets report 1)
    pub max_concurrent_signatures: u8,
    /// Free-form extra capability data
    pub metadata: Option<serde_json::Value>,
}

impl ProviderCapabilities {
    /// Create a capability descriptor
    pub fn new(supported_chains: Vec<ChainKind>, flags: CapabilityFlags, max_concurrent: u8) -> Self {
        Self {
            supported_chains,
            flags,
            max_concurrent_signatures: max_concurrent,
            metadata: None,
        }
    }

    /// Attach extra capability metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Whether this provider can sign for `chain`
    pub fn supports_chain(&self, chain: ChainKind) -> bool {
        self.supported_chains.contains(&chain)
    }

    /// Whether this provider can sign for every chain in `chains`
    pub fn supports_all_chains(&self, chains: &[ChainKind]) -> bool {
        chains.iter().all(|c| self.supported_chains.contains(c))
    }

    /// Whether signing requires a physical user confirmation
    pub fn requires_user_interaction(&self) -> bool {
        self.flags.contains(CapabilityFlags::USER_INTERACTION)
    }

    /// Whether the provider implements message signing
    pub fn supports_message_signing(&self) -> bool {
        self.flags.contains(CapabilityFlags::MESSAGE_SIGNING)
    }
}

/// One signing account exposed by a provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Chain-formatted account address
    pub address: String,
    /// Hex-encoded public key, when the agent exposes it
    pub public_key: Option<String>,
    /// Chain the account belongs to
    pub chain: ChainKind,
    /// BIP-style derivation path, for agents that derive accounts
    pub derivation_path: Option<String>,
}

impl Account {
    /// Create an account record
    pub fn new(address: impl Into<String>, chain: ChainKind) -> Self {
        Self {
            address: address.into(),
            public_key: None,
            chain,
            derivation_path: None,
        }
    }

    /// Attach the account's public key
    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_support() {
        let caps = ProviderCapabilities::new(
            vec![ChainKind::Bitcoin, ChainKind::Ethereum],
            CapabilityFlags::MULTIPLE_ACCOUNTS,
            3,
        );

        assert!(caps.supports_chain(ChainKind::Bitcoin));
        assert!(!caps.supports_chain(ChainKind::Solana));
        assert!(caps.supports_all_chains(&[ChainKind::Bitcoin, ChainKind::Ethereum]));
        assert!(!caps.supports_all_chains(&[ChainKind::Bitcoin, ChainKind::Solana]));
    }

    #[test]
    fn test_capability_flags() {
        let caps = ProviderCapabilities::new(
            vec![ChainKind::Ethereum],
            CapabilityFlags::USER_INTERACTION | CapabilityFlags::MESSAGE_SIGNING,
            1,
        );

        assert!(caps.requires_user_interaction());
        assert!(caps.supports_message_signing());
        assert!(!caps.flags.contains(CapabilityFlags::MULTIPLE_ACCOUNTS));
    }

    #[test]
    fn test_chain_display() {
        assert_eq!(ChainKind::Bitcoin.to_string(), "bitcoin");
        assert_eq!(ChainKind::Solana.to_string(), "solana");
        assert_eq!(ProviderKind::HardwareWallet.to_string(), "hardware_wallet");
    }
}
