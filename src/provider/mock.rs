//! In-process software signing agent
//!
//! [`MockProvider`] is the crate's reference implementation of the
//! capability contract and the workhorse of the test suite. It produces
//! real secp256k1 ECDSA signatures over SHA-256 digests of the request,
//! with Bitcoin-style Base58Check addresses, and its behavior can be
//! scripted per instance (fail, reject, delay) to drive every coordinator
//! branch without a physical device.

use crate::error::{ErrorKind, ProviderError};
use crate::factory::{DiscoveryRecord, ProviderBuilder, ProviderConfig};
use crate::provider::capabilities::{
    Account, CapabilityFlags, ChainKind, ProviderCapabilities, ProviderKind, ProviderMetadata,
};
use crate::provider::contract::{
    MessageSignRequest, SignRequest, SignResponse, SignatureProvider,
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use ripemd::Ripemd160;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// How a mock instance responds to calls
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockBehavior {
    /// Connect and sign normally
    Succeed,
    /// Fail every `connect` attempt
    FailConnect,
    /// Fail every `sign` call with a generic signing error
    FailSigning,
    /// Fail every `sign` call with a user rejection
    RejectSigning,
    /// Sleep this many milliseconds before completing connects and signs
    Delay(u64),
}

/// One secp256k1 signing account held by the mock
#[derive(Debug)]
struct SigningAccount {
    secret_key: SecretKey,
    public_key: PublicKey,
    address: String,
}

impl SigningAccount {
    fn generate(secp: &Secp256k1<secp256k1::All>) -> Self {
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        let address = derive_address(&public_key);
        Self {
            secret_key,
            public_key,
            address,
        }
    }

    fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }
}

/// Derive a Base58Check address from a public key
///
/// Address = Base58Check(0x00 || RIPEMD160(SHA256(pubkey)))
fn derive_address(public_key: &PublicKey) -> String {
    let sha = Sha256::digest(public_key.serialize());
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha);
    let ripemd_hash = ripemd.finalize();

    let mut address_bytes = vec![0x00];
    address_bytes.extend_from_slice(&ripemd_hash);

    // Checksum: first 4 bytes of double SHA-256
    let checksum = Sha256::digest(Sha256::digest(&address_bytes));
    address_bytes.extend_from_slice(&checksum[..4]);

    bs58::encode(address_bytes).into_string()
}

/// A scriptable in-process signing agent
#[derive(Debug)]
pub struct MockProvider {
    id: String,
    metadata: ProviderMetadata,
    capabilities: ProviderCapabilities,
    accounts: Vec<SigningAccount>,
    connected: RwLock<bool>,
    behavior: RwLock<MockBehavior>,
    last_request: RwLock<Option<SignRequest>>,
}

impl MockProvider {
    /// Create a mock provider with two accounts, every chain enabled, and
    /// `Succeed` behavior
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_config(
            id,
            vec![ChainKind::Bitcoin, ChainKind::Ethereum, ChainKind::Solana],
            CapabilityFlags::MULTIPLE_ACCOUNTS | CapabilityFlags::MESSAGE_SIGNING,
            5,
            2,
        )
    }

    /// Create a mock provider with explicit capabilities
    pub fn with_config(
        id: impl Into<String>,
        chains: Vec<ChainKind>,
        flags: CapabilityFlags,
        max_concurrent: u8,
        account_count: usize,
    ) -> Self {
        let secp = Secp256k1::new();
        let accounts = (0..account_count.max(1))
            .map(|_| SigningAccount::generate(&secp))
            .collect();

        Self {
            id: id.into(),
            metadata: ProviderMetadata::new(
                "Mock Signer",
                env!("CARGO_PKG_VERSION"),
                "In-process software signing agent",
            ),
            capabilities: ProviderCapabilities::new(chains, flags, max_concurrent),
            accounts,
            connected: RwLock::new(false),
            behavior: RwLock::new(MockBehavior::Succeed),
            last_request: RwLock::new(None),
        }
    }

    /// Script this instance's behavior
    pub fn with_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = RwLock::new(behavior);
        self
    }

    /// Switch behavior at runtime
    pub async fn set_behavior(&self, behavior: MockBehavior) {
        *self.behavior.write().await = behavior;
    }

    /// Address of the first account (tests address signers through this)
    pub fn default_address(&self) -> &str {
        &self.accounts[0].address
    }

    /// Hex public key of the first account
    pub fn default_public_key(&self) -> String {
        self.accounts[0].public_key_hex()
    }

    /// The last request routed through `sign`, for request-shape assertions
    pub async fn last_request(&self) -> Option<SignRequest> {
        self.last_request.read().await.clone()
    }

    fn account(&self, address: &str) -> Option<&SigningAccount> {
        self.accounts.iter().find(|a| a.address == address)
    }

    fn sign_digest(
        &self,
        account: &SigningAccount,
        digest: &[u8],
    ) -> Result<String, ProviderError> {
        let secp = Secp256k1::new();
        let message = Message::from_digest_slice(digest).map_err(|e| {
            ProviderError::signing_failed(format!("invalid message digest: {}", e))
                .with_provider(&self.id)
        })?;
        let signature = secp.sign_ecdsa(&message, &account.secret_key);
        Ok(hex::encode(signature.serialize_compact()))
    }

    async fn apply_signing_behavior(&self) -> Result<(), ProviderError> {
        let behavior = *self.behavior.read().await;
        match behavior {
            MockBehavior::FailSigning => Err(ProviderError::signing_failed(
                "mock provider scripted to fail signing",
            )
            .with_provider(&self.id)),
            MockBehavior::RejectSigning => Err(ProviderError::user_rejected(
                "user declined the signature request",
            )
            .with_provider(&self.id)),
            MockBehavior::Delay(ms) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(())
            }
            MockBehavior::Succeed | MockBehavior::FailConnect => Ok(()),
        }
    }
}

#[async_trait]
impl SignatureProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> ProviderMetadata {
        self.metadata.clone()
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities.clone()
    }

    async fn connect(&self) -> Result<(), ProviderError> {
        match *self.behavior.read().await {
            MockBehavior::FailConnect => {
                return Err(ProviderError::connection_failed(
                    "mock provider scripted to refuse connections",
                )
                .with_provider(&self.id));
            }
            MockBehavior::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
            _ => {}
        }
        *self.connected.write().await = true;
        log::debug!("Mock provider {} connected", self.id);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        *self.connected.write().await = false;
        log::debug!("Mock provider {} disconnected", self.id);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    async fn get_accounts(&self, chain: ChainKind) -> Result<Vec<Account>, ProviderError> {
        if !self.capabilities.supports_chain(chain) {
            return Err(ProviderError::unsupported_chain(
                format!("provider '{}' cannot sign for {}", self.id, chain),
                chain,
            )
            .with_provider(&self.id));
        }

        Ok(self
            .accounts
            .iter()
            .map(|a| Account::new(&a.address, chain).with_public_key(a.public_key_hex()))
            .collect())
    }

    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, ProviderError> {
        *self.last_request.write().await = Some(request.clone());

        if !*self.connected.read().await {
            return Err(
                ProviderError::connection_failed("provider is not connected")
                    .with_provider(&self.id),
            );
        }

        if !self.capabilities.supports_chain(request.transaction.chain) {
            return Err(ProviderError::unsupported_chain(
                format!(
                    "provider '{}' cannot sign for {}",
                    self.id, request.transaction.chain
                ),
                request.transaction.chain,
            )
            .with_provider(&self.id));
        }

        self.apply_signing_behavior().await?;

        let account = self.account(&request.account_address).ok_or_else(|| {
            ProviderError::invalid_transaction(format!(
                "account {} is not held by provider '{}'",
                request.account_address, self.id
            ))
            .with_provider(&self.id)
        })?;

        let encoded = serde_json::to_vec(&request.transaction).map_err(|e| {
            ProviderError::signing_failed(format!("transaction payload not serializable: {}", e))
                .with_provider(&self.id)
        })?;
        let digest = Sha256::digest(&encoded);
        let signature = self.sign_digest(account, &digest)?;

        let signed_payload = json!({
            "chain": request.transaction.chain,
            "payload": request.transaction.payload,
            "signature": signature,
            "signedBy": account.address,
        });

        Ok(SignResponse {
            signature,
            public_key: account.public_key_hex(),
            signed_payload: Some(signed_payload),
            metadata: None,
        })
    }

    async fn sign_message(
        &self,
        request: &MessageSignRequest,
    ) -> Result<SignResponse, ProviderError> {
        if !self.capabilities.supports_message_signing() {
            return Err(ProviderError::new(
                ErrorKind::UnsupportedOperation,
                format!("provider '{}' does not support message signing", self.id),
            )
            .with_provider(&self.id));
        }

        if !*self.connected.read().await {
            return Err(
                ProviderError::connection_failed("provider is not connected")
                    .with_provider(&self.id),
            );
        }

        self.apply_signing_behavior().await?;

        let account = self.account(&request.account_address).ok_or_else(|| {
            ProviderError::invalid_transaction(format!(
                "account {} is not held by provider '{}'",
                request.account_address, self.id
            ))
            .with_provider(&self.id)
        })?;

        let digest = Sha256::digest(request.message.as_bytes());
        let signature = self.sign_digest(account, &digest)?;

        Ok(SignResponse {
            signature,
            public_key: account.public_key_hex(),
            signed_payload: None,
            metadata: None,
        })
    }
}

/// Factory builder producing [`MockProvider`] instances.
///
/// The reported kind and capabilities are configurable, so tests can stand
/// this builder in for hardware or browser-extension agents when exercising
/// discovery and scoring.
pub struct MockProviderBuilder {
    kind: ProviderKind,
    chains: Vec<ChainKind>,
    flags: CapabilityFlags,
    max_concurrent: u8,
    available: bool,
    behavior: MockBehavior,
}

impl MockProviderBuilder {
    /// Mock-kind builder supporting every chain
    pub fn new() -> Self {
        Self {
            kind: ProviderKind::Mock,
            chains: vec![ChainKind::Bitcoin, ChainKind::Ethereum, ChainKind::Solana],
            flags: CapabilityFlags::MULTIPLE_ACCOUNTS | CapabilityFlags::MESSAGE_SIGNING,
            max_concurrent: 5,
            available: true,
            behavior: MockBehavior::Succeed,
        }
    }

    /// Stand in for a different provider kind
    pub fn for_kind(kind: ProviderKind) -> Self {
        let mut builder = Self::new();
        builder.kind = kind;
        if kind == ProviderKind::HardwareWallet {
            builder.flags = CapabilityFlags::USER_INTERACTION;
            builder.max_concurrent = 1;
        }
        builder
    }

    /// Restrict the supported chains
    pub fn with_chains(mut self, chains: Vec<ChainKind>) -> Self {
        self.chains = chains;
        self
    }

    /// Override the capability flags
    pub fn with_flags(mut self, flags: CapabilityFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Override the advisory concurrency limit
    pub fn with_max_concurrent(mut self, max_concurrent: u8) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Script the discovery probe result
    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Script the behavior of every provider this builder produces
    pub fn with_provider_behavior(mut self, behavior: MockBehavior) -> Self {
        self.behavior = behavior;
        self
    }
}

impl Default for MockProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBuilder for MockProviderBuilder {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn supported_chains(&self) -> Vec<ChainKind> {
        self.chains.clone()
    }

    async fn probe(&self) -> DiscoveryRecord {
        if self.available {
            DiscoveryRecord::available(self.kind, env!("CARGO_PKG_VERSION"))
        } else {
            DiscoveryRecord::unavailable(self.kind, "mock agent scripted as unavailable")
        }
    }

    fn build(&self, config: &ProviderConfig) -> Result<Arc<dyn SignatureProvider>, ProviderError> {
        let id = config
            .id
            .clone()
            .unwrap_or_else(|| format!("{}-{:08x}", self.kind, rand::random::<u32>()));

        Ok(Arc::new(
            MockProvider::with_config(id, self.chains.clone(), self.flags, self.max_concurrent, 2)
                .with_behavior(self.behavior),
        ))
    }
}
