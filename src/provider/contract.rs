//! The capability contract every signing agent satisfies
//!
//! [`SignatureProvider`] is the seam between the orchestration core and
//! concrete signing agents (hardware wallets, browser extensions, software
//! mocks). The core only ever drives providers through this trait; the
//! payload inside a [`TransactionPayload`] is opaque and passed through
//! untouched.

use crate::error::{ErrorKind, ProviderError};
use crate::provider::capabilities::{Account, ChainKind, ProviderCapabilities, ProviderMetadata};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Chain-tagged opaque transaction data
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionPayload {
    /// Which chain the payload is destined for
    pub chain: ChainKind,
    /// Chain-specific transaction body; never inspected by the core
    pub payload: Value,
}

impl TransactionPayload {
    /// Create a chain-tagged payload
    pub fn new(chain: ChainKind, payload: Value) -> Self {
        Self { chain, payload }
    }
}

/// One signing request routed to a provider
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignRequest {
    /// The transaction to sign
    pub transaction: TransactionPayload,
    /// Address of the account that must sign
    pub account_address: String,
    /// Request metadata; the coordinator stamps workflow context here
    pub metadata: Map<String, Value>,
}

impl SignRequest {
    /// Create a signing request with empty metadata
    pub fn new(transaction: TransactionPayload, account_address: impl Into<String>) -> Self {
        Self {
            transaction,
            account_address: account_address.into(),
            metadata: Map::new(),
        }
    }
}

/// A provider's successful signing output
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignResponse {
    /// Hex-encoded signature
    pub signature: String,
    /// Hex-encoded public key of the signing account
    pub public_key: String,
    /// The payload with the provider's signature applied, when the agent
    /// returns one
    pub signed_payload: Option<Value>,
    /// Provider-specific extras
    pub metadata: Option<Value>,
}

/// A free-form message signing request (optional capability)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageSignRequest {
    /// The message bytes to sign, UTF-8
    pub message: String,
    /// Address of the account that must sign
    pub account_address: String,
    /// Chain whose signature format applies
    pub chain: ChainKind,
}

/// The contract every signing agent exposes.
///
/// Implementations must be cheap to share (`Arc<dyn SignatureProvider>`)
/// and single-flight per call; `max_concurrent_signatures` in the
/// capability descriptor is advisory, not enforced here.
#[async_trait]
pub trait SignatureProvider: Send + Sync + std::fmt::Debug {
    /// Unique provider id (stable across reconnects)
    fn id(&self) -> &str;

    /// Identifying metadata
    fn metadata(&self) -> ProviderMetadata;

    /// What this provider can do
    fn capabilities(&self) -> ProviderCapabilities;

    /// Establish a session with the signing agent
    async fn connect(&self) -> Result<(), ProviderError>;

    /// Tear the session down
    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Whether a session is currently established
    async fn is_connected(&self) -> bool;

    /// Accounts available for `chain`
    async fn get_accounts(&self, chain: ChainKind) -> Result<Vec<Account>, ProviderError>;

    /// Sign a transaction with the requested account
    async fn sign(&self, request: &SignRequest) -> Result<SignResponse, ProviderError>;

    /// Sign a free-form message. Providers that do not advertise
    /// `MESSAGE_SIGNING` keep this default.
    async fn sign_message(
        &self,
        request: &MessageSignRequest,
    ) -> Result<SignResponse, ProviderError> {
        let _ = request;
        Err(ProviderError::new(
            ErrorKind::UnsupportedOperation,
            format!("provider '{}' does not support message signing", self.id()),
        )
        .with_provider(self.id()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_roundtrip() {
        let tx = TransactionPayload::new(ChainKind::Ethereum, json!({"to": "0xabc", "value": 1}));
        let mut request = SignRequest::new(tx, "0xfeed");
        request
            .metadata
            .insert("workflowId".to_string(), json!("wf-1"));

        let encoded = serde_json::to_string(&request).unwrap();
        let decoded: SignRequest = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.account_address, "0xfeed");
        assert_eq!(decoded.transaction.chain, ChainKind::Ethereum);
        assert_eq!(decoded.metadata.get("workflowId"), Some(&json!("wf-1")));
        // The opaque payload survives untouched
        assert_eq!(decoded.transaction.payload["to"], "0xabc");
    }
}
