//! Workflow configuration

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Per-signature timeout applied when the config leaves it unset
pub const DEFAULT_SIGNATURE_TIMEOUT_MS: u64 = 30_000;

/// One expected signer in a threshold workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signer {
    /// Registry id of the provider that signs for this slot
    pub provider_id: String,
    /// Account the provider must sign with
    pub account_address: String,
    /// Expected public key, when the caller knows it up front
    pub public_key: Option<String>,
    /// Whether the workflow may abort when this signer fails
    pub required: bool,
    /// Relative weight, carried for weighted threshold schemes
    pub weight: Option<u32>,
    /// Per-signer metadata merged into the signing request
    pub metadata: Map<String, Value>,
}

impl Signer {
    pub fn new(provider_id: impl Into<String>, account_address: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            account_address: account_address.into(),
            public_key: None,
            required: false,
            weight: None,
            metadata: Map::new(),
        }
    }

    /// Mark this signer as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// How a threshold workflow runs
///
/// `required_signatures` of `total_signers` must complete for the workflow
/// to succeed. The remaining fields shape execution: sequential vs
/// parallel, per-signature and overall deadlines, and what happens when a
/// signer fails or the threshold falls short.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Signatures needed for the workflow to succeed (m in m-of-n)
    pub required_signatures: u32,
    /// Number of signers addressed by the workflow (n in m-of-n)
    pub total_signers: u32,
    /// Deadline for each individual signature attempt
    pub signature_timeout_ms: Option<u64>,
    /// Deadline for the whole signature collection phase
    pub total_timeout_ms: Option<u64>,
    /// End in `Partial` instead of failing when the threshold is not met
    pub allow_partial_signing: bool,
    /// Ask signers one at a time instead of all at once
    pub require_sequential_signing: bool,
    /// Keep going when a required signer fails
    pub continue_on_error: bool,
    /// Human-readable label for logs and UIs
    pub description: Option<String>,
    /// Workflow-level metadata merged into every signing request
    pub metadata: Map<String, Value>,
}

impl WorkflowConfig {
    pub fn new(required_signatures: u32, total_signers: u32) -> Self {
        Self {
            required_signatures,
            total_signers,
            signature_timeout_ms: None,
            total_timeout_ms: None,
            allow_partial_signing: false,
            require_sequential_signing: false,
            continue_on_error: false,
            description: None,
            metadata: Map::new(),
        }
    }

    /// Effective per-signature timeout
    pub fn signature_timeout(&self) -> u64 {
        self.signature_timeout_ms
            .unwrap_or(DEFAULT_SIGNATURE_TIMEOUT_MS)
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new(1, 1)
    }
}
