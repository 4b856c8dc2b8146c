//! Recovery strategy contract

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Caller-supplied state for one recovery decision
///
/// The engine itself holds no retry counters. Whoever drives the retry loop
/// owns the count and passes it in on every attempt.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RecoveryContext {
    /// Retries already attempted for this operation
    pub retry_count: u32,
    /// Caller's retry budget, if it wants to override the strategy default
    pub max_retries: Option<u32>,
    /// Provider the failing operation was routed to
    pub provider_id: Option<String>,
    /// Free-form context for custom strategies
    pub metadata: Map<String, Value>,
}

impl RecoveryContext {
    pub fn new(retry_count: u32) -> Self {
        Self {
            retry_count,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }
}

/// What a strategy decided about a failure
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    /// Whether the strategy produced an actionable path forward
    pub success: bool,
    /// Whether the caller should retry the failed operation
    pub should_retry: bool,
    /// Suggested wait before the retry, if one applies
    pub retry_after_ms: Option<u64>,
    /// User-facing steps that may clear the failure
    pub instructions: Vec<String>,
    /// Error raised while attempting recovery itself
    pub new_error: Option<ProviderError>,
}

impl RecoveryOutcome {
    /// Retry after the given delay
    pub fn retry_after(ms: u64) -> Self {
        Self {
            success: true,
            should_retry: true,
            retry_after_ms: Some(ms),
            instructions: Vec::new(),
            new_error: None,
        }
    }

    /// No way forward, stop retrying
    pub fn terminal() -> Self {
        Self {
            success: false,
            should_retry: false,
            retry_after_ms: None,
            instructions: Vec::new(),
            new_error: None,
        }
    }

    pub fn with_instructions(mut self, instructions: Vec<String>) -> Self {
        self.instructions = instructions;
        self
    }

    pub fn with_new_error(mut self, error: ProviderError) -> Self {
        self.new_error = Some(error);
        self
    }
}

/// One recovery policy for a slice of the error taxonomy
///
/// `can_recover` and `recovery_instructions` are pure queries so callers can
/// inspect a failure without acting on it. `recover` may perform real work
/// (reconnects, prompts) and is therefore async and fallible.
#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    /// Stable name, used to remove or replace the strategy
    fn name(&self) -> &str;

    /// Whether this strategy knows how to handle the error
    fn can_recover(&self, error: &ProviderError) -> bool;

    /// User-facing steps for the error, without acting on it
    fn recovery_instructions(&self, error: &ProviderError) -> Vec<String>;

    /// Decide how to proceed after the error
    async fn recover(
        &self,
        error: &ProviderError,
        context: &RecoveryContext,
    ) -> Result<RecoveryOutcome, ProviderError>;
}
