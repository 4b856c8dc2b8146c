//! Per-signer attempt state

use crate::coordinator::config::Signer;
use crate::error::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of one signature attempt
///
/// `Pending -> InProgress -> {Completed | Failed | Rejected | TimedOut}`,
/// strictly forward. Terminal states never change again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Rejected,
    TimedOut,
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AttemptStatus::Completed
                | AttemptStatus::Failed
                | AttemptStatus::Rejected
                | AttemptStatus::TimedOut
        )
    }

    fn can_transition_to(&self, next: AttemptStatus) -> bool {
        match (self, next) {
            (AttemptStatus::Pending, AttemptStatus::InProgress) => true,
            (AttemptStatus::InProgress, next) => next.is_terminal(),
            _ => false,
        }
    }
}

/// One signer's slot in a workflow
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureAttempt {
    pub signer: Signer,
    pub status: AttemptStatus,
    /// Hex signature, set on completion
    pub signature: Option<String>,
    /// Public key the provider signed with, set on completion
    pub public_key: Option<String>,
    /// Provider's signed payload, set on completion
    pub signed_payload: Option<Value>,
    /// Why the attempt ended, for failed/rejected/timed-out attempts
    pub error: Option<ProviderError>,
    pub started_at: DateTime<Utc>,
    /// Time from start to the terminal state
    pub duration_ms: Option<u64>,
}

impl SignatureAttempt {
    pub fn new(signer: Signer) -> Self {
        Self {
            signer,
            status: AttemptStatus::Pending,
            signature: None,
            public_key: None,
            signed_payload: None,
            error: None,
            started_at: Utc::now(),
            duration_ms: None,
        }
    }

    fn transition(&mut self, next: AttemptStatus) -> bool {
        if !self.status.can_transition_to(next) {
            log::warn!(
                "Ignoring illegal attempt transition {:?} -> {:?} for provider {}",
                self.status,
                next,
                self.signer.provider_id
            );
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            let elapsed = Utc::now().signed_duration_since(self.started_at);
            self.duration_ms = Some(elapsed.num_milliseconds().max(0) as u64);
        }
        true
    }

    /// Move to `InProgress` and restart the clock
    pub fn begin(&mut self) {
        if self.transition(AttemptStatus::InProgress) {
            self.started_at = Utc::now();
        }
    }

    pub fn complete(
        &mut self,
        signature: String,
        public_key: String,
        signed_payload: Option<Value>,
    ) {
        if self.transition(AttemptStatus::Completed) {
            self.signature = Some(signature);
            self.public_key = Some(public_key);
            self.signed_payload = signed_payload;
        }
    }

    pub fn fail(&mut self, error: ProviderError) {
        if self.transition(AttemptStatus::Failed) {
            self.error = Some(error);
        }
    }

    pub fn reject(&mut self, error: ProviderError) {
        if self.transition(AttemptStatus::Rejected) {
            self.error = Some(error);
        }
    }

    pub fn time_out(&mut self, error: ProviderError) {
        if self.transition(AttemptStatus::TimedOut) {
            self.error = Some(error);
        }
    }
}
