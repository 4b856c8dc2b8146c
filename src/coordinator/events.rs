//! Workflow lifecycle events

use crate::coordinator::workflow::WorkflowStatus;
use crate::error::ProviderError;
use serde::{Deserialize, Serialize};

/// Events buffered per subscriber before the oldest are dropped
pub const WORKFLOW_EVENT_CAPACITY: usize = 256;

/// Emitted as a workflow and its signature attempts move through their
/// lifecycles
///
/// Delivery matches the registry events: broadcast fan-out, one isolated
/// receiver per subscriber, events in emission order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WorkflowEvent {
    WorkflowStarted {
        workflow_id: String,
        required_signatures: u32,
        total_signers: u32,
    },
    SignatureStarted {
        workflow_id: String,
        signer_index: usize,
        provider_id: String,
    },
    SignatureCompleted {
        workflow_id: String,
        signer_index: usize,
        provider_id: String,
        completed: u32,
    },
    SignatureFailed {
        workflow_id: String,
        signer_index: usize,
        provider_id: String,
        error: ProviderError,
    },
    SignatureRejected {
        workflow_id: String,
        signer_index: usize,
        provider_id: String,
    },
    SignatureTimedOut {
        workflow_id: String,
        signer_index: usize,
        provider_id: String,
        timeout_ms: u64,
    },
    /// Emitted exactly once, when the threshold is first reached
    ThresholdMet {
        workflow_id: String,
        completed: u32,
        required: u32,
    },
    /// Terminal event for `Completed` and `Partial` workflows
    WorkflowCompleted {
        workflow_id: String,
        status: WorkflowStatus,
        completed: u32,
    },
    /// Terminal event for failed and cancelled workflows
    WorkflowFailed {
        workflow_id: String,
        error: ProviderError,
    },
}

impl WorkflowEvent {
    /// Id of the workflow the event belongs to
    pub fn workflow_id(&self) -> &str {
        match self {
            WorkflowEvent::WorkflowStarted { workflow_id, .. }
            | WorkflowEvent::SignatureStarted { workflow_id, .. }
            | WorkflowEvent::SignatureCompleted { workflow_id, .. }
            | WorkflowEvent::SignatureFailed { workflow_id, .. }
            | WorkflowEvent::SignatureRejected { workflow_id, .. }
            | WorkflowEvent::SignatureTimedOut { workflow_id, .. }
            | WorkflowEvent::ThresholdMet { workflow_id, .. }
            | WorkflowEvent::WorkflowCompleted { workflow_id, .. }
            | WorkflowEvent::WorkflowFailed { workflow_id, .. } => workflow_id,
        }
    }
}
