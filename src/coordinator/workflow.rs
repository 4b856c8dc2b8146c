//! Workflow state

use crate::coordinator::attempt::{AttemptStatus, SignatureAttempt};
use crate::coordinator::config::{Signer, WorkflowConfig};
use crate::provider::TransactionPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Hex characters kept from the id digest
const WORKFLOW_ID_LEN: usize = 16;

/// Overall state of a threshold workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    /// Threshold met, combined artifact available
    Completed,
    /// Threshold missed but partial results were accepted
    Partial,
    Failed,
    Cancelled,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WorkflowStatus::InProgress)
    }
}

/// Progress snapshot for a workflow
///
/// `percentage` is completed over required, so over-collection past the
/// threshold reads as more than 100.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningProgress {
    pub completed: u32,
    pub required: u32,
    pub total: u32,
    pub percentage: u32,
}

/// One threshold signing run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub config: WorkflowConfig,
    pub transaction: TransactionPayload,
    /// One slot per signer, in signer order
    pub attempts: Vec<SignatureAttempt>,
    /// Merged signed payload, set when the workflow completes
    pub combined_artifact: Option<Value>,
    pub status: WorkflowStatus,
    /// Whether the threshold has been reached
    pub required_met: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Workflow {
    pub fn new(
        transaction: TransactionPayload,
        signers: Vec<Signer>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            id: generate_workflow_id(&transaction),
            config,
            transaction,
            attempts: signers.into_iter().map(SignatureAttempt::new).collect(),
            combined_artifact: None,
            status: WorkflowStatus::InProgress,
            required_met: false,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Number of completed signature attempts
    pub fn completed_count(&self) -> u32 {
        self.attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed)
            .count() as u32
    }

    pub fn is_threshold_met(&self) -> bool {
        self.completed_count() >= self.config.required_signatures
    }

    pub fn progress(&self) -> SigningProgress {
        let completed = self.completed_count();
        let required = self.config.required_signatures;
        SigningProgress {
            completed,
            required,
            total: self.config.total_signers,
            percentage: if required == 0 {
                0
            } else {
                completed * 100 / required
            },
        }
    }

    /// Merge the completed signatures into one artifact
    ///
    /// The first completed attempt's signed payload is the base (falling
    /// back to the raw transaction), with a `multiSignature` block listing
    /// every collected signature.
    pub fn build_artifact(&self) -> Option<Value> {
        let completed: Vec<&SignatureAttempt> = self
            .attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Completed)
            .collect();
        let first = completed.first()?;

        let signatures: Vec<Value> = completed
            .iter()
            .map(|a| {
                json!({
                    "signature": a.signature,
                    "publicKey": a.public_key,
                    "providerId": a.signer.provider_id,
                })
            })
            .collect();
        let summary = json!({
            "signatures": signatures,
            "threshold": self.config.required_signatures,
            "totalSigners": self.config.total_signers,
        });

        let mut artifact = first.signed_payload.clone().unwrap_or_else(|| {
            json!({
                "chain": self.transaction.chain,
                "payload": self.transaction.payload,
            })
        });

        match artifact {
            Value::Object(ref mut map) => {
                map.insert("multiSignature".to_string(), summary);
            }
            other => {
                artifact = json!({
                    "payload": other,
                    "multiSignature": summary,
                });
            }
        }
        Some(artifact)
    }
}

/// Derive a workflow id from the transaction and the current time
fn generate_workflow_id(transaction: &TransactionPayload) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let seed = format!("{}:{}:{}", transaction.chain, transaction.payload, nanos);
    let digest = Sha256::digest(seed.as_bytes());
    hex::encode(digest)[..WORKFLOW_ID_LEN].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChainKind;

    fn workflow(required: u32, total: u32) -> Workflow {
        let signers = (0..total)
            .map(|i| Signer::new(format!("mock-{}", i), format!("addr-{}", i)))
            .collect();
        Workflow::new(
            TransactionPayload::new(ChainKind::Ethereum, json!({"nonce": 7})),
            signers,
            WorkflowConfig::new(required, total),
        )
    }

    fn complete_attempt(workflow: &mut Workflow, index: usize) {
        workflow.attempts[index].begin();
        workflow.attempts[index].complete(
            format!("sig-{}", index),
            format!("pk-{}", index),
            Some(json!({"signed": index})),
        );
    }

    #[test]
    fn test_workflow_ids_are_unique_hex() {
        let a = workflow(1, 1);
        let b = workflow(1, 1);
        assert_eq!(a.id.len(), WORKFLOW_ID_LEN);
        assert!(a.id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_threshold_and_progress() {
        let mut wf = workflow(2, 3);
        assert!(!wf.is_threshold_met());
        assert_eq!(wf.progress().percentage, 0);

        complete_attempt(&mut wf, 0);
        assert_eq!(wf.progress().percentage, 50);
        assert!(!wf.is_threshold_met());

        complete_attempt(&mut wf, 1);
        assert!(wf.is_threshold_met());
        assert_eq!(wf.progress().percentage, 100);

        // Collecting past the threshold pushes the percentage over 100
        complete_attempt(&mut wf, 2);
        assert_eq!(wf.progress().percentage, 150);
        assert_eq!(
            wf.progress(),
            SigningProgress {
                completed: 3,
                required: 2,
                total: 3,
                percentage: 150
            }
        );
    }

    #[test]
    fn test_artifact_lists_every_signature() {
        let mut wf = workflow(2, 3);
        complete_attempt(&mut wf, 0);
        complete_attempt(&mut wf, 2);

        let artifact = wf.build_artifact().unwrap();
        assert_eq!(artifact["signed"], 0);

        let summary = &artifact["multiSignature"];
        assert_eq!(summary["threshold"], 2);
        assert_eq!(summary["totalSigners"], 3);
        let signatures = summary["signatures"].as_array().unwrap();
        assert_eq!(signatures.len(), 2);
        assert_eq!(signatures[0]["signature"], "sig-0");
        assert_eq!(signatures[0]["publicKey"], "pk-0");
        assert_eq!(signatures[0]["providerId"], "mock-0");
        assert_eq!(signatures[1]["providerId"], "mock-2");
    }

    #[test]
    fn test_artifact_without_completions() {
        let wf = workflow(2, 3);
        assert!(wf.build_artifact().is_none());
    }

    #[test]
    fn test_artifact_falls_back_to_transaction() {
        let mut wf = workflow(1, 1);
        wf.attempts[0].begin();
        wf.attempts[0].complete("sig-0".to_string(), "pk-0".to_string(), None);

        let artifact = wf.build_artifact().unwrap();
        assert_eq!(artifact["chain"], "ethereum");
        assert_eq!(artifact["payload"]["nonce"], 7);
        assert!(artifact["multiSignature"].is_object());
    }
}
