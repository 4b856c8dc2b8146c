//! Threshold signing coordinator
//!
//! Drives an m-of-n signing workflow end to end: validates the request,
//! fans signature attempts out to providers (sequentially or in parallel),
//! classifies every outcome, tracks threshold crossing, and settles the
//! workflow into exactly one terminal state. All workflow state lives
//! behind an async RwLock in the active map; once a workflow is terminal,
//! late attempt results are discarded, which is what makes cancellation
//! purely logical.

use crate::coordinator::config::{Signer, WorkflowConfig};
use crate::coordinator::events::{WorkflowEvent, WORKFLOW_EVENT_CAPACITY};
use crate::coordinator::workflow::{SigningProgress, Workflow, WorkflowStatus};
use crate::error::{ErrorKind, ProviderError};
use crate::provider::{SignRequest, TransactionPayload};
use crate::registry::ProviderRegistry;
use chrono::Utc;
use futures::future::{join_all, try_join_all};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

enum FailureClass {
    Failed,
    Rejected,
    TimedOut { timeout_ms: u64 },
}

enum FinalizeOutcome {
    Cancelled,
    Failed(ProviderError),
    Ended(Workflow),
}

/// Orchestrates m-of-n signing workflows over registered providers
pub struct MultisigCoordinator {
    registry: Arc<ProviderRegistry>,
    active: RwLock<HashMap<String, Arc<RwLock<Workflow>>>>,
    event_tx: broadcast::Sender<WorkflowEvent>,
}

impl MultisigCoordinator {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        let (event_tx, _) = broadcast::channel(WORKFLOW_EVENT_CAPACITY);
        Self {
            registry,
            active: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to workflow lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: WorkflowEvent) {
        // Nobody listening is fine
        let _ = self.event_tx.send(event);
    }

    /// Run one threshold signing workflow to its terminal state
    ///
    /// Validates the request, executes the signature attempts, and returns
    /// the settled workflow. Failed workflows surface as errors; the
    /// terminal events carry the same information for subscribers.
    pub async fn start_workflow(
        &self,
        transaction: TransactionPayload,
        signers: Vec<Signer>,
        config: WorkflowConfig,
    ) -> Result<Workflow, ProviderError> {
        self.validate(&signers, &config).await?;

        let workflow = Workflow::new(transaction, signers, config);
        let workflow_id = workflow.id.clone();
        let config = workflow.config.clone();
        let state = Arc::new(RwLock::new(workflow));
        self.active
            .write()
            .await
            .insert(workflow_id.clone(), state.clone());

        log::info!(
            "Workflow {} started: {} of {} signatures required{}",
            workflow_id,
            config.required_signatures,
            config.total_signers,
            if config.require_sequential_signing {
                " (sequential)"
            } else {
                ""
            }
        );
        self.emit(WorkflowEvent::WorkflowStarted {
            workflow_id: workflow_id.clone(),
            required_signatures: config.required_signatures,
            total_signers: config.total_signers,
        });

        let exec_result = match config.total_timeout_ms {
            Some(total_ms) => {
                let deadline = Duration::from_millis(total_ms);
                match tokio::time::timeout(deadline, self.execute(&state, &workflow_id, &config))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => {
                        // In-flight attempts are abandoned where they stand
                        log::warn!(
                            "Workflow {} hit its overall deadline after {} ms",
                            workflow_id,
                            total_ms
                        );
                        Ok(())
                    }
                }
            }
            None => self.execute(&state, &workflow_id, &config).await,
        };

        self.finalize(&state, &workflow_id, exec_result).await
    }

    /// Mark an active workflow as cancelled
    ///
    /// Cancellation is logical: in-flight provider calls are not aborted,
    /// but their results are discarded because the workflow is terminal.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<(), ProviderError> {
        let state = self
            .active
            .write()
            .await
            .remove(workflow_id)
            .ok_or_else(|| {
                ProviderError::signing_failed(format!("workflow {} is not active", workflow_id))
            })?;

        {
            let mut wf = state.write().await;
            wf.status = WorkflowStatus::Cancelled;
            wf.ended_at = Some(Utc::now());
        }

        log::info!("Workflow {} cancelled", workflow_id);
        self.emit(WorkflowEvent::WorkflowFailed {
            workflow_id: workflow_id.to_string(),
            error: ProviderError::signing_failed(format!(
                "workflow {} was cancelled",
                workflow_id
            )),
        });
        Ok(())
    }

    /// Snapshot of an active workflow
    pub async fn get_workflow(&self, workflow_id: &str) -> Option<Workflow> {
        let state = self.active.read().await.get(workflow_id).cloned()?;
        let wf = state.read().await;
        Some(wf.clone())
    }

    /// Ids of every workflow still executing
    pub async fn active_workflow_ids(&self) -> Vec<String> {
        self.active.read().await.keys().cloned().collect()
    }

    pub fn is_threshold_met(&self, workflow: &Workflow) -> bool {
        workflow.is_threshold_met()
    }

    pub fn signing_progress(&self, workflow: &Workflow) -> SigningProgress {
        workflow.progress()
    }

    async fn validate(
        &self,
        signers: &[Signer],
        config: &WorkflowConfig,
    ) -> Result<(), ProviderError> {
        if config.required_signatures < 1 {
            return Err(ProviderError::invalid_transaction(
                "required_signatures must be at least 1",
            ));
        }
        if config.required_signatures > config.total_signers {
            return Err(ProviderError::invalid_transaction(format!(
                "required_signatures ({}) cannot exceed total_signers ({})",
                config.required_signatures, config.total_signers
            )));
        }
        if signers.len() as u32 != config.total_signers {
            return Err(ProviderError::invalid_transaction(format!(
                "expected {} signers, got {}",
                config.total_signers,
                signers.len()
            )));
        }
        let required_count = signers.iter().filter(|s| s.required).count() as u32;
        if required_count > config.required_signatures {
            return Err(ProviderError::invalid_transaction(format!(
                "{} required signers exceed the {} required signatures",
                required_count, config.required_signatures
            )));
        }
        for signer in signers {
            if !self.registry.has_provider(&signer.provider_id).await {
                return Err(ProviderError::not_found(format!(
                    "provider '{}' is not registered",
                    signer.provider_id
                ))
                .with_provider(&signer.provider_id));
            }
        }
        Ok(())
    }

    async fn execute(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        config: &WorkflowConfig,
    ) -> Result<(), ProviderError> {
        let signers: Vec<Signer> = {
            let wf = state.read().await;
            wf.attempts.iter().map(|a| a.signer.clone()).collect()
        };

        if config.require_sequential_signing {
            self.execute_sequential(state, workflow_id, config, &signers)
                .await
        } else {
            self.execute_parallel(state, workflow_id, config, &signers)
                .await
        }
    }

    async fn execute_sequential(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        config: &WorkflowConfig,
        signers: &[Signer],
    ) -> Result<(), ProviderError> {
        for (index, signer) in signers.iter().enumerate() {
            {
                let wf = state.read().await;
                if wf.status.is_terminal() {
                    return Ok(());
                }
                if wf.is_threshold_met() && !config.allow_partial_signing {
                    log::debug!(
                        "Workflow {}: threshold met, skipping remaining signers",
                        workflow_id
                    );
                    break;
                }
            }
            self.run_attempt(state, workflow_id, index, signer, config)
                .await?;
        }
        Ok(())
    }

    async fn execute_parallel(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        config: &WorkflowConfig,
        signers: &[Signer],
    ) -> Result<(), ProviderError> {
        let attempts = signers
            .iter()
            .enumerate()
            .map(|(index, signer)| self.run_attempt(state, workflow_id, index, signer, config));

        if config.allow_partial_signing {
            // Let every attempt settle, then surface the first propagating
            // error in signer order
            let results = join_all(attempts).await;
            results.into_iter().collect::<Result<Vec<_>, _>>()?;
        } else {
            // First propagating error drops the remaining attempt futures
            try_join_all(attempts).await?;
        }
        Ok(())
    }

    /// Run one signature attempt and fold its outcome into the workflow
    ///
    /// Returns an error only when the failure must abort the workflow
    /// (required signer, `continue_on_error` unset).
    async fn run_attempt(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        index: usize,
        signer: &Signer,
        config: &WorkflowConfig,
    ) -> Result<(), ProviderError> {
        let transaction = {
            let mut wf = state.write().await;
            if wf.status.is_terminal() {
                return Ok(());
            }
            wf.attempts[index].begin();
            wf.transaction.clone()
        };

        self.emit(WorkflowEvent::SignatureStarted {
            workflow_id: workflow_id.to_string(),
            signer_index: index,
            provider_id: signer.provider_id.clone(),
        });
        log::debug!(
            "Workflow {}: requesting signature {} from {}",
            workflow_id,
            index,
            signer.provider_id
        );

        let provider = match self.registry.get(&signer.provider_id).await {
            Some(provider) => provider,
            None => {
                let error = ProviderError::not_found(format!(
                    "provider '{}' disappeared from the registry",
                    signer.provider_id
                ))
                .with_provider(&signer.provider_id);
                return self
                    .record_failure(
                        state,
                        workflow_id,
                        index,
                        signer,
                        config,
                        error,
                        FailureClass::Failed,
                    )
                    .await;
            }
        };

        let request = build_request(&transaction, workflow_id, index, signer, config);
        let timeout_ms = config.signature_timeout();

        match tokio::time::timeout(Duration::from_millis(timeout_ms), provider.sign(&request))
            .await
        {
            Ok(Ok(response)) => {
                let (threshold_crossed, completed) = {
                    let mut wf = state.write().await;
                    if wf.status.is_terminal() {
                        return Ok(());
                    }
                    wf.attempts[index].complete(
                        response.signature,
                        response.public_key,
                        response.signed_payload,
                    );
                    let completed = wf.completed_count();
                    let crossed = !wf.required_met && wf.is_threshold_met();
                    if crossed {
                        wf.required_met = true;
                    }
                    (crossed, completed)
                };

                log::info!(
                    "Workflow {}: signature {} completed by {}",
                    workflow_id,
                    index,
                    signer.provider_id
                );
                self.emit(WorkflowEvent::SignatureCompleted {
                    workflow_id: workflow_id.to_string(),
                    signer_index: index,
                    provider_id: signer.provider_id.clone(),
                    completed,
                });
                if threshold_crossed {
                    log::info!("Workflow {} reached its signature threshold", workflow_id);
                    self.emit(WorkflowEvent::ThresholdMet {
                        workflow_id: workflow_id.to_string(),
                        completed,
                        required: config.required_signatures,
                    });
                }
                Ok(())
            }
            Ok(Err(error)) => {
                let class = if error.kind == ErrorKind::UserRejected {
                    FailureClass::Rejected
                } else {
                    FailureClass::Failed
                };
                self.record_failure(state, workflow_id, index, signer, config, error, class)
                    .await
            }
            Err(_) => {
                let error = ProviderError::connection_timeout(format!(
                    "signature request timed out after {} ms",
                    timeout_ms
                ))
                .with_provider(&signer.provider_id);
                self.record_failure(
                    state,
                    workflow_id,
                    index,
                    signer,
                    config,
                    error,
                    FailureClass::TimedOut { timeout_ms },
                )
                .await
            }
        }
    }

    async fn record_failure(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        index: usize,
        signer: &Signer,
        config: &WorkflowConfig,
        error: ProviderError,
        class: FailureClass,
    ) -> Result<(), ProviderError> {
        {
            let mut wf = state.write().await;
            if wf.status.is_terminal() {
                return Ok(());
            }
            let attempt = &mut wf.attempts[index];
            match class {
                FailureClass::Failed => attempt.fail(error.clone()),
                FailureClass::Rejected => attempt.reject(error.clone()),
                FailureClass::TimedOut { .. } => attempt.time_out(error.clone()),
            }
        }

        match class {
            FailureClass::Failed => {
                log::warn!(
                    "Workflow {}: signature {} from {} failed: {}",
                    workflow_id,
                    index,
                    signer.provider_id,
                    error
                );
                self.emit(WorkflowEvent::SignatureFailed {
                    workflow_id: workflow_id.to_string(),
                    signer_index: index,
                    provider_id: signer.provider_id.clone(),
                    error: error.clone(),
                });
            }
            FailureClass::Rejected => {
                log::warn!(
                    "Workflow {}: signature {} was rejected by {}",
                    workflow_id,
                    index,
                    signer.provider_id
                );
                self.emit(WorkflowEvent::SignatureRejected {
                    workflow_id: workflow_id.to_string(),
                    signer_index: index,
                    provider_id: signer.provider_id.clone(),
                });
            }
            FailureClass::TimedOut { timeout_ms } => {
                log::warn!(
                    "Workflow {}: signature {} from {} timed out after {} ms",
                    workflow_id,
                    index,
                    signer.provider_id,
                    timeout_ms
                );
                self.emit(WorkflowEvent::SignatureTimedOut {
                    workflow_id: workflow_id.to_string(),
                    signer_index: index,
                    provider_id: signer.provider_id.clone(),
                    timeout_ms,
                });
            }
        }

        if signer.required && !config.continue_on_error {
            return Err(error);
        }
        Ok(())
    }

    async fn finalize(
        &self,
        state: &Arc<RwLock<Workflow>>,
        workflow_id: &str,
        exec_result: Result<(), ProviderError>,
    ) -> Result<Workflow, ProviderError> {
        let outcome = {
            let mut wf = state.write().await;

            if wf.status == WorkflowStatus::Cancelled {
                FinalizeOutcome::Cancelled
            } else if let Err(error) = exec_result {
                wf.status = WorkflowStatus::Failed;
                wf.ended_at = Some(Utc::now());
                FinalizeOutcome::Failed(error)
            } else {
                let completed = wf.completed_count();
                let required = wf.config.required_signatures;
                wf.required_met = completed >= required;

                if wf.required_met {
                    wf.combined_artifact = wf.build_artifact();
                    wf.status = WorkflowStatus::Completed;
                    wf.ended_at = Some(Utc::now());
                    FinalizeOutcome::Ended(wf.clone())
                } else if wf.config.allow_partial_signing {
                    wf.status = WorkflowStatus::Partial;
                    wf.ended_at = Some(Utc::now());
                    FinalizeOutcome::Ended(wf.clone())
                } else {
                    let error = ProviderError::signing_failed(format!(
                        "insufficient signatures: {} of {} required",
                        completed, required
                    ));
                    wf.status = WorkflowStatus::Failed;
                    wf.ended_at = Some(Utc::now());
                    FinalizeOutcome::Failed(error)
                }
            }
        };

        self.active.write().await.remove(workflow_id);

        match outcome {
            FinalizeOutcome::Cancelled => Err(ProviderError::signing_failed(format!(
                "workflow {} was cancelled",
                workflow_id
            ))),
            FinalizeOutcome::Failed(error) => {
                log::warn!("Workflow {} failed: {}", workflow_id, error);
                self.emit(WorkflowEvent::WorkflowFailed {
                    workflow_id: workflow_id.to_string(),
                    error: error.clone(),
                });
                Err(error)
            }
            FinalizeOutcome::Ended(workflow) => {
                let completed = workflow.completed_count();
                log::info!(
                    "Workflow {} ended {:?} with {} signature(s)",
                    workflow_id,
                    workflow.status,
                    completed
                );
                self.emit(WorkflowEvent::WorkflowCompleted {
                    workflow_id: workflow_id.to_string(),
                    status: workflow.status,
                    completed,
                });
                Ok(workflow)
            }
        }
    }
}

/// Assemble the per-signer request with the workflow metadata stamps
///
/// Workflow metadata is the base, signer metadata overrides it, and the
/// coordinator stamps (`multiSig`, `workflowId`, `signerIndex`) always win.
fn build_request(
    transaction: &TransactionPayload,
    workflow_id: &str,
    index: usize,
    signer: &Signer,
    config: &WorkflowConfig,
) -> SignRequest {
    let mut metadata = config.metadata.clone();
    metadata.extend(signer.metadata.clone());
    metadata.insert("multiSig".to_string(), json!(true));
    metadata.insert("workflowId".to_string(), json!(workflow_id));
    metadata.insert("signerIndex".to_string(), json!(index));

    let mut request = SignRequest::new(transaction.clone(), &signer.account_address);
    request.metadata = metadata;
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::attempt::AttemptStatus;
    use crate::provider::{ChainKind, MockBehavior, MockProvider, SignatureProvider};
    use std::time::Instant;

    async fn setup(count: usize) -> (MultisigCoordinator, Vec<Arc<MockProvider>>, Vec<Signer>) {
        let _ = env_logger::builder().is_test(true).try_init();

        let registry = Arc::new(ProviderRegistry::new());
        let mut providers = Vec::new();
        let mut signers = Vec::new();

        for i in 0..count {
            let provider = Arc::new(MockProvider::new(format!("mock-{}", i)));
            provider.connect().await.unwrap();
            registry.register(provider.clone()).await.unwrap();
            signers.push(Signer::new(
                format!("mock-{}", i),
                provider.default_address(),
            ));
            providers.push(provider);
        }

        (MultisigCoordinator::new(registry), providers, signers)
    }

    fn test_transaction() -> TransactionPayload {
        TransactionPayload::new(
            ChainKind::Ethereum,
            serde_json::json!({"to": "0xfeed", "value": 1}),
        )
    }

    async fn drain_until_terminal(
        rx: &mut broadcast::Receiver<WorkflowEvent>,
    ) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        loop {
            let event = rx.recv().await.unwrap();
            let terminal = matches!(
                event,
                WorkflowEvent::WorkflowCompleted { .. } | WorkflowEvent::WorkflowFailed { .. }
            );
            events.push(event);
            if terminal {
                return events;
            }
        }
    }

    #[tokio::test]
    async fn test_sequential_stops_at_threshold() {
        let (coordinator, providers, signers) = setup(3).await;
        let config = WorkflowConfig {
            require_sequential_signing: true,
            ..WorkflowConfig::new(2, 3)
        };

        let workflow = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap();

        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert!(workflow.required_met);
        assert_eq!(workflow.attempts[0].status, AttemptStatus::Completed);
        assert_eq!(workflow.attempts[1].status, AttemptStatus::Completed);
        // The third signer is never asked once the threshold is met
        assert_eq!(workflow.attempts[2].status, AttemptStatus::Pending);
        assert!(providers[2].last_request().await.is_none());

        let artifact = workflow.combined_artifact.unwrap();
        let signatures = artifact["multiSignature"]["signatures"].as_array().unwrap();
        assert_eq!(signatures.len(), 2);
    }

    #[tokio::test]
    async fn test_parallel_collects_every_signer() {
        let (coordinator, _providers, signers) = setup(3).await;
        let workflow = coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(2, 3))
            .await
            .unwrap();

        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert_eq!(workflow.completed_count(), 3);
        assert_eq!(workflow.progress().percentage, 150);

        let artifact = workflow.combined_artifact.unwrap();
        assert_eq!(artifact["multiSignature"]["threshold"], 2);
        assert_eq!(
            artifact["multiSignature"]["signatures"]
                .as_array()
                .unwrap()
                .len(),
            3
        );
    }

    #[tokio::test]
    async fn test_sequential_abort_skips_remaining_signers() {
        let (coordinator, providers, mut signers) = setup(2).await;
        providers[0].set_behavior(MockBehavior::FailSigning).await;
        signers[0] = signers[0].clone().required();

        let config = WorkflowConfig {
            require_sequential_signing: true,
            ..WorkflowConfig::new(2, 2)
        };
        let err = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SigningFailed);
        assert!(providers[1].last_request().await.is_none());
        assert!(coordinator.active_workflow_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_parallel_fail_fast_cancels_siblings() {
        let (coordinator, providers, mut signers) = setup(2).await;
        providers[0].set_behavior(MockBehavior::FailSigning).await;
        providers[1].set_behavior(MockBehavior::Delay(500)).await;
        signers[0] = signers[0].clone().required();

        let started = Instant::now();
        let err = coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(2, 2))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SigningFailed);
        // The slow sibling was dropped, not awaited
        assert!(started.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_optional_rejection_does_not_sink_workflow() {
        let (coordinator, providers, signers) = setup(3).await;
        providers[1].set_behavior(MockBehavior::RejectSigning).await;

        let mut rx = coordinator.subscribe();
        let workflow = coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(2, 3))
            .await
            .unwrap();

        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert_eq!(workflow.attempts[1].status, AttemptStatus::Rejected);
        let rejection = workflow.attempts[1].error.as_ref().unwrap();
        assert_eq!(rejection.kind, ErrorKind::UserRejected);

        let artifact = workflow.combined_artifact.unwrap();
        assert_eq!(
            artifact["multiSignature"]["signatures"]
                .as_array()
                .unwrap()
                .len(),
            2
        );

        let events = drain_until_terminal(&mut rx).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::SignatureRejected { signer_index: 1, .. })));
    }

    #[tokio::test]
    async fn test_threshold_shortfall_fails_workflow() {
        let (coordinator, providers, signers) = setup(3).await;
        providers[1].set_behavior(MockBehavior::FailSigning).await;
        providers[2].set_behavior(MockBehavior::FailSigning).await;

        let err = coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(2, 3))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::SigningFailed);
        assert!(err.message.contains("1 of 2"));
    }

    #[tokio::test]
    async fn test_partial_result_when_allowed() {
        let (coordinator, providers, signers) = setup(3).await;
        providers[1].set_behavior(MockBehavior::FailSigning).await;
        providers[2].set_behavior(MockBehavior::FailSigning).await;

        let config = WorkflowConfig {
            allow_partial_signing: true,
            ..WorkflowConfig::new(2, 3)
        };
        let workflow = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap();

        assert_eq!(workflow.status, WorkflowStatus::Partial);
        assert!(!workflow.required_met);
        assert_eq!(workflow.completed_count(), 1);
        assert!(workflow.combined_artifact.is_none());
        assert!(workflow.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_configs() {
        let (coordinator, _providers, signers) = setup(3).await;
        let transaction = test_transaction();

        let err = coordinator
            .start_workflow(transaction.clone(), signers.clone(), WorkflowConfig::new(0, 3))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransaction);

        let err = coordinator
            .start_workflow(transaction.clone(), signers.clone(), WorkflowConfig::new(4, 3))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransaction);

        let err = coordinator
            .start_workflow(transaction.clone(), signers.clone(), WorkflowConfig::new(2, 4))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransaction);

        // More required signers than required signatures
        let strict: Vec<Signer> = signers
            .iter()
            .map(|s| s.clone().required())
            .collect();
        let err = coordinator
            .start_workflow(transaction.clone(), strict, WorkflowConfig::new(2, 3))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidTransaction);

        assert!(coordinator.active_workflow_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_provider_fails_validation() {
        let (coordinator, _providers, mut signers) = setup(2).await;
        signers[1].provider_id = "ghost".to_string();

        let mut rx = coordinator.subscribe();
        let err = coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(2, 2))
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ConnectionNotFound);
        assert_eq!(err.provider_id.as_deref(), Some("ghost"));
        // Validation failure has zero side effects
        assert!(coordinator.active_workflow_ids().await.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_signature_timeout_is_classified() {
        let (coordinator, providers, mut signers) = setup(1).await;
        providers[0].set_behavior(MockBehavior::Delay(400)).await;
        signers[0] = signers[0].clone().required();

        let config = WorkflowConfig {
            signature_timeout_ms: Some(40),
            ..WorkflowConfig::new(1, 1)
        };
        let mut rx = coordinator.subscribe();
        let err = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::ConnectionTimeout);

        let events = drain_until_terminal(&mut rx).await;
        assert!(events.iter().any(|e| matches!(
            e,
            WorkflowEvent::SignatureTimedOut { timeout_ms: 40, .. }
        )));
    }

    #[tokio::test]
    async fn test_threshold_met_emitted_once() {
        let (coordinator, _providers, signers) = setup(3).await;
        let mut rx = coordinator.subscribe();

        coordinator
            .start_workflow(test_transaction(), signers, WorkflowConfig::new(3, 3))
            .await
            .unwrap();

        let events = drain_until_terminal(&mut rx).await;
        let threshold_events = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::ThresholdMet { .. }))
            .count();
        assert_eq!(threshold_events, 1);

        // Emission order frames the lifecycle
        assert!(matches!(
            events.first(),
            Some(WorkflowEvent::WorkflowStarted { .. })
        ));
        assert!(matches!(
            events.last(),
            Some(WorkflowEvent::WorkflowCompleted { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_metadata_stamps() {
        let (coordinator, providers, mut signers) = setup(1).await;
        signers[0] = signers[0]
            .clone()
            .with_metadata("shared", serde_json::json!("signer"))
            .with_metadata("role", serde_json::json!("cfo"));

        let mut config = WorkflowConfig::new(1, 1);
        config
            .metadata
            .insert("shared".to_string(), serde_json::json!("config"));
        config
            .metadata
            .insert("purpose".to_string(), serde_json::json!("treasury"));

        let workflow = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap();

        let request = providers[0].last_request().await.unwrap();
        assert_eq!(request.metadata["multiSig"], true);
        assert_eq!(request.metadata["workflowId"], workflow.id.as_str());
        assert_eq!(request.metadata["signerIndex"], 0);
        assert_eq!(request.metadata["purpose"], "treasury");
        assert_eq!(request.metadata["role"], "cfo");
        // Signer metadata wins over workflow metadata
        assert_eq!(request.metadata["shared"], "signer");
    }

    #[tokio::test]
    async fn test_cancellation_is_logical() {
        let (coordinator, providers, signers) = setup(1).await;
        providers[0].set_behavior(MockBehavior::Delay(300)).await;

        let coordinator = Arc::new(coordinator);
        let mut rx = coordinator.subscribe();

        let runner = coordinator.clone();
        let handle = tokio::spawn(async move {
            runner
                .start_workflow(test_transaction(), signers, WorkflowConfig::new(1, 1))
                .await
        });

        let workflow_id = loop {
            match rx.recv().await.unwrap() {
                WorkflowEvent::WorkflowStarted { workflow_id, .. } => break workflow_id,
                _ => continue,
            }
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        coordinator.cancel_workflow(&workflow_id).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.kind, ErrorKind::SigningFailed);
        assert!(err.message.contains("cancelled"));
        assert!(coordinator.active_workflow_ids().await.is_empty());

        // Cancelling an id that is no longer active errors out
        assert!(coordinator.cancel_workflow(&workflow_id).await.is_err());
    }

    #[tokio::test]
    async fn test_workflow_snapshot_while_running() {
        let (coordinator, providers, signers) = setup(1).await;
        providers[0].set_behavior(MockBehavior::Delay(200)).await;

        let coordinator = Arc::new(coordinator);
        let mut rx = coordinator.subscribe();

        let runner = coordinator.clone();
        let handle = tokio::spawn(async move {
            runner
                .start_workflow(test_transaction(), signers, WorkflowConfig::new(1, 1))
                .await
        });

        let workflow_id = loop {
            match rx.recv().await.unwrap() {
                WorkflowEvent::WorkflowStarted { workflow_id, .. } => break workflow_id,
                _ => continue,
            }
        };

        let snapshot = coordinator.get_workflow(&workflow_id).await.unwrap();
        assert_eq!(snapshot.status, WorkflowStatus::InProgress);
        assert_eq!(coordinator.signing_progress(&snapshot).completed, 0);
        assert!(!coordinator.is_threshold_met(&snapshot));

        let workflow = handle.await.unwrap().unwrap();
        assert_eq!(workflow.status, WorkflowStatus::Completed);
        assert!(coordinator.get_workflow(&workflow_id).await.is_none());
    }

    #[tokio::test]
    async fn test_total_timeout_moves_to_finalize() {
        let (coordinator, providers, signers) = setup(2).await;
        providers[0].set_behavior(MockBehavior::Delay(400)).await;
        providers[1].set_behavior(MockBehavior::Delay(400)).await;

        let config = WorkflowConfig {
            total_timeout_ms: Some(60),
            allow_partial_signing: true,
            ..WorkflowConfig::new(2, 2)
        };
        let started = Instant::now();
        let workflow = coordinator
            .start_workflow(test_transaction(), signers, config)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_millis(300));
        assert_eq!(workflow.status, WorkflowStatus::Partial);
        // Abandoned attempts are left exactly as the deadline found them
        assert_eq!(workflow.attempts[0].status, AttemptStatus::InProgress);
        assert_eq!(workflow.attempts[1].status, AttemptStatus::InProgress);
    }
}
