//! Recovery engine
//!
//! Routes a failure to the first registered strategy that claims it and
//! turns the strategy's decision into a [`RecoveryOutcome`] the caller can
//! act on. The engine is stateless: retry counts live with the caller and
//! arrive through [`RecoveryContext`].

use crate::error::ProviderError;
use crate::recovery::strategies::{
    AuthenticationRecoveryStrategy, ConnectionRecoveryStrategy, HardwareWalletRecoveryStrategy,
    NetworkRecoveryStrategy,
};
use crate::recovery::strategy::{RecoveryContext, RecoveryOutcome, RecoveryStrategy};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Ordered collection of recovery strategies
///
/// Strategies are consulted front to back; the first whose `can_recover`
/// returns true handles the error. Prepending a custom strategy therefore
/// shadows the built-in behind it.
pub struct ErrorRecovery {
    strategies: RwLock<Vec<Arc<dyn RecoveryStrategy>>>,
}

impl ErrorRecovery {
    /// Engine with the four built-in strategies installed
    pub fn new() -> Self {
        Self {
            strategies: RwLock::new(vec![
                Arc::new(ConnectionRecoveryStrategy),
                Arc::new(AuthenticationRecoveryStrategy),
                Arc::new(HardwareWalletRecoveryStrategy),
                Arc::new(NetworkRecoveryStrategy),
            ]),
        }
    }

    /// Engine with no strategies at all
    pub fn empty() -> Self {
        Self {
            strategies: RwLock::new(Vec::new()),
        }
    }

    /// Append a strategy after the existing ones
    pub async fn add_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.strategies.write().await.push(strategy);
    }

    /// Insert a strategy ahead of the existing ones, shadowing any built-in
    /// that claims the same errors
    pub async fn prepend_strategy(&self, strategy: Arc<dyn RecoveryStrategy>) {
        self.strategies.write().await.insert(0, strategy);
    }

    /// Remove the strategy with the given name, returning whether it existed
    pub async fn remove_strategy(&self, name: &str) -> bool {
        let mut strategies = self.strategies.write().await;
        let before = strategies.len();
        strategies.retain(|s| s.name() != name);
        strategies.len() != before
    }

    /// Registered strategy names, in consultation order
    pub async fn strategy_names(&self) -> Vec<String> {
        self.strategies
            .read()
            .await
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Whether any registered strategy claims this error
    pub async fn can_recover(&self, error: &ProviderError) -> bool {
        self.strategies
            .read()
            .await
            .iter()
            .any(|s| s.can_recover(error))
    }

    /// Instructions from the first matching strategy, or generic advice
    pub async fn recovery_instructions(&self, error: &ProviderError) -> Vec<String> {
        let strategies = self.strategies.read().await;
        match strategies.iter().find(|s| s.can_recover(error)) {
            Some(strategy) => strategy.recovery_instructions(error),
            None => Self::generic_instructions(),
        }
    }

    /// Run the first matching strategy and return its decision
    ///
    /// Never fails: an unmatched error becomes a terminal outcome with
    /// generic instructions, and an error raised by the strategy itself is
    /// folded into a terminal outcome carrying that new error.
    pub async fn recover(
        &self,
        error: &ProviderError,
        context: &RecoveryContext,
    ) -> RecoveryOutcome {
        let strategy = {
            let strategies = self.strategies.read().await;
            strategies.iter().find(|s| s.can_recover(error)).cloned()
        };

        let strategy = match strategy {
            Some(strategy) => strategy,
            None => {
                log::debug!("No recovery strategy claims {}", error.code());
                return RecoveryOutcome::terminal()
                    .with_instructions(Self::generic_instructions());
            }
        };

        log::debug!(
            "Recovering {} with '{}' strategy (retry {})",
            error.code(),
            strategy.name(),
            context.retry_count
        );

        match strategy.recover(error, context).await {
            Ok(outcome) => outcome,
            Err(recovery_error) => {
                log::warn!(
                    "Recovery strategy '{}' failed: {}",
                    strategy.name(),
                    recovery_error
                );
                RecoveryOutcome::terminal()
                    .with_instructions(Self::generic_instructions())
                    .with_new_error(recovery_error)
            }
        }
    }

    /// Fold a foreign failure into the error taxonomy
    ///
    /// Used at boundaries where a non-taxonomy error surfaces (I/O, JSON,
    /// transport). The result is a generic recoverable signing failure.
    pub fn normalize(error: impl std::fmt::Display) -> ProviderError {
        ProviderError::signing_failed(error.to_string())
    }

    fn generic_instructions() -> Vec<String> {
        vec![
            "Try the operation again".to_string(),
            "Contact support if the problem persists".to_string(),
        ]
    }
}

impl Default for ErrorRecovery {
    fn default() -> Self {
        Self::new()
    }
}
