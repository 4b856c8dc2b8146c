//! Built-in recovery strategies
//!
//! Four policies cover the recoverable slices of the error taxonomy:
//! connection failures back off exponentially, authentication failures
//! distinguish rejection from expiry, hardware wallets get fixed waits tied
//! to device state, and network errors back off with jitter.

use crate::error::{ErrorCategory, ErrorKind, ProviderError};
use crate::recovery::strategy::{RecoveryContext, RecoveryOutcome, RecoveryStrategy};
use async_trait::async_trait;
use rand::Rng;

/// Base delay for exponential backoff
const BACKOFF_BASE_MS: u64 = 1_000;
/// Ceiling for connection backoff
const CONNECTION_MAX_DELAY_MS: u64 = 10_000;
/// Connection retry budget when the caller does not set one
const CONNECTION_DEFAULT_MAX_RETRIES: u32 = 3;
/// Fixed wait before retrying an expired authorization
const UNAUTHORIZED_DELAY_MS: u64 = 1_000;
/// Authorization retry budget when the caller does not set one
const UNAUTHORIZED_DEFAULT_MAX_RETRIES: u32 = 2;
/// Wait for the user to plug in and unlock a missing device
const DEVICE_NOT_FOUND_DELAY_MS: u64 = 3_000;
/// Wait for the user to enter a PIN on a locked device
const DEVICE_LOCKED_DELAY_MS: u64 = 1_000;
/// Wait for a busy device to finish its pending action
const DEVICE_BUSY_DELAY_MS: u64 = 2_000;
/// Wait for any other hardware condition
const DEVICE_DEFAULT_DELAY_MS: u64 = 2_000;
/// Ceiling for network backoff
const NETWORK_MAX_DELAY_MS: u64 = 30_000;
/// Random spread added to network backoff to avoid thundering herds
const NETWORK_JITTER_MS: u64 = 500;
/// Network retry budget when the caller does not set one
const NETWORK_DEFAULT_MAX_RETRIES: u32 = 5;

fn exponential_backoff(retry_count: u32, cap_ms: u64) -> u64 {
    (BACKOFF_BASE_MS * 2u64.pow(retry_count.min(16))).min(cap_ms)
}

/// Exponential backoff for connection failures
///
/// A missing connection is terminal; everything else in the category is
/// retried with a doubling delay until the retry budget runs out.
pub struct ConnectionRecoveryStrategy;

#[async_trait]
impl RecoveryStrategy for ConnectionRecoveryStrategy {
    fn name(&self) -> &str {
        "connection"
    }

    fn can_recover(&self, error: &ProviderError) -> bool {
        error.category() == ErrorCategory::Connection
    }

    fn recovery_instructions(&self, error: &ProviderError) -> Vec<String> {
        match error.kind {
            ErrorKind::ConnectionNotFound => vec![
                "Reconnect the signing agent".to_string(),
                "Re-register the provider if it was removed".to_string(),
            ],
            _ => vec![
                "Check that the signing agent is running".to_string(),
                "Verify your network connection".to_string(),
                "Try connecting again".to_string(),
            ],
        }
    }

    async fn recover(
        &self,
        error: &ProviderError,
        context: &RecoveryContext,
    ) -> Result<RecoveryOutcome, ProviderError> {
        if error.kind == ErrorKind::ConnectionNotFound {
            return Ok(RecoveryOutcome::terminal()
                .with_instructions(self.recovery_instructions(error)));
        }

        let max_retries = context.max_retries.unwrap_or(CONNECTION_DEFAULT_MAX_RETRIES);
        if context.retry_count >= max_retries {
            return Ok(RecoveryOutcome::terminal()
                .with_instructions(self.recovery_instructions(error)));
        }

        let delay = exponential_backoff(context.retry_count, CONNECTION_MAX_DELAY_MS);
        Ok(RecoveryOutcome::retry_after(delay))
    }
}

/// Rejections are final, expired authorizations get one short retry window
pub struct AuthenticationRecoveryStrategy;

#[async_trait]
impl RecoveryStrategy for AuthenticationRecoveryStrategy {
    fn name(&self) -> &str {
        "authentication"
    }

    fn can_recover(&self, error: &ProviderError) -> bool {
        error.category() == ErrorCategory::Authentication
    }

    fn recovery_instructions(&self, error: &ProviderError) -> Vec<String> {
        match error.kind {
            ErrorKind::UserRejected => vec![
                "Review the transaction details".to_string(),
                "Approve the request on your signing agent to proceed".to_string(),
            ],
            _ => vec![
                "Re-authorize the application with your signing agent".to_string(),
                "Try the request again".to_string(),
            ],
        }
    }

    async fn recover(
        &self,
        error: &ProviderError,
        context: &RecoveryContext,
    ) -> Result<RecoveryOutcome, ProviderError> {
        if error.kind == ErrorKind::UserRejected {
            // A deliberate rejection is never retried automatically
            return Ok(RecoveryOutcome::terminal()
                .with_instructions(self.recovery_instructions(error)));
        }

        let max_retries = context
            .max_retries
            .unwrap_or(UNAUTHORIZED_DEFAULT_MAX_RETRIES);
        if context.retry_count >= max_retries {
            return Ok(RecoveryOutcome::terminal()
                .with_instructions(self.recovery_instructions(error)));
        }

        Ok(RecoveryOutcome::retry_after(UNAUTHORIZED_DELAY_MS))
    }
}

/// Fixed waits tuned to hardware wallet states
///
/// Hardware conditions clear when the user acts on the device, so this
/// strategy always advises a retry and leaves the overall bound to the
/// caller's counter.
pub struct HardwareWalletRecoveryStrategy;

#[async_trait]
impl RecoveryStrategy for HardwareWalletRecoveryStrategy {
    fn name(&self) -> &str {
        "hardware-wallet"
    }

    fn can_recover(&self, error: &ProviderError) -> bool {
        error.category() == ErrorCategory::HardwareWallet
    }

    fn recovery_instructions(&self, error: &ProviderError) -> Vec<String> {
        match error.kind {
            ErrorKind::DeviceNotFound => vec![
                "Connect your hardware wallet".to_string(),
                "Unlock the device".to_string(),
                "Open the signing app for the target chain".to_string(),
            ],
            ErrorKind::DeviceLocked => vec!["Unlock the device with your PIN".to_string()],
            ErrorKind::DeviceBusy => {
                vec!["Finish or dismiss the pending action on the device".to_string()]
            }
            _ => vec!["Check the hardware wallet and try again".to_string()],
        }
    }

    async fn recover(
        &self,
        error: &ProviderError,
        _context: &RecoveryContext,
    ) -> Result<RecoveryOutcome, ProviderError> {
        let delay = match error.kind {
            ErrorKind::DeviceNotFound => DEVICE_NOT_FOUND_DELAY_MS,
            ErrorKind::DeviceLocked => DEVICE_LOCKED_DELAY_MS,
            ErrorKind::DeviceBusy => DEVICE_BUSY_DELAY_MS,
            _ => DEVICE_DEFAULT_DELAY_MS,
        };

        Ok(RecoveryOutcome::retry_after(delay)
            .with_instructions(self.recovery_instructions(error)))
    }
}

/// Jittered exponential backoff for transient network failures
pub struct NetworkRecoveryStrategy;

#[async_trait]
impl RecoveryStrategy for NetworkRecoveryStrategy {
    fn name(&self) -> &str {
        "network"
    }

    fn can_recover(&self, error: &ProviderError) -> bool {
        error.kind == ErrorKind::NetworkError
    }

    fn recovery_instructions(&self, _error: &ProviderError) -> Vec<String> {
        vec![
            "Check your internet connection".to_string(),
            "The request will be retried automatically".to_string(),
        ]
    }

    async fn recover(
        &self,
        error: &ProviderError,
        context: &RecoveryContext,
    ) -> Result<RecoveryOutcome, ProviderError> {
        let max_retries = context.max_retries.unwrap_or(NETWORK_DEFAULT_MAX_RETRIES);
        if context.retry_count >= max_retries {
            return Ok(RecoveryOutcome::terminal()
                .with_instructions(self.recovery_instructions(error)));
        }

        let jitter = rand::thread_rng().gen_range(0..NETWORK_JITTER_MS);
        let delay = (exponential_backoff(context.retry_count, NETWORK_MAX_DELAY_MS) + jitter)
            .min(NETWORK_MAX_DELAY_MS);
        Ok(RecoveryOutcome::retry_after(delay))
    }
}
