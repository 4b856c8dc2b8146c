//! Error taxonomy for providers, workflows, and recovery
//!
//! Every failure the crate produces is a [`ProviderError`]: a single tagged
//! type carrying an [`ErrorKind`], a human-readable message, optional
//! provider/chain attribution, and a `recoverable` flag fixed by the kind
//! at construction. Recovery strategies match on the kind's
//! [`ErrorCategory`] rather than chaining type tests.

use crate::provider::ChainKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad grouping of error kinds, used by the recovery engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Connection,
    Authentication,
    Signing,
    Capability,
    HardwareWallet,
    Registration,
}

/// Every failure kind in the system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Provider did not respond within the allotted time
    ConnectionTimeout,
    /// Provider could not be reached or refused the connection
    ConnectionFailed,
    /// Provider (or workflow) is not known to the registry
    ConnectionNotFound,
    /// The user explicitly declined the request
    UserRejected,
    /// The provider refused the caller's credentials
    Unauthorized,
    /// Generic signing failure
    SigningFailed,
    /// The transaction or workflow configuration is invalid
    InvalidTransaction,
    /// The signing account cannot cover the transaction
    InsufficientFunds,
    /// A network hop between us and the provider failed
    NetworkError,
    /// The provider does not support the requested chain
    UnsupportedChain,
    /// The provider does not implement the requested operation
    UnsupportedOperation,
    /// No hardware device is attached
    DeviceNotFound,
    /// The hardware device is servicing another request
    DeviceBusy,
    /// The hardware device requires a PIN/unlock first
    DeviceLocked,
    /// A provider with this id is already registered
    AlreadyRegistered,
    /// The provider implementation violates the capability contract
    InvalidImplementation,
    /// The provider id is empty or malformed
    InvalidId,
    /// The provider metadata is incomplete
    InvalidMetadata,
}

impl ErrorKind {
    /// The category this kind belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::ConnectionTimeout
            | ErrorKind::ConnectionFailed
            | ErrorKind::ConnectionNotFound => ErrorCategory::Connection,
            ErrorKind::UserRejected | ErrorKind::Unauthorized => ErrorCategory::Authentication,
            ErrorKind::SigningFailed
            | ErrorKind::InvalidTransaction
            | ErrorKind::InsufficientFunds
            | ErrorKind::NetworkError => ErrorCategory::Signing,
            ErrorKind::UnsupportedChain | ErrorKind::UnsupportedOperation => {
                ErrorCategory::Capability
            }
            ErrorKind::DeviceNotFound | ErrorKind::DeviceBusy | ErrorKind::DeviceLocked => {
                ErrorCategory::HardwareWallet
            }
            ErrorKind::AlreadyRegistered
            | ErrorKind::InvalidImplementation
            | ErrorKind::InvalidId
            | ErrorKind::InvalidMetadata => ErrorCategory::Registration,
        }
    }

    /// Stable machine code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ConnectionTimeout => "CONNECTION_TIMEOUT",
            ErrorKind::ConnectionFailed => "CONNECTION_FAILED",
            ErrorKind::ConnectionNotFound => "CONNECTION_NOT_FOUND",
            ErrorKind::UserRejected => "USER_REJECTED",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::SigningFailed => "SIGNING_FAILED",
            ErrorKind::InvalidTransaction => "INVALID_TRANSACTION",
            ErrorKind::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::UnsupportedChain => "UNSUPPORTED_CHAIN",
            ErrorKind::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorKind::DeviceNotFound => "DEVICE_NOT_FOUND",
            ErrorKind::DeviceBusy => "DEVICE_BUSY",
            ErrorKind::DeviceLocked => "DEVICE_LOCKED",
            ErrorKind::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorKind::InvalidImplementation => "INVALID_IMPLEMENTATION",
            ErrorKind::InvalidId => "INVALID_ID",
            ErrorKind::InvalidMetadata => "INVALID_METADATA",
        }
    }

    /// Whether failures of this kind are worth retrying.
    ///
    /// Fixed per kind; call sites never re-derive this.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ErrorKind::ConnectionTimeout | ErrorKind::ConnectionFailed => true,
            ErrorKind::ConnectionNotFound => false,
            ErrorKind::UserRejected => false,
            ErrorKind::Unauthorized => true,
            ErrorKind::SigningFailed | ErrorKind::NetworkError => true,
            ErrorKind::InvalidTransaction | ErrorKind::InsufficientFunds => false,
            ErrorKind::UnsupportedChain | ErrorKind::UnsupportedOperation => false,
            ErrorKind::DeviceNotFound | ErrorKind::DeviceBusy | ErrorKind::DeviceLocked => true,
            ErrorKind::AlreadyRegistered
            | ErrorKind::InvalidImplementation
            | ErrorKind::InvalidId
            | ErrorKind::InvalidMetadata => false,
        }
    }
}

/// A failure anywhere in the signing stack
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("[{}] {message}", .kind.code())]
pub struct ProviderError {
    /// What went wrong
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Provider the failure is attributed to, when known
    pub provider_id: Option<String>,
    /// Chain involved, when relevant
    pub chain: Option<ChainKind>,
    /// Whether a retry could succeed (fixed by `kind`)
    pub recoverable: bool,
}

impl ProviderError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider_id: None,
            chain: None,
            recoverable: kind.is_recoverable(),
        }
    }

    /// Attribute the error to a provider
    pub fn with_provider(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Attribute the error to a chain
    pub fn with_chain(mut self, chain: ChainKind) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Shorthand for a connection timeout
    pub fn connection_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionTimeout, message)
    }

    /// Shorthand for a failed connection
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionFailed, message)
    }

    /// Shorthand for a missing provider or workflow
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionNotFound, message)
    }

    /// Shorthand for a user rejection
    pub fn user_rejected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UserRejected, message)
    }

    /// Shorthand for a generic signing failure
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SigningFailed, message)
    }

    /// Shorthand for an invalid transaction or workflow configuration
    pub fn invalid_transaction(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTransaction, message)
    }

    /// Shorthand for an unsupported chain
    pub fn unsupported_chain(message: impl Into<String>, chain: ChainKind) -> Self {
        Self::new(ErrorKind::UnsupportedChain, message).with_chain(chain)
    }

    /// Shorthand for an unsupported operation
    pub fn unsupported_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedOperation, message)
    }

    /// The kind's category
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// The kind's stable machine code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}
