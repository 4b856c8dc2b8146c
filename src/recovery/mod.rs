//! Error recovery policies
//!
//! Failures carry a category, and each category has a recovery policy:
//! connection errors back off exponentially, hardware wallet errors wait
//! for the user to act on the device, deliberate rejections stop the show.
//! The [`ErrorRecovery`] engine picks the policy; the caller owns the retry
//! loop and the counters.

pub mod engine;
pub mod strategies;
pub mod strategy;

pub use engine::ErrorRecovery;
pub use strategies::{
    AuthenticationRecoveryStrategy, ConnectionRecoveryStrategy, HardwareWalletRecoveryStrategy,
    NetworkRecoveryStrategy,
};
pub use strategy::{RecoveryContext, RecoveryOutcome, RecoveryStrategy};
