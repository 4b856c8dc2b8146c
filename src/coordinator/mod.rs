//! Multi-signature workflow orchestration
//!
//! The coordinator runs m-of-n signing workflows: a transaction, a roster
//! of signers, and a threshold go in; signature attempts fan out to the
//! registered providers; a settled [`Workflow`] with per-attempt records
//! and an aggregate artifact comes out. Progress is observable through
//! broadcast [`WorkflowEvent`]s.
//!
//! # Example
//!
//! ```ignore
//! use quorum_signer::coordinator::{MultisigCoordinator, Signer, WorkflowConfig};
//!
//! let coordinator = MultisigCoordinator::new(registry);
//! let signers = vec![
//!     Signer::new("ledger-1", "0xa11ce"),
//!     Signer::new("metamask-1", "0xb0b"),
//!     Signer::new("mock-1", "0xca401"),
//! ];
//!
//! let workflow = coordinator
//!     .start_workflow(transaction, signers, WorkflowConfig::new(2, 3))
//!     .await?;
//! assert!(workflow.required_met);
//! ```

pub mod attempt;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod workflow;

pub use attempt::{AttemptStatus, SignatureAttempt};
pub use config::{Signer, WorkflowConfig, DEFAULT_SIGNATURE_TIMEOUT_MS};
pub use coordinator::MultisigCoordinator;
pub use events::{WorkflowEvent, WORKFLOW_EVENT_CAPACITY};
pub use workflow::{SigningProgress, Workflow, WorkflowStatus};
