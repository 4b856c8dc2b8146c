//! Capability-driven provider scoring

use crate::provider::{ChainKind, ProviderCapabilities, ProviderKind};
use serde::{Deserialize, Serialize};

/// Points for supporting the requested chain
const CHAIN_SUPPORT_SCORE: u32 = 10;
/// Points per matched caller preference
const PREFERENCE_SCORE: u32 = 5;
/// Ceiling on the concurrency contribution
const MAX_CONCURRENCY_SCORE: u32 = 5;

/// Caller preferences for provider selection
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SelectionPreferences {
    /// Favor hardware wallet agents
    pub prefer_hardware_wallet: bool,
    /// Favor browser extension agents
    pub prefer_browser_extension: bool,
    /// Favor agents that put a human in the signing loop
    pub require_user_interaction: bool,
}

/// Score one candidate for a chain
///
/// Chain support contributes a base score, each matched preference adds a
/// fixed bonus, and the advisory concurrency limit contributes up to
/// [`MAX_CONCURRENCY_SCORE`] points as a throughput signal.
pub(crate) fn score_candidate(
    kind: ProviderKind,
    capabilities: &ProviderCapabilities,
    chain: ChainKind,
    preferences: &SelectionPreferences,
) -> u32 {
    let mut score = 0;

    if capabilities.supports_chain(chain) {
        score += CHAIN_SUPPORT_SCORE;
    }
    if preferences.prefer_hardware_wallet && kind == ProviderKind::HardwareWallet {
        score += PREFERENCE_SCORE;
    }
    if preferences.prefer_browser_extension && kind == ProviderKind::BrowserExtension {
        score += PREFERENCE_SCORE;
    }
    if preferences.require_user_interaction && capabilities.requires_user_interaction() {
        score += PREFERENCE_SCORE;
    }
    score + u32::from(capabilities.max_concurrent_signatures).min(MAX_CONCURRENCY_SCORE)
}
