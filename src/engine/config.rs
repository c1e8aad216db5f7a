use serde::{Deserialize, Serialize};

/// How the engine treats a transfer whose destination is its own source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfTransferPolicy {
    /// Run the usual transfer checks and record it; the balance is unchanged.
    #[default]
    Allow,
    /// Refuse with `Rejection::SelfTransfer` after the other transfer checks.
    Reject,
}

/// Tunables of the transaction engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub self_transfer: SelfTransferPolicy,
}

impl EngineConfig {
    #[must_use]
    pub fn with_self_transfer(mut self, policy: SelfTransferPolicy) -> Self {
        self.self_transfer = policy;
        self
    }
}
