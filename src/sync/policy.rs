use serde::{Deserialize, Serialize};

/// When nested items that disappeared remotely are pruned from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StaleNestedPolicy {
    /// Prune whenever `auto_fix` is set, independent of `remove_orphaned`.
    #[default]
    FollowAutoFix,
    /// Prune only when both `auto_fix` and `remove_orphaned` are set.
    FollowRemoveOrphaned,
}

/// Reconciliation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidateOptions {
    /// Write corrections back instead of only reporting them.
    pub auto_fix: bool,
    /// Drop cached entities whose id is gone remotely. Applies even without `auto_fix`.
    pub remove_orphaned: bool,
    pub stale_nested: StaleNestedPolicy,
}

impl ValidateOptions {
    pub fn report_only() -> Self {
        Self::default()
    }

    pub fn full_fix() -> Self {
        Self {
            auto_fix: true,
            remove_orphaned: true,
            stale_nested: StaleNestedPolicy::default(),
        }
    }

    pub fn auto_fix(mut self, enabled: bool) -> Self {
        self.auto_fix = enabled;
        self
    }

    pub fn remove_orphaned(mut self, enabled: bool) -> Self {
        self.remove_orphaned = enabled;
        self
    }

    pub fn stale_nested(mut self, policy: StaleNestedPolicy) -> Self {
        self.stale_nested = policy;
        self
    }

    pub fn prunes_stale_nested(&self) -> bool {
        match self.stale_nested {
            StaleNestedPolicy::FollowAutoFix => self.auto_fix,
            StaleNestedPolicy::FollowRemoveOrphaned => self.auto_fix && self.remove_orphaned,
        }
    }
}
