//! Knobs the facade needs that aren't owned by any single component

use fcm_core::ResolutionStrategy;

/// Configuration for a [`crate::manager::ChangeManager`]
///
/// Constructed explicitly by the caller and injected, rather than read from
/// a global singleton — there is exactly one of these per manager instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeManagerConfig {
    /// Strategy `ConflictDetector` uses when opening a conflict whose first
    /// member change carries no strategy hint of its own
    pub default_strategy: ResolutionStrategy,
    /// How many days of changes and audit entries `Cleanup` retains
    pub retention_days: u32,
}

impl Default for ChangeManagerConfig {
    /// `fifo_wins` default strategy, 30-day retention — matching the Python
    /// prototype's `cleanup_old_changes(days_old: int = 30)` default
    fn default() -> Self {
        Self {
            default_strategy: ResolutionStrategy::FifoWins,
            retention_days: 30,
        }
    }
}
