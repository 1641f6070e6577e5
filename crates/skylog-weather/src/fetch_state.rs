//! Fetch lifecycle state machine (idle / pending / settled).
//!
//! Tracks the most recent trigger only. Older fetches may still be in flight,
//! but their resolutions no longer move the phase.

/// Phase of the latest weather fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Pending {
        trigger: u64,
    },
    Succeeded {
        trigger: u64,
    },
    Failed {
        trigger: u64,
    },
}

impl FetchPhase {
    /// True if no fetch for the latest trigger is outstanding.
    pub fn is_idle(self) -> bool {
        !matches!(self, FetchPhase::Pending { .. })
    }

    /// Trigger of the fetch this phase refers to, if any.
    pub fn trigger(self) -> Option<u64> {
        match self {
            FetchPhase::Idle => None,
            FetchPhase::Pending { trigger }
            | FetchPhase::Succeeded { trigger }
            | FetchPhase::Failed { trigger } => Some(trigger),
        }
    }

    /// State after a new trigger starts a fetch.
    pub fn start(self, trigger: u64) -> Self {
        FetchPhase::Pending { trigger }
    }

    /// State after the fetch for `trigger` succeeded.
    pub fn on_success(self, trigger: u64) -> Self {
        match self {
            FetchPhase::Pending { trigger: current } if current == trigger => {
                FetchPhase::Succeeded { trigger }
            }
            other => other,
        }
    }

    /// State after the fetch for `trigger` failed.
    pub fn on_failure(self, trigger: u64) -> Self {
        match self {
            FetchPhase::Pending { trigger: current } if current == trigger => {
                FetchPhase::Failed { trigger }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_by_default() {
        assert!(FetchPhase::default().is_idle());
        assert_eq!(FetchPhase::default().trigger(), None);
    }

    #[test]
    fn start_makes_pending() {
        let s = FetchPhase::Idle.start(1);
        assert_eq!(s, FetchPhase::Pending { trigger: 1 });
        assert!(!s.is_idle());
    }

    #[test]
    fn success_settles_matching_trigger() {
        let s = FetchPhase::Idle.start(3).on_success(3);
        assert_eq!(s, FetchPhase::Succeeded { trigger: 3 });
        assert!(s.is_idle());
    }

    #[test]
    fn failure_settles_matching_trigger() {
        let s = FetchPhase::Idle.start(3).on_failure(3);
        assert_eq!(s, FetchPhase::Failed { trigger: 3 });
        assert!(s.is_idle());
    }

    #[test]
    fn stale_resolution_leaves_phase_alone() {
        let s = FetchPhase::Idle.start(1).start(2);
        assert_eq!(s.on_success(1), FetchPhase::Pending { trigger: 2 });
        assert_eq!(s.on_failure(1), FetchPhase::Pending { trigger: 2 });
    }

    #[test]
    fn settled_accepts_new_trigger() {
        let s = FetchPhase::Idle.start(1).on_failure(1).start(2);
        assert_eq!(s, FetchPhase::Pending { trigger: 2 });
    }
}
