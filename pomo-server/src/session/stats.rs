/// Completion counters for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    completed_focus_intervals: u32,
    completed_minutes: u32,
}

/// Credit produced by a state transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsDelta {
    pub intervals: u32,
    pub minutes: u32,
}

impl StatsDelta {
    /// No change
    pub const NONE: StatsDelta = StatsDelta {
        intervals: 0,
        minutes: 0,
    };

    /// Credit for one completed focus interval of `minutes`
    pub fn focus(minutes: u32) -> Self {
        Self {
            intervals: 1,
            minutes,
        }
    }
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed_focus_intervals(&self) -> u32 {
        self.completed_focus_intervals
    }

    pub fn completed_minutes(&self) -> u32 {
        self.completed_minutes
    }

    /// Whether any focus interval has been completed
    pub fn has_progress(&self) -> bool {
        self.completed_focus_intervals > 0
    }

    pub fn apply(&mut self, delta: StatsDelta) {
        self.completed_focus_intervals = self.completed_focus_intervals.saturating_add(delta.intervals);
        self.completed_minutes = self.completed_minutes.saturating_add(delta.minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = Stats::new();
        assert_eq!(stats.completed_focus_intervals(), 0);
        assert_eq!(stats.completed_minutes(), 0);
        assert!(!stats.has_progress());
    }

    #[test]
    fn test_apply_focus_credit() {
        let mut stats = Stats::new();
        stats.apply(StatsDelta::focus(25));
        stats.apply(StatsDelta::focus(30));
        assert_eq!(stats.completed_focus_intervals(), 2);
        assert_eq!(stats.completed_minutes(), 55);
        assert!(stats.has_progress());
    }

    #[test]
    fn test_apply_none_is_noop() {
        let mut stats = Stats::new();
        stats.apply(StatsDelta::focus(20));
        let before = stats;
        stats.apply(StatsDelta::NONE);
        assert_eq!(stats, before);
    }
}
