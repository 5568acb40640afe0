use std::collections::HashSet;

use crate::generator::Combination;

// Values of the stop placeholder that already produced a hit. Guarded by the
// aggregator lock, never shrinks.
#[derive(Clone, Debug, Default)]
pub struct SkipTracker {
    placeholder: Option<String>,
    found: HashSet<String>,
}

impl SkipTracker {
    pub fn new(placeholder: Option<String>) -> Self {
        Self {
            placeholder,
            found: HashSet::new(),
        }
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    pub fn should_skip(&self, combination: &Combination) -> bool {
        let Some(placeholder) = self.placeholder.as_deref() else {
            return false;
        };
        combination
            .get(placeholder)
            .map(|value| self.found.contains(value))
            .unwrap_or(false)
    }

    // returns true when the value was newly recorded
    pub fn record_if_hit(&mut self, combination: &Combination, is_hit: bool) -> bool {
        if !is_hit {
            return false;
        }
        let Some(placeholder) = self.placeholder.as_deref() else {
            return false;
        };
        match combination.get(placeholder) {
            Some(value) => self.found.insert(value.to_string()),
            None => false,
        }
    }

    pub fn found_sorted(&self) -> Vec<String> {
        let mut out: Vec<String> = self.found.iter().cloned().collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_value_is_skipped_others_are_not() {
        let mut tracker = SkipTracker::new(Some("X".to_string()));
        assert!(tracker.record_if_hit(&Combination::from_pairs([("X", "v1")]), true));
        assert!(tracker.should_skip(&Combination::from_pairs([("X", "v1")])));
        assert!(!tracker.should_skip(&Combination::from_pairs([("X", "v2")])));
    }

    #[test]
    fn misses_are_not_recorded() {
        let mut tracker = SkipTracker::new(Some("X".to_string()));
        assert!(!tracker.record_if_hit(&Combination::from_pairs([("X", "v1")]), false));
        assert!(!tracker.should_skip(&Combination::from_pairs([("X", "v1")])));
    }

    #[test]
    fn other_placeholders_do_not_matter() {
        let mut tracker = SkipTracker::new(Some("USER".to_string()));
        tracker.record_if_hit(&Combination::from_pairs([("USER", "admin"), ("PASS", "1")]), true);
        assert!(tracker.should_skip(&Combination::from_pairs([("USER", "admin"), ("PASS", "2")])));
        assert!(!tracker.should_skip(&Combination::from_pairs([("USER", "guest"), ("PASS", "1")])));
    }

    #[test]
    fn without_stop_placeholder_nothing_is_tracked() {
        let mut tracker = SkipTracker::new(None);
        assert!(!tracker.record_if_hit(&Combination::from_pairs([("X", "v1")]), true));
        assert!(!tracker.should_skip(&Combination::from_pairs([("X", "v1")])));
        assert!(tracker.found_sorted().is_empty());
    }

    #[test]
    fn found_values_are_sorted_and_unique() {
        let mut tracker = SkipTracker::new(Some("X".to_string()));
        for v in ["b", "a", "b", "c"] {
            tracker.record_if_hit(&Combination::from_pairs([("X", v)]), true);
        }
        assert_eq!(tracker.found_sorted(), vec!["a", "b", "c"]);
    }
}
