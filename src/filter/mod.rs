use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::executor::Outcome;

// Hit/no-hit policy. Empty collections count as "not configured".
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FilterPolicy {
    pub status_allow: HashSet<u16>,
    pub status_deny: HashSet<u16>,
    pub size_allow: HashSet<usize>,
    pub size_deny: HashSet<usize>,
    pub match_text: Vec<String>,
    pub match_regex: Vec<String>,
    pub exclude_text: Vec<String>,
    pub exclude_regex: Vec<String>,
}

impl FilterPolicy {
    pub fn has_status_size_predicates(&self) -> bool {
        !self.status_allow.is_empty()
            || !self.status_deny.is_empty()
            || !self.size_allow.is_empty()
            || !self.size_deny.is_empty()
    }

    pub fn has_match_predicates(&self) -> bool {
        !self.match_text.is_empty() || !self.match_regex.is_empty()
    }

    pub fn has_content_predicates(&self) -> bool {
        self.has_match_predicates()
            || !self.exclude_text.is_empty()
            || !self.exclude_regex.is_empty()
    }
}

fn compile_patterns(patterns: &[String], invalid: &mut Vec<String>) -> Vec<Regex> {
    let mut out = Vec::new();
    for pattern in patterns.iter() {
        match RegexBuilder::new(pattern)
            .case_insensitive(true)
            .multi_line(true)
            .build()
        {
            Ok(re) => out.push(re),
            Err(e) => {
                warn!("invalid regex pattern '{pattern}', ignoring it: {e}");
                invalid.push(pattern.clone());
            }
        }
    }
    out
}

// A policy with its substrings lowercased and its patterns compiled once.
#[derive(Clone, Debug)]
pub struct FilterEngine {
    policy: FilterPolicy,
    match_text: Vec<String>,
    exclude_text: Vec<String>,
    match_regex: Vec<Regex>,
    exclude_regex: Vec<Regex>,
    invalid_patterns: Vec<String>,
}

impl FilterEngine {
    pub fn new(policy: FilterPolicy) -> Self {
        let mut invalid_patterns = Vec::new();
        let match_regex = compile_patterns(&policy.match_regex, &mut invalid_patterns);
        let exclude_regex = compile_patterns(&policy.exclude_regex, &mut invalid_patterns);
        let match_text = policy.match_text.iter().map(|t| t.to_lowercase()).collect();
        let exclude_text = policy.exclude_text.iter().map(|t| t.to_lowercase()).collect();
        Self {
            policy,
            match_text,
            exclude_text,
            match_regex,
            exclude_regex,
            invalid_patterns,
        }
    }

    pub fn policy(&self) -> &FilterPolicy {
        &self.policy
    }

    pub fn invalid_patterns(&self) -> &[String] {
        &self.invalid_patterns
    }

    pub fn matches(&self, outcome: &Outcome) -> bool {
        let passed = self.status_size_stage(outcome);
        if self.policy.has_content_predicates() {
            passed && self.content_stage(&outcome.body)
        } else {
            passed
        }
    }

    // the four conditions are OR-ed: satisfying any configured one is enough.
    // e.g. with only status_deny={404}, every non-404 passes even if it misses
    // a configured size_allow.
    fn status_size_stage(&self, outcome: &Outcome) -> bool {
        let p = &self.policy;
        if !p.has_status_size_predicates() {
            return true;
        }
        if !p.status_allow.is_empty() && p.status_allow.contains(&outcome.status) {
            return true;
        }
        if !p.size_allow.is_empty() && p.size_allow.contains(&outcome.length) {
            return true;
        }
        if !p.status_deny.is_empty() && !p.status_deny.contains(&outcome.status) {
            return true;
        }
        if !p.size_deny.is_empty() && !p.size_deny.contains(&outcome.length) {
            return true;
        }
        false
    }

    fn content_stage(&self, body: &str) -> bool {
        if body.is_empty() {
            return false;
        }
        let lower = body.to_lowercase();

        if self.policy.has_match_predicates() {
            let found = self.match_text.iter().any(|t| lower.contains(t.as_str()))
                || self.match_regex.iter().any(|re| re.is_match(body));
            if !found {
                return false;
            }
        }

        if self.exclude_text.iter().any(|t| lower.contains(t.as_str())) {
            return false;
        }
        if self.exclude_regex.iter().any(|re| re.is_match(body)) {
            return false;
        }
        true
    }
}

// One-off evaluation; compiles the policy on every call.
pub fn matches(outcome: &Outcome, policy: &FilterPolicy) -> bool {
    FilterEngine::new(policy.clone()).matches(outcome)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::generator::Combination;

    fn outcome(status: u16, body: &str) -> Outcome {
        Outcome {
            combination: Combination::from_pairs([("FUZZ", "x")]),
            url: "http://t/x".to_string(),
            status,
            length: body.len(),
            elapsed: Duration::from_millis(5),
            body: body.to_string(),
            error: None,
        }
    }

    fn codes(values: &[u16]) -> HashSet<u16> {
        values.iter().copied().collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn status_allow_matches_listed_code() {
        let policy = FilterPolicy {
            status_allow: codes(&[200]),
            ..Default::default()
        };
        assert!(matches(&outcome(200, "ok"), &policy));
        assert!(!matches(&outcome(404, "nope"), &policy));
    }

    #[test]
    fn no_predicates_pass_by_default() {
        assert!(matches(&outcome(404, "nope"), &FilterPolicy::default()));
        assert!(matches(&outcome(0, ""), &FilterPolicy::default()));
    }

    #[test]
    fn status_and_size_conditions_are_or_combined() {
        let policy = FilterPolicy {
            status_deny: codes(&[404]),
            size_allow: [1234usize].into_iter().collect(),
            ..Default::default()
        };
        // passes through status_deny although the size is not allowed
        assert!(matches(&outcome(500, "short"), &policy));
        // passes through size_allow although the status is denied
        let mut big = outcome(404, "");
        big.length = 1234;
        assert!(matches(&big, &policy));
        assert!(!matches(&outcome(404, "short"), &policy));
    }

    #[test]
    fn size_deny_rejects_listed_sizes() {
        let policy = FilterPolicy {
            size_deny: [4usize].into_iter().collect(),
            ..Default::default()
        };
        assert!(!matches(&outcome(200, "four"), &policy));
        assert!(matches(&outcome(200, "five!"), &policy));
    }

    #[test]
    fn match_text_is_case_insensitive() {
        let policy = FilterPolicy {
            match_text: strings(&["admin"]),
            ..Default::default()
        };
        assert!(matches(&outcome(200, "Welcome, ADMIN!"), &policy));
        assert!(matches(&outcome(200, "Welcome, admin!"), &policy));
        assert!(!matches(&outcome(200, "Welcome, guest!"), &policy));
    }

    #[test]
    fn exclude_text_wins_over_match_predicates() {
        let policy = FilterPolicy {
            match_text: strings(&["internal"]),
            exclude_text: strings(&["error"]),
            ..Default::default()
        };
        assert!(!matches(&outcome(200, "Internal error"), &policy));

        let only_exclude = FilterPolicy {
            exclude_text: strings(&["error"]),
            ..Default::default()
        };
        assert!(!matches(&outcome(200, "Internal error"), &only_exclude));
        assert!(matches(&outcome(200, "all good"), &only_exclude));
    }

    #[test]
    fn match_lists_are_or_combined() {
        let policy = FilterPolicy {
            match_text: strings(&["dashboard"]),
            match_regex: strings(&[r"token=\w+"]),
            ..Default::default()
        };
        assert!(matches(&outcome(200, "TOKEN=abc"), &policy));
        assert!(matches(&outcome(200, "the dashboard"), &policy));
        assert!(!matches(&outcome(200, "nothing here"), &policy));
    }

    #[test]
    fn regex_is_multiline() {
        let policy = FilterPolicy {
            match_regex: strings(&["^root:"]),
            ..Default::default()
        };
        assert!(matches(&outcome(200, "daemon:x:1\nroot:x:0:0"), &policy));
    }

    #[test]
    fn content_stage_is_and_combined_with_status_stage() {
        let policy = FilterPolicy {
            status_allow: codes(&[200]),
            match_text: strings(&["admin"]),
            ..Default::default()
        };
        assert!(matches(&outcome(200, "admin"), &policy));
        assert!(!matches(&outcome(403, "admin"), &policy));
        assert!(!matches(&outcome(200, "guest"), &policy));
    }

    #[test]
    fn empty_body_fails_content_predicates() {
        let policy = FilterPolicy {
            exclude_text: strings(&["error"]),
            ..Default::default()
        };
        assert!(!matches(&outcome(0, ""), &policy));
    }

    #[test]
    fn invalid_pattern_is_skipped_not_fatal() {
        let engine = FilterEngine::new(FilterPolicy {
            match_regex: strings(&["(unclosed", "admin"]),
            exclude_regex: strings(&["[bad"]),
            ..Default::default()
        });
        assert_eq!(engine.invalid_patterns(), &["(unclosed", "[bad"]);
        assert!(engine.matches(&outcome(200, "admin area")));
        assert!(!engine.matches(&outcome(200, "guest area")));
    }

    #[test]
    fn only_invalid_match_patterns_never_match() {
        let policy = FilterPolicy {
            match_regex: strings(&["(unclosed"]),
            ..Default::default()
        };
        assert!(!matches(&outcome(200, "(unclosed"), &policy));
    }
}
