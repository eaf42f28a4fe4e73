//! Mappings bind selector matchers to an ordered list of envs.

use quarry_core::{Env, SelectorMatcher};

use crate::registry::Criteria;

/// A registered rule: when every selector matches the criteria, the rule's
/// env list applies.
#[derive(Debug, Clone)]
pub struct Mapping {
    /// Unique registration identifier.
    pub name: String,
    /// Selectors, one per category.
    pub selectors: Vec<SelectorMatcher>,
    /// The env records picked at registration time.
    pub envs: Vec<Env>,
}

impl Mapping {
    /// True iff every selector accepts the corresponding criteria entry.
    /// A category missing from the criteria fails the candidate.
    pub fn matches(&self, criteria: &Criteria) -> bool {
        self.selectors.iter().all(|s| {
            criteria
                .get(s.category())
                .is_some_and(|value| s.matches(s.category(), value))
        })
    }

    /// Specificity rank: `(literal selector count, wildcard selector count)`.
    ///
    /// Candidates are ordered lexicographically, both components descending:
    /// more literal selectors always outrank fewer, and among equal literal
    /// counts a mapping matching more categories (via wildcards) outranks one
    /// matching fewer. This is the overflow-free equivalent of scoring 1000
    /// per literal and 1 per wildcard.
    pub fn specificity(&self) -> (usize, usize) {
        let wildcards = self.selectors.iter().filter(|s| s.is_wildcard()).count();
        (self.selectors.len() - wildcards, wildcards)
    }
}

#[cfg(test)]
mod tests {
    use quarry_core::{Env, EnvValue, SelectorFactory};

    use super::*;

    fn env(id: &str, env_name: &str) -> Env {
        Env::new(id, [("env_name", EnvValue::from(env_name))]).unwrap()
    }

    #[test]
    fn test_mapping_matches_criteria() {
        let category = SelectorFactory::new("category");
        let mapping = Mapping {
            name: "m".into(),
            selectors: vec![category.literals(["this", "one"]).unwrap()],
            envs: vec![env("e", "testenv")],
        };
        let hit: Criteria = [("category".to_string(), "this".to_string())].into();
        let wrong_value: Criteria = [("category".to_string(), "else".to_string())].into();
        let wrong_key: Criteria = [("branch".to_string(), "this".to_string())].into();
        assert!(mapping.matches(&hit));
        assert!(!mapping.matches(&wrong_value));
        assert!(!mapping.matches(&wrong_key));
    }

    #[test]
    fn test_specificity_rank() {
        let category = SelectorFactory::new("category");
        let branch = SelectorFactory::new("branch");
        let two_literals = Mapping {
            name: "a".into(),
            selectors: vec![
                category.literals(["x"]).unwrap(),
                branch.literals(["main"]).unwrap(),
            ],
            envs: vec![env("e1", "testenv")],
        };
        let literal_plus_wildcard = Mapping {
            name: "b".into(),
            selectors: vec![category.wildcard(), branch.literals(["main"]).unwrap()],
            envs: vec![env("e2", "testenv")],
        };
        assert_eq!(two_literals.specificity(), (2, 0));
        assert_eq!(literal_plus_wildcard.specificity(), (1, 1));
        assert!(two_literals.specificity() > literal_plus_wildcard.specificity());
    }
}
