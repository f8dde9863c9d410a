//! Rule registry
//!
//! Holds the rules available to a run, keyed by id. The engine never looks a
//! rule up any other way, so registering a rule here is all it takes to make
//! it configurable.

use crate::rule::Rule;
use crate::rules::builtin_rules;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Available rules keyed by id
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<&'static str, Arc<dyn Rule>>,
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in rule
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for rule in builtin_rules() {
            registry.register(rule);
        }
        registry
    }

    /// Register a rule, replacing any rule with the same id
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        if self.rules.insert(rule.id(), Arc::clone(&rule)).is_some() {
            log::debug!("rule {} replaced", rule.id());
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Rule>> {
        self.rules.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rules.contains_key(id)
    }

    /// Rules in id order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Violation;
    use crate::rule::{RuleCategory, RuleContext, RuleError};

    struct Custom;

    impl Rule for Custom {
        fn id(&self) -> &'static str {
            "line-length"
        }

        fn description(&self) -> &'static str {
            "replacement"
        }

        fn category(&self) -> RuleCategory {
            RuleCategory::Layout
        }

        fn check(&self, _ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let registry = RuleRegistry::builtin();
        assert_eq!(registry.len(), 10);
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids.first(), Some(&"blank-line-placement"));
        assert!(registry.contains("magic-literal"));
        assert!(registry.get("no-such-rule").is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = RuleRegistry::builtin();
        registry.register(Arc::new(Custom));
        assert_eq!(registry.len(), 10);
        assert_eq!(
            registry.get("line-length").map(|r| r.description()),
            Some("replacement")
        );
    }

    #[test]
    fn test_every_builtin_has_valid_defaults() {
        for rule in RuleRegistry::builtin().iter() {
            let params = rule.default_params();
            assert!(
                crate::rule::validate_params(rule.as_ref(), &params).is_ok(),
                "{} rejects its own defaults",
                rule.id()
            );
        }
    }
}
