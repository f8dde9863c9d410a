//! Configuration resolver
//!
//! Turns a loaded [`Config`] plus the rule registry into the concrete rule
//! set for each language. Parameters are layered, later layers winning and
//! nested maps deep-merged:
//!
//! 1. rule defaults
//! 2. the built-in language profile (naming table, verbs, rule overrides)
//! 3. the user's top-level `rules` section
//! 4. the user's `languages.<id>` section
//!
//! Every problem is reported here, before any file is read.

use super::{Config, ConfigError, LanguageOverride, RuleOverride};
use crate::diagnostic::Severity;
use crate::language::{builtin_profiles, LanguageRegistry};
use crate::registry::RuleRegistry;
use crate::rule::{validate_params, Rule, RuleError, RuleParams};
use globset::{Glob, GlobMatcher};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A rule ready to run: resolved severity and params
#[derive(Clone)]
pub struct RulePlan {
    pub rule: Arc<dyn Rule>,
    pub severity: Severity,
    pub params: RuleParams,
}

impl std::fmt::Debug for RulePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulePlan")
            .field("rule", &self.rule.id())
            .field("severity", &self.severity)
            .field("params", &self.params)
            .finish()
    }
}

/// Rule plans for every known language
#[derive(Debug, Clone)]
pub struct ActiveRuleSet {
    plans: BTreeMap<String, Vec<RulePlan>>,
    languages: LanguageRegistry,
    fail_on: Severity,
    per_file: Vec<(GlobMatcher, Vec<String>)>,
}

impl ActiveRuleSet {
    /// Plans for a language, in rule id order
    pub fn plans_for(&self, language: &str) -> &[RulePlan] {
        self.plans.get(language).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn fail_on(&self) -> Severity {
        self.fail_on
    }

    /// Check if a rule should be ignored for a file (`rules.per_file`)
    pub fn is_ignored_for_file(&self, rule_id: &str, path: &Path) -> bool {
        self.per_file.iter().any(|(matcher, rules)| {
            matcher.is_match(path) && rules.iter().any(|r| r == "all" || r == rule_id)
        })
    }
}

/// Settings a language section contributes to one rule
fn language_layer(rule_id: &str, section: &LanguageOverride) -> RuleOverride {
    let mut layer = RuleOverride::default();
    match rule_id {
        "naming-convention" if !section.naming.is_empty() => {
            let patterns: Map<String, Value> = section
                .naming
                .iter()
                .map(|(kind, pattern)| (kind.to_string(), Value::String(pattern.clone())))
                .collect();
            layer.params.set("patterns", Value::Object(patterns));
        }
        "verb-named-method" => {
            if let Some(verbs) = &section.verbs {
                layer.params.set("verbs", verbs.clone());
            }
        }
        _ => {}
    }
    if let Some(rule) = section.rules.get(rule_id) {
        layer.merge(rule);
    }
    layer
}

fn param_error(rule_id: &str, err: RuleError) -> ConfigError {
    match err {
        RuleError::InvalidParam { param, message } => ConfigError::InvalidParam {
            rule: rule_id.to_string(),
            param,
            message,
        },
        other => ConfigError::InvalidParam {
            rule: rule_id.to_string(),
            param: String::new(),
            message: other.to_string(),
        },
    }
}

/// Resolve the active rule set for a configuration
pub fn resolve(registry: &RuleRegistry, config: &Config) -> Result<ActiveRuleSet, ConfigError> {
    for (rule, section) in config.referenced_rules() {
        if !registry.contains(&rule) {
            return Err(ConfigError::UnknownRule { rule, section });
        }
    }

    let profiles = builtin_profiles()?;
    let mut languages = LanguageRegistry::builtin()?;
    for (id, section) in &config.languages {
        match &section.syntax {
            Some(syntax) => languages.register(id, syntax.clone()),
            None if languages.contains(id) => {}
            None => return Err(ConfigError::UnknownLanguage(id.clone())),
        }
    }

    let mut plans = BTreeMap::new();
    for language in languages.ids() {
        let profile = profiles.get(language);
        let user = config.languages.get(language);
        let mut language_plans = Vec::new();

        for rule in registry.iter() {
            let id = rule.id();
            if config.rules.disabled.iter().any(|r| r == id)
                || (!config.rules.select.is_empty() && !config.rules.select.iter().any(|r| r == id))
            {
                continue;
            }

            let mut effective = RuleOverride {
                params: rule.default_params(),
                ..RuleOverride::default()
            };
            if let Some(profile) = profile {
                effective.merge(&language_layer(id, profile));
            }
            if let Some(global) = config.rules.overrides.get(id) {
                effective.merge(global);
            }
            if let Some(user) = user {
                effective.merge(&language_layer(id, user));
            }

            if effective.enabled == Some(false) {
                continue;
            }
            validate_params(rule.as_ref(), &effective.params).map_err(|e| param_error(id, e))?;

            let mut severity = effective.severity.unwrap_or_else(|| rule.default_severity());
            if rule.is_advisory() {
                severity = severity.capped_at_warning();
            }

            language_plans.push(RulePlan {
                rule: Arc::clone(rule),
                severity,
                params: effective.params,
            });
        }

        log::debug!("{}: {} active rules", language, language_plans.len());
        plans.insert(language.to_string(), language_plans);
    }

    let mut patterns: Vec<_> = config.rules.per_file.iter().collect();
    patterns.sort_by(|a, b| a.0.cmp(b.0));
    let mut per_file = Vec::with_capacity(patterns.len());
    for (pattern, rules) in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            ConfigError::Invalid(format!("invalid per_file pattern '{}': {}", pattern, e))
        })?;
        per_file.push((glob.compile_matcher(), rules.clone()));
    }

    Ok(ActiveRuleSet {
        plans,
        languages,
        fail_on: config.fail_on(),
        per_file,
    })
}
