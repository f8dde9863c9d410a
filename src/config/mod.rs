//! Configuration system for kerf
//!
//! Reads configuration from:
//! - `.kerf.yaml` / `.kerf.yml` / `.kerf.json` / `kerf.yaml` / `kerf.json`
//!   (project-level)
//! - the same names in the home directory (user-level)
//!
//! A file may `extend` presets or other files. Rule settings are keyed by rule
//! id directly under `rules`; per-language sections live under `languages`.

mod resolve;

pub use resolve::{resolve, ActiveRuleSet, RulePlan};

use crate::diagnostic::Severity;
use crate::language::LanguageSyntax;
use crate::model::DeclKind;
use crate::rule::RuleParams;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unknown rule '{rule}' in {section}")]
    UnknownRule { rule: String, section: String },

    #[error("Unknown language: {0} (define it with a `syntax` section)")]
    UnknownLanguage(String),

    #[error("Invalid parameter '{param}' for rule '{rule}': {message}")]
    InvalidParam {
        rule: String,
        param: String,
        message: String,
    },
}

/// Engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Enable parallel processing
    pub parallel: bool,

    /// Number of parallel jobs (0 = auto-detect)
    pub jobs: usize,

    /// Cancel the run after this many milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            jobs: 0,
            timeout_ms: None,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormat,

    /// Color mode
    pub color: ColorMode,

    /// Verbose output
    pub verbose: bool,

    /// Show statistics
    pub statistics: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            color: ColorMode::Auto,
            verbose: false,
            statistics: true,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Compact,
    Github,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "compact" => Ok(OutputFormat::Compact),
            "github" => Ok(OutputFormat::Github),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Color mode options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

/// File handling settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Include patterns (empty = every file with a known extension)
    pub include: Vec<String>,

    /// Exclude patterns
    pub exclude: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: vec![
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/.git/**".to_string(),
                "**/vendor/**".to_string(),
                "**/__pycache__/**".to_string(),
            ],
        }
    }
}

/// Settings for one rule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleOverride {
    pub enabled: Option<bool>,
    pub severity: Option<Severity>,
    pub params: RuleParams,
}

impl RuleOverride {
    /// Layer `other` on top (other takes precedence, params deep-merged)
    pub fn merge(&mut self, other: &RuleOverride) {
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
        if other.severity.is_some() {
            self.severity = other.severity;
        }
        self.params.merge(&other.params);
    }
}

fn merge_overrides(base: &mut BTreeMap<String, RuleOverride>, other: &BTreeMap<String, RuleOverride>) {
    for (id, rule) in other {
        base.entry(id.clone()).or_default().merge(rule);
    }
}

/// Rule configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Disabled rules
    pub disabled: Vec<String>,

    /// Run only these rules (empty = all)
    pub select: Vec<String>,

    /// Per-file rule ignores (glob pattern -> rule IDs or `all`)
    pub per_file: HashMap<String, Vec<String>>,

    /// Per-rule settings keyed by rule id
    #[serde(flatten)]
    pub overrides: BTreeMap<String, RuleOverride>,
}

/// Per-language section: syntax definition and rule overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageOverride {
    /// Lexical description; required for languages that are not built in
    pub syntax: Option<LanguageSyntax>,

    /// Naming patterns by declaration kind
    pub naming: BTreeMap<DeclKind, String>,

    /// Verb lexicon for method names
    pub verbs: Option<Vec<String>>,

    /// Rule overrides applying to this language only
    pub rules: BTreeMap<String, RuleOverride>,
}

impl LanguageOverride {
    pub fn merge(&mut self, other: &LanguageOverride) {
        if other.syntax.is_some() {
            self.syntax = other.syntax.clone();
        }
        self.naming
            .extend(other.naming.iter().map(|(k, v)| (*k, v.clone())));
        if other.verbs.is_some() {
            self.verbs = other.verbs.clone();
        }
        merge_overrides(&mut self.rules, &other.rules);
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extend from other configuration files or presets
    pub extends: Vec<String>,

    /// Engine settings
    pub engine: EngineConfig,

    /// Output settings
    pub output: OutputConfig,

    /// File handling settings
    pub files: FilesConfig,

    /// Rule configuration
    pub rules: RulesConfig,

    /// Per-language settings keyed by language id
    pub languages: BTreeMap<String, LanguageOverride>,

    /// Lowest blocking severity that fails the run (default: error)
    pub fail_on: Option<Severity>,
}

const PRESETS: &[&str] = &["recommended", "strict", "minimal"];

/// Config file names searched in the working and home directories
pub const CONFIG_NAMES: &[&str] = &[
    ".kerf.yaml",
    ".kerf.yml",
    ".kerf.json",
    "kerf.yaml",
    "kerf.json",
];

impl Config {
    /// Create default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the built-in presets
    pub fn preset_names() -> &'static [&'static str] {
        PRESETS
    }

    /// Get a preset configuration by name
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::preset_recommended()),
            "strict" => Some(Self::preset_strict()),
            "minimal" => Some(Self::preset_minimal()),
            _ => None,
        }
    }

    /// Recommended preset - every rule at its default severity
    fn preset_recommended() -> Self {
        Self::default()
    }

    /// Strict preset - warnings fail the run
    fn preset_strict() -> Self {
        Self {
            fail_on: Some(Severity::Warning),
            ..Self::default()
        }
    }

    /// Minimal preset - heuristic and spacing rules off
    fn preset_minimal() -> Self {
        let mut config = Self::default();
        for id in [
            "verb-named-method",
            "explanatory-comment",
            "magic-literal",
            "blank-line-placement",
        ] {
            config.rules.overrides.insert(
                id.to_string(),
                RuleOverride {
                    enabled: Some(false),
                    ..RuleOverride::default()
                },
            );
        }
        config
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_depth(path, 0)
    }

    /// Load with recursion depth limit (to prevent infinite loops)
    fn load_with_depth(path: &Path, depth: usize) -> Result<Self, ConfigError> {
        const MAX_DEPTH: usize = 10;
        if depth >= MAX_DEPTH {
            return Err(ConfigError::Invalid(
                "Maximum config inheritance depth exceeded".to_string(),
            ));
        }

        log::debug!("loading config {}", path.display());
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let mut config: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        // Process extends
        if !config.extends.is_empty() {
            let base_dir = path.parent().unwrap_or(Path::new("."));
            let mut base_config = Self::default();

            for extend in &config.extends.clone() {
                let extended = if let Some(preset) = Self::preset(extend) {
                    preset
                } else {
                    let extend_path = if Path::new(extend).is_absolute() {
                        PathBuf::from(extend)
                    } else {
                        base_dir.join(extend)
                    };
                    Self::load_with_depth(&extend_path, depth + 1)?
                };
                base_config.merge(extended);
            }

            // Merge current config on top of base
            base_config.merge(config);
            config = base_config;
        }

        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        // Engine settings - other takes precedence if non-default
        if other.engine.jobs != 0 {
            self.engine.jobs = other.engine.jobs;
        }
        self.engine.parallel = other.engine.parallel;
        if other.engine.timeout_ms.is_some() {
            self.engine.timeout_ms = other.engine.timeout_ms;
        }

        // Output settings
        if other.output.format != OutputFormat::Text {
            self.output.format = other.output.format;
        }
        if other.output.verbose {
            self.output.verbose = true;
        }
        if other.output.color != ColorMode::Auto {
            self.output.color = other.output.color;
        }
        self.output.statistics = other.output.statistics;

        // Files - extend lists
        for pattern in other.files.include {
            if !self.files.include.contains(&pattern) {
                self.files.include.push(pattern);
            }
        }
        for pattern in other.files.exclude {
            if !self.files.exclude.contains(&pattern) {
                self.files.exclude.push(pattern);
            }
        }

        // Rules - merge
        self.rules.disabled.extend(other.rules.disabled);
        if !other.rules.select.is_empty() {
            self.rules.select = other.rules.select;
        }
        for (pattern, rules) in other.rules.per_file {
            self.rules.per_file.entry(pattern).or_default().extend(rules);
        }
        merge_overrides(&mut self.rules.overrides, &other.rules.overrides);

        // Languages - merge per language
        for (id, language) in &other.languages {
            self.languages.entry(id.clone()).or_default().merge(language);
        }

        if other.fail_on.is_some() {
            self.fail_on = other.fail_on;
        }
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Check current directory
        for name in CONFIG_NAMES {
            let path = PathBuf::from(name);
            if path.exists() {
                return Self::load(&path);
            }
        }

        // Check home directory
        if let Some(home) = dirs::home_dir() {
            for name in CONFIG_NAMES {
                let path = home.join(name);
                if path.exists() {
                    return Self::load(&path);
                }
            }
        }

        Ok(Self::default())
    }

    /// Merge CLI arguments into configuration
    #[allow(clippy::too_many_arguments)]
    pub fn merge_cli(
        &mut self,
        format: Option<OutputFormat>,
        verbose: Option<bool>,
        color: Option<ColorMode>,
        jobs: Option<usize>,
        disabled_rules: Option<Vec<String>>,
        selected_rules: Option<Vec<String>>,
        fail_on: Option<Severity>,
        timeout_ms: Option<u64>,
    ) {
        if let Some(f) = format {
            self.output.format = f;
        }
        if let Some(v) = verbose {
            self.output.verbose = v;
        }
        if let Some(c) = color {
            self.output.color = c;
        }
        if let Some(j) = jobs {
            self.engine.jobs = j;
        }
        if let Some(disabled) = disabled_rules {
            self.rules.disabled.extend(disabled);
        }
        if let Some(selected) = selected_rules {
            self.rules.select = selected;
        }
        if fail_on.is_some() {
            self.fail_on = fail_on;
        }
        if timeout_ms.is_some() {
            self.engine.timeout_ms = timeout_ms;
        }
    }

    /// Check if a rule is enabled. The `disabled` list wins over everything,
    /// then `select`, then the rule's own `enabled` flag.
    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        if self.rules.disabled.iter().any(|r| r == rule_id) {
            return false;
        }

        if !self.rules.select.is_empty() && !self.rules.select.iter().any(|r| r == rule_id) {
            return false;
        }

        self.rules
            .overrides
            .get(rule_id)
            .and_then(|o| o.enabled)
            .unwrap_or(true)
    }

    /// Every rule id the configuration mentions, with where it was found
    pub fn referenced_rules(&self) -> Vec<(String, String)> {
        let mut ids = Vec::new();
        for id in self.rules.overrides.keys() {
            ids.push((id.clone(), "rules".to_string()));
        }
        for id in self.rules.disabled.iter().chain(&self.rules.select) {
            ids.push((id.clone(), "rules".to_string()));
        }
        for rules in self.rules.per_file.values() {
            for id in rules.iter().filter(|r| r.as_str() != "all") {
                ids.push((id.clone(), "rules.per_file".to_string()));
            }
        }
        for (lang, section) in &self.languages {
            for id in section.rules.keys() {
                ids.push((id.clone(), format!("languages.{}.rules", lang)));
            }
        }
        ids
    }

    /// Failing-severity threshold in effect
    pub fn fail_on(&self) -> Severity {
        self.fail_on.unwrap_or(Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::new();
        assert!(config.engine.parallel);
        assert_eq!(config.engine.jobs, 0);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.files.include.is_empty());
        assert_eq!(config.fail_on(), Severity::Error);
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("github".parse::<OutputFormat>().unwrap(), OutputFormat::Github);
        assert!("sarif".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_config_merge_cli() {
        let mut config = Config::new();
        config.merge_cli(
            Some(OutputFormat::Json),
            Some(true),
            Some(ColorMode::Never),
            Some(4),
            Some(vec!["line-length".to_string()]),
            None,
            Some(Severity::Warning),
            Some(500),
        );

        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.verbose);
        assert_eq!(config.output.color, ColorMode::Never);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.engine.timeout_ms, Some(500));
        assert_eq!(config.fail_on(), Severity::Warning);
        assert!(!config.is_rule_enabled("line-length"));
    }

    #[test]
    fn test_rule_enabled() {
        let mut config = Config::new();
        assert!(config.is_rule_enabled("line-length"));

        config.rules.overrides.insert(
            "magic-literal".to_string(),
            RuleOverride {
                enabled: Some(false),
                ..RuleOverride::default()
            },
        );
        assert!(!config.is_rule_enabled("magic-literal"));

        config.rules.select = vec!["naming-convention".to_string()];
        assert!(!config.is_rule_enabled("line-length"));
        assert!(config.is_rule_enabled("naming-convention"));

        config.rules.disabled.push("naming-convention".to_string());
        assert!(!config.is_rule_enabled("naming-convention"));
    }

    #[test]
    fn test_yaml_deserialize() {
        let yaml = r#"
engine:
  parallel: false
  jobs: 4
output:
  format: json
fail_on: warning
rules:
  disabled: [verb-named-method]
  per_file:
    "tests/**": [magic-literal]
  line-length:
    severity: error
    params:
      soft: 100
      hard: 140
languages:
  python:
    naming:
      method: '^[a-z_]+$'
    rules:
      block-length:
        params: { hard: 40 }
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(!config.engine.parallel);
        assert_eq!(config.engine.jobs, 4);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.fail_on, Some(Severity::Warning));
        assert_eq!(config.rules.disabled, vec!["verb-named-method"]);
        assert_eq!(config.rules.per_file["tests/**"], vec!["magic-literal"]);

        let line_length = &config.rules.overrides["line-length"];
        assert_eq!(line_length.severity, Some(Severity::Error));
        assert_eq!(line_length.params.usize("soft"), Some(100));
        assert!(!config.rules.overrides.contains_key("disabled"));

        let python = &config.languages["python"];
        assert_eq!(python.naming[&DeclKind::Method], "^[a-z_]+$");
        assert_eq!(python.rules["block-length"].params.usize("hard"), Some(40));
    }

    #[test]
    fn test_unknown_rule_field_is_rejected() {
        let yaml = "rules:\n  line-length:\n    threshold: 3\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_presets() {
        assert!(Config::preset("recommended").is_some());
        assert_eq!(
            Config::preset("strict").map(|c| c.fail_on()),
            Some(Severity::Warning)
        );
        let minimal = Config::preset("minimal").unwrap();
        assert!(!minimal.is_rule_enabled("magic-literal"));
        assert!(minimal.is_rule_enabled("line-length"));
        assert!(Config::preset("bogus").is_none());
    }

    #[test]
    fn test_extends_and_deep_merge() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("base.yaml"),
            "rules:\n  line-length:\n    params:\n      soft: 90\n      hard: 130\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(".kerf.yaml"),
            "extends: [minimal, base.yaml]\nrules:\n  line-length:\n    params:\n      soft: 100\n  magic-literal:\n    enabled: true\n",
        )
        .unwrap();

        let config = Config::load(&dir.path().join(".kerf.yaml")).unwrap();
        let params = &config.rules.overrides["line-length"].params;
        assert_eq!(params.usize("soft"), Some(100));
        assert_eq!(params.usize("hard"), Some(130));
        assert!(config.is_rule_enabled("magic-literal"));
        assert!(!config.is_rule_enabled("explanatory-comment"));
    }

    #[test]
    fn test_extends_cycle_is_bounded() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yaml"), "extends: [b.yaml]\n").unwrap();
        fs::write(dir.path().join("b.yaml"), "extends: [a.yaml]\n").unwrap();

        let err = Config::load(&dir.path().join("a.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_json_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kerf.json");
        fs::write(&path, r#"{"rules": {"method-separation": {"params": {"required": 1}}}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.rules.overrides["method-separation"].params.usize("required"),
            Some(1)
        );
    }

    #[test]
    fn test_referenced_rules() {
        let yaml = "rules:\n  disabled: [nope]\nlanguages:\n  java:\n    rules:\n      other: {}\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let ids = config.referenced_rules();
        assert!(ids.contains(&("nope".to_string(), "rules".to_string())));
        assert!(ids.contains(&("other".to_string(), "languages.java.rules".to_string())));
    }
}
