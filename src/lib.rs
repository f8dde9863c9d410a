//! Kerf - A language-agnostic style-convention linter
//!
//! Kerf checks source files against structural style conventions (line
//! length, naming, block shape, blank lines, declaration order) without
//! compiling them. Every supported language is reduced to the same neutral
//! source model, and the rules only ever look at that model.
//!
//! # Architecture
//!
//! ```text
//! CLI/API -> Engine -> LanguageAdapter -> SourceFile -> Rules -> Report
//! ```
//!
//! The engine resolves the configuration into an [`ActiveRuleSet`] before
//! touching any file, picks an adapter per file by extension, parses the file
//! once and runs every active rule over the result.
//!
//! # Adding a language
//!
//! Languages are data. Add a `languages` section to `.kerf.yaml`:
//!
//! ```yaml
//! languages:
//!   groovy:
//!     syntax:
//!       extensions: [groovy]
//!       keywords:
//!         method: [def]
//!     naming:
//!       method: '^[a-z][A-Za-z0-9]*$'
//! ```

pub mod adapter;
pub mod adapters;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod language;
pub mod lexer;
pub mod model;
pub mod output;
pub mod registry;
pub mod report;
pub mod rule;
pub mod rules;

// Re-export main types
pub use adapter::{LanguageAdapter, ParseError};
pub use config::{ActiveRuleSet, Config, ConfigError};
pub use diagnostic::{Location, RuleFailure, Severity, Violation};
pub use engine::{check, CancellationToken, CheckOutcome, Engine};
pub use language::{LanguageRegistry, LanguageSyntax};
pub use model::SourceFile;
pub use output::{
    formatter_for, CompactFormatter, GithubFormatter, JsonFormatter, OutputFormatter,
    TextFormatter,
};
pub use registry::RuleRegistry;
pub use report::{FileReport, Report, RunStatus, Summary, ViolationRecord};
pub use rule::{Rule, RuleCategory, RuleContext, RuleError, RuleParams};
