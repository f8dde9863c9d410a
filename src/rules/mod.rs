//! Built-in rule catalog

mod blank_line_placement;
mod block_delimiter;
mod block_length;
mod declaration_order;
mod explanatory_comment;
mod line_length;
mod magic_literal;
mod method_separation;
mod naming_convention;
mod verb_named_method;

pub use blank_line_placement::BlankLinePlacement;
pub use block_delimiter::BlockDelimiter;
pub use block_length::BlockLength;
pub use declaration_order::DeclarationOrder;
pub use explanatory_comment::ExplanatoryComment;
pub use line_length::LineLength;
pub use magic_literal::MagicLiteral;
pub use method_separation::MethodSeparation;
pub use naming_convention::NamingConvention;
pub use verb_named_method::VerbNamedMethod;

use crate::rule::Rule;
use std::sync::Arc;

/// Every rule shipped with kerf
pub fn builtin_rules() -> Vec<Arc<dyn Rule>> {
    vec![
        Arc::new(LineLength),
        Arc::new(NamingConvention),
        Arc::new(MagicLiteral),
        Arc::new(BlockDelimiter),
        Arc::new(BlockLength),
        Arc::new(BlankLinePlacement),
        Arc::new(MethodSeparation),
        Arc::new(DeclarationOrder),
        Arc::new(VerbNamedMethod),
        Arc::new(ExplanatoryComment),
    ]
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::diagnostic::Violation;
    use crate::language::LanguageRegistry;
    use crate::model::SourceFile;
    use crate::rule::{Rule, RuleContext, RuleParams};
    use std::path::Path;

    pub fn parse(lang: &str, text: &str) -> SourceFile {
        let registry = LanguageRegistry::builtin().expect("registry");
        let adapter = registry.get(lang).expect("language");
        adapter.parse(text, Path::new("test")).expect("parse")
    }

    /// Run a rule with its default params
    pub fn run(rule: &dyn Rule, lang: &str, text: &str) -> Vec<Violation> {
        run_with(rule, lang, text, &rule.default_params())
    }

    pub fn run_with(rule: &dyn Rule, lang: &str, text: &str, overrides: &RuleParams) -> Vec<Violation> {
        let file = parse(lang, text);
        let mut params = rule.default_params();
        params.merge(overrides);
        let ctx = RuleContext::new(&file, &params, rule.default_severity());
        rule.check(&ctx).expect("rule runs")
    }

    /// (line, column) of each violation
    pub fn positions(violations: &[Violation]) -> Vec<(usize, usize)> {
        violations
            .iter()
            .map(|v| (v.location.line, v.location.column))
            .collect()
    }
}
