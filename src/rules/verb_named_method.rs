//! verb-named-method: method names start with a verb from a lexicon

use crate::diagnostic::{Severity, Violation};
use crate::model::DeclKind;
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[ParamSpec::new(
    "verbs",
    ParamKind::StringList,
    "Accepted leading words; the rule does nothing while this is empty",
)];

pub struct VerbNamedMethod;

/// First word of an identifier in any casing: `getName`, `get_name` and
/// `GetName` all give `get`
fn leading_word(name: &str) -> String {
    let trimmed = name.trim_start_matches(['_', '$', '#']);
    let mut word = String::new();
    for (i, c) in trimmed.chars().enumerate() {
        if i > 0 && (c.is_uppercase() || c == '_' || c.is_ascii_digit()) {
            break;
        }
        word.extend(c.to_lowercase());
    }
    word
}

impl Rule for VerbNamedMethod {
    fn id(&self) -> &'static str {
        "verb-named-method"
    }

    fn description(&self) -> &'static str {
        "Method names should start with a verb"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Naming
    }

    fn default_severity(&self) -> Severity {
        Severity::Advisory
    }

    fn is_advisory(&self) -> bool {
        true
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new().with("verbs", Vec::<String>::new())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let verbs: Vec<String> = ctx
            .params
            .string_list("verbs")
            .iter()
            .map(|v| v.to_lowercase())
            .collect();
        if verbs.is_empty() {
            return Ok(Vec::new());
        }

        let violations = ctx
            .file
            .declarations
            .iter()
            .filter(|d| d.kind == DeclKind::Method)
            .filter_map(|d| {
                let word = leading_word(&d.name);
                if word.is_empty() || verbs.contains(&word) {
                    return None;
                }
                Some(ctx.violation(
                    self.id(),
                    ctx.severity,
                    d.position.line,
                    d.position.column,
                    &format!("method '{}' should start with a verb (found '{}')", d.name, word),
                ))
            })
            .collect();

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{positions, run, run_with};
    use pretty_assertions::assert_eq;

    const JAVA: &str = "\
class Cart {
    Cart() {
    }

    int getCount() {
        return 0;
    }

    void total() {
    }
}
";

    #[test]
    fn test_leading_word() {
        assert_eq!(leading_word("getName"), "get");
        assert_eq!(leading_word("get_name"), "get");
        assert_eq!(leading_word("GetName"), "get");
        assert_eq!(leading_word("__load"), "load");
        assert_eq!(leading_word("parse2"), "parse");
    }

    #[test]
    fn test_inert_without_lexicon() {
        assert!(run(&VerbNamedMethod, "java", JAVA).is_empty());
    }

    #[test]
    fn test_lexicon() {
        let params = RuleParams::new().with("verbs", vec!["get", "set", "Compute"]);
        let violations = run_with(&VerbNamedMethod, "java", JAVA, &params);
        assert_eq!(positions(&violations), vec![(9, 10)]);
        assert_eq!(violations[0].severity, Severity::Advisory);
        assert_eq!(
            violations[0].message,
            "method 'total' should start with a verb (found 'total')"
        );
    }
}
