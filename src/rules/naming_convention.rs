//! naming-convention: declaration names follow the casing pattern for their
//! kind

use crate::diagnostic::Violation;
use crate::model::DeclKind;
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};
use regex::Regex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::OnceLock;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new(
        "patterns",
        ParamKind::StringMap,
        "Regular expression per declaration kind (class, method, variable, field, constant)",
    ),
    ParamSpec::new(
        "forbid_interface_prefix",
        ParamKind::Boolean,
        "Reject type names marked with a leading 'I' (IService)",
    ),
];

fn interface_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^I[A-Z]").expect("interface prefix pattern is valid"))
}

pub struct NamingConvention;

impl NamingConvention {
    fn compile(params: &RuleParams) -> Result<HashMap<DeclKind, (String, Regex)>, RuleError> {
        let mut compiled = HashMap::new();
        for (kind, pattern) in params.string_map("patterns") {
            let decl_kind: DeclKind = kind
                .parse()
                .map_err(|e: String| RuleError::invalid_param("patterns", e))?;
            let re = Regex::new(&pattern).map_err(|e| {
                RuleError::invalid_param("patterns", format!("bad pattern for {}: {}", kind, e))
            })?;
            compiled.insert(decl_kind, (pattern, re));
        }
        Ok(compiled)
    }
}

impl Rule for NamingConvention {
    fn id(&self) -> &'static str {
        "naming-convention"
    }

    fn description(&self) -> &'static str {
        "Declaration names follow the casing convention for their kind and language"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Naming
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new()
            .with(
                "patterns",
                json!({
                    "class": "^[A-Z][A-Za-z0-9]*$",
                    "method": "^[a-z][A-Za-z0-9]*$",
                    "variable": "^[a-z][A-Za-z0-9]*$",
                    "field": "^_?[a-z][A-Za-z0-9]*$",
                    "constant": "^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$",
                }),
            )
            .with("forbid_interface_prefix", true)
    }

    fn validate(&self, params: &RuleParams) -> Result<(), RuleError> {
        Self::compile(params).map(|_| ())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let patterns = Self::compile(ctx.params)?;
        let forbid_prefix = ctx.params.bool("forbid_interface_prefix").unwrap_or(true);
        let mut violations = Vec::new();

        for decl in &ctx.file.declarations {
            // constructor names are fixed by the language
            if decl.kind == DeclKind::Constructor {
                continue;
            }
            let (line, column) = (decl.position.line, decl.position.column);

            if let Some((pattern, re)) = patterns.get(&decl.kind) {
                if !re.is_match(&decl.name) {
                    violations.push(ctx.violation(
                        self.id(),
                        ctx.severity,
                        line,
                        column,
                        &format!(
                            "{} name '{}' does not match '{}'",
                            decl.kind, decl.name, pattern
                        ),
                    ));
                    continue;
                }
            }

            if decl.kind == DeclKind::Class && forbid_prefix && interface_prefix_re().is_match(&decl.name) {
                violations.push(ctx.violation(
                    self.id(),
                    ctx.severity,
                    line,
                    column,
                    &format!("type name '{}' must not carry an 'I' prefix", decl.name),
                ));
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::{positions, run, run_with};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_java_names() {
        let text = "\
public class order_line {
    private static final int maxItems = 3;
    private int Count;

    public order_line() {
    }

    public void Submit() {
        int total_sum = 0;
    }
}
";
        let violations = run(&NamingConvention, "java", text);
        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "class name 'order_line' does not match '^[A-Z][A-Za-z0-9]*$'",
                "field name 'Count' does not match '^_?[a-z][A-Za-z0-9]*$'",
                "method name 'Submit' does not match '^[a-z][A-Za-z0-9]*$'",
                "variable name 'total_sum' does not match '^[a-z][A-Za-z0-9]*$'",
            ]
        );
        assert_eq!(positions(&violations)[0], (1, 14));
    }

    #[test]
    fn test_interface_prefix() {
        let text = "interface IService {\n}\n\ninterface Identity {\n}\n";
        let violations = run(&NamingConvention, "java", text);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "type name 'IService' must not carry an 'I' prefix"
        );

        let params = RuleParams::new().with("forbid_interface_prefix", false);
        assert!(run_with(&NamingConvention, "java", text, &params).is_empty());
    }

    #[test]
    fn test_interface_prefix_on_short_names() {
        let text = "class IX {\n}\n\nclass IDB {\n}\n\nclass Item {\n}\n";
        let violations = run(&NamingConvention, "java", text);
        assert_eq!(positions(&violations), vec![(1, 7), (4, 7)]);
    }

    #[test]
    fn test_pattern_override_merges() {
        let params = RuleParams::new().with("patterns", json!({"method": "^[a-z][a-z0-9_]*$"}));
        let text = "def load_data():\n    pass\n\n\nclass bad_name:\n    pass\n";
        let violations = run_with(&NamingConvention, "python", text, &params);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].location.line, 5);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let params = RuleParams::new().with("patterns", json!({"class": "([A-Z"}));
        assert!(NamingConvention.validate(&params).is_err());

        let params = RuleParams::new().with("patterns", json!({"widget": "^a$"}));
        assert!(NamingConvention.validate(&params).is_err());
    }
}
