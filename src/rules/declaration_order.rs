//! declaration-order: class members grouped by kind, then methods by visibility
//!
//! Members are walked in source order through a forward-only sequence of
//! states: constants, fields, constructors, then one state per visibility
//! in the configured order. A member belonging to an earlier state is
//! reported and the walk stays where it is.

use crate::diagnostic::Violation;
use crate::model::{BlockId, BlockKind, DeclKind, Declaration, Visibility};
use crate::rule::{ParamKind, ParamSpec, Rule, RuleCategory, RuleContext, RuleError, RuleParams};

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new(
        "visibility_order",
        ParamKind::StringList,
        "Order of method groups by visibility",
    ),
    ParamSpec::new(
        "unspecified_as",
        ParamKind::String,
        "Visibility assumed for methods without a visibility marker",
    ),
];

const CONSTANTS: usize = 0;
const FIELDS: usize = 1;
const CONSTRUCTORS: usize = 2;
const METHODS: usize = 3;

pub struct DeclarationOrder;

/// Resolved ordering for one run
struct Order {
    visibilities: Vec<Visibility>,
    unspecified_as: Visibility,
}

impl Order {
    fn from_params(params: &RuleParams) -> Result<Self, RuleError> {
        let visibilities = params
            .string_list("visibility_order")
            .iter()
            .map(|v| v.parse::<Visibility>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RuleError::invalid_param("visibility_order", e))?;
        let unspecified_as = params
            .str("unspecified_as")
            .unwrap_or("public")
            .parse::<Visibility>()
            .map_err(|e| RuleError::invalid_param("unspecified_as", e))?;
        Ok(Self {
            visibilities,
            unspecified_as,
        })
    }

    fn rank(&self, decl: &Declaration) -> Option<usize> {
        match decl.kind {
            DeclKind::Constant => Some(CONSTANTS),
            DeclKind::Field | DeclKind::Variable => Some(FIELDS),
            DeclKind::Constructor => Some(CONSTRUCTORS),
            DeclKind::Method => {
                let visibility = match decl.visibility {
                    Visibility::Unspecified => self.unspecified_as,
                    v => v,
                };
                let index = self
                    .visibilities
                    .iter()
                    .position(|&v| v == visibility)
                    .unwrap_or(self.visibilities.len());
                Some(METHODS + index)
            }
            DeclKind::Class => None,
        }
    }

    fn label(&self, state: usize) -> String {
        match state {
            CONSTANTS => "constants".to_string(),
            FIELDS => "fields".to_string(),
            CONSTRUCTORS => "constructors".to_string(),
            n => match self.visibilities.get(n - METHODS) {
                Some(v) => format!("{} methods", v),
                None => "other methods".to_string(),
            },
        }
    }
}

impl Rule for DeclarationOrder {
    fn id(&self) -> &'static str {
        "declaration-order"
    }

    fn description(&self) -> &'static str {
        "Class members follow constants, fields, constructors, then methods by visibility"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structure
    }

    fn params(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn default_params(&self) -> RuleParams {
        RuleParams::new()
            .with("visibility_order", vec!["public", "protected", "private"])
            .with("unspecified_as", "public")
    }

    fn validate(&self, params: &RuleParams) -> Result<(), RuleError> {
        Order::from_params(params).map(|_| ())
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let order = Order::from_params(ctx.params)?;
        let file = ctx.file;
        let mut violations = Vec::new();

        for (i, block) in file.blocks.iter().enumerate() {
            if block.kind != BlockKind::Class {
                continue;
            }
            let mut state = CONSTANTS;
            for decl in file.declarations_in(BlockId(i)) {
                let Some(rank) = order.rank(decl) else {
                    continue;
                };
                if rank >= state {
                    state = rank;
                    continue;
                }
                violations.push(ctx.violation(
                    self.id(),
                    ctx.severity,
                    decl.position.line,
                    decl.position.column,
                    &format!(
                        "{} '{}' must be declared before {}",
                        decl.kind,
                        decl.name,
                        order.label(state)
                    ),
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

    const SERVICE: &str = "\
class Service {
    static final int LIMIT = 1;
    int size;

    Service() {
    }

    private void helper() {
    }

    public void run() {
    }
}
";

    #[test]
    fn test_field_before_constant() {
        let text = "public class Order {\n    private int count;\n    public static final int MAX = 5;\n}\n";
        let violations = run(&DeclarationOrder, "java", text);
        assert_eq!(positions(&violations), vec![(3, 29)]);
        assert_eq!(
            violations[0].message,
            "constant 'MAX' must be declared before fields"
        );
    }

    #[test]
    fn test_method_visibility_order() {
        let violations = run(&DeclarationOrder, "java", SERVICE);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "method 'run' must be declared before private methods"
        );
    }

    #[test]
    fn test_no_rewind_after_violation() {
        let text = "\
class Mixed {
    void a() {
    }

    int x;
    int y;
}
";
        // both fields are late; the state stays at methods
        let violations = run(&DeclarationOrder, "java", text);
        assert_eq!(positions(&violations), vec![(5, 9), (6, 9)]);
    }

    #[test]
    fn test_custom_visibility_order() {
        let params = RuleParams::new().with("visibility_order", vec!["private", "protected", "public"]);
        assert!(run_with(&DeclarationOrder, "java", SERVICE, &params).is_empty());

        let bogus = RuleParams::new().with("visibility_order", vec!["secret"]);
        assert!(DeclarationOrder.validate(&bogus).is_err());
    }

    #[test]
    fn test_python_underscore_visibility() {
        let text = "\
class Cache:
    def _evict(self):
        pass

    def get(self, key):
        pass
";
        let violations = run(&DeclarationOrder, "python", text);
        assert_eq!(positions(&violations), vec![(5, 9)]);
        assert_eq!(
            violations[0].message,
            "method 'get' must be declared before protected methods"
        );
    }
}
