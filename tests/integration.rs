//! End-to-end checks through the public API: config in, files on disk,
//! report out.

use kerf::config::{Config, ConfigError};
use kerf::engine::{CancellationToken, Engine};
use kerf::output::{CompactFormatter, JsonFormatter, OutputFormatter};
use kerf::report::{Report, RunStatus};
use kerf::Severity;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("write fixture");
    path
}

fn config_selecting(rules: &[&str]) -> Config {
    let mut config = Config::new();
    config.rules.select = rules.iter().map(|r| r.to_string()).collect();
    config
}

fn check(config: Config, files: &[PathBuf]) -> Report {
    Engine::new(config).expect("valid config").check(files)
}

fn positions(report: &Report) -> Vec<(String, usize, usize)> {
    report
        .violations()
        .map(|v| (v.rule_id.clone(), v.location.line, v.location.column))
        .collect()
}

#[test]
fn line_length_reports_one_violation_per_line() {
    let dir = TempDir::new().unwrap();
    let text = format!("{}\n{}\n{}\n", "a".repeat(80), "b".repeat(81), "c".repeat(121));
    let file = write(&dir, "long.py", &text);

    let report = check(config_selecting(&["line-length"]), &[file]);

    let severities: Vec<_> = report.violations().map(|v| v.severity).collect();
    assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
    assert_eq!(report.status(), RunStatus::ViolationsFound);
}

#[test]
fn constant_after_field_is_one_ordering_violation() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "Order.java",
        "public class Order {\n    private int count;\n    public static final int MAX = 5;\n}\n",
    );

    let report = check(config_selecting(&["declaration-order"]), &[file]);

    assert_eq!(positions(&report), vec![("declaration-order".to_string(), 3, 29)]);
}

#[test]
fn block_delimiter_depends_on_body_span() {
    let dir = TempDir::new().unwrap();
    let two_lines = write(&dir, "Two.java", "void f() {\n    if (ready)\n        go();\n}\n");
    let one_line = write(&dir, "One.java", "void f() {\n    if (ready) go();\n}\n");

    let report = check(config_selecting(&["block-delimiter"]), &[two_lines.clone()]);
    assert_eq!(positions(&report), vec![("block-delimiter".to_string(), 2, 5)]);
    assert_eq!(report.status(), RunStatus::ViolationsFound);

    let report = check(config_selecting(&["block-delimiter"]), &[one_line]);
    assert_eq!(report.summary().total(), 0);
    assert_eq!(report.status(), RunStatus::Success);
}

#[test]
fn method_separation_counts_blank_lines() {
    let dir = TempDir::new().unwrap();
    let one_blank = write(&dir, "One.java", "class Shop {\n    void open() {\n    }\n\n    void close() {\n    }\n}\n");
    let two_blank = write(&dir, "Two.java", "class Shop {\n    void open() {\n    }\n\n\n    void close() {\n    }\n}\n");

    let report = check(config_selecting(&["method-separation"]), &[one_blank, two_blank]);

    assert_eq!(report.files[0].violations.len(), 1);
    assert_eq!(
        report.files[0].violations[0].message,
        "expected 2 blank lines before method 'close', found 1"
    );
    assert!(report.files[1].violations.is_empty());
}

#[test]
fn python_methods_use_the_same_separation() {
    let dir = TempDir::new().unwrap();
    let one_blank = write(&dir, "one.py", "class Shop:\n    def open(self):\n        pass\n\n    def close(self):\n        pass\n");
    let two_blank = write(&dir, "two.py", "class Shop:\n    def open(self):\n        pass\n\n\n    def close(self):\n        pass\n");

    let report = check(config_selecting(&["method-separation"]), &[one_blank, two_blank]);

    assert_eq!(positions(&report), vec![("method-separation".to_string(), 5, 9)]);
    assert_eq!(
        report.files[0].violations[0].message,
        "expected 2 blank lines before method 'close', found 1"
    );
    assert!(report.files[1].violations.is_empty());
}

#[test]
fn magic_literal_needs_a_named_constant() {
    let dir = TempDir::new().unwrap();
    let bare = write(&dir, "bare.js", "if (value <= 50) {\n  go();\n}\n");
    let named = write(&dir, "named.js", "const MAX = 50;\nif (value <= MAX) {\n  go();\n}\n");

    let report = check(config_selecting(&["magic-literal"]), &[bare, named]);

    assert_eq!(positions(&report), vec![("magic-literal".to_string(), 1, 14)]);
    assert_eq!(report.summary().files_with_violations, 1);
}

#[test]
fn checking_twice_gives_identical_reports() {
    let dir = TempDir::new().unwrap();
    let files = vec![
        write(&dir, "A.java", "class A {\n    int X = 3;\n    void run() {\n        if (x > 7)\n            go();\n    }\n}\n"),
        write(&dir, "b.py", "def Run():\n    if x > 7:\n        go()\n"),
    ];

    let engine = Engine::new(Config::new()).unwrap();
    let first = engine.check(&files);
    let second = engine.check(&files);

    assert_eq!(first, second);
    let json = JsonFormatter::new().pretty();
    assert_eq!(json.format(&first), json.format(&second));
}

#[test]
fn file_order_does_not_change_per_file_results() {
    let dir = TempDir::new().unwrap();
    let a = write(&dir, "a.js", "if (a < 10) {\n  go(20);\n}\n");
    let b = write(&dir, "b.js", "function Bad() {\n}\n");
    let c = write(&dir, "c.py", "x = 1\n");

    let engine = Engine::new(Config::new()).unwrap();
    let forward = engine.check(&[a.clone(), b.clone(), c.clone()]);
    let shuffled = engine.check(&[c, a, b]);

    let order: Vec<_> = shuffled.files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(order[0], dir.path().join("c.py"));

    for file in &forward.files {
        let other = shuffled
            .files
            .iter()
            .find(|f| f.path == file.path)
            .expect("same files");
        assert_eq!(file, other);
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let dir = TempDir::new().unwrap();
    let files: Vec<PathBuf> = (0..8)
        .map(|i| write(&dir, &format!("F{}.java", i), "class F {\n    void a() {\n    }\n    void b() {\n    }\n}\n"))
        .collect();

    let parallel = check(Config::new(), &files);
    let mut config = Config::new();
    config.engine.parallel = false;
    let sequential = check(config, &files);

    assert_eq!(parallel, sequential);
}

#[test]
fn suppression_comments_drop_violations() {
    let dir = TempDir::new().unwrap();
    let text = format!(
        "// kerf-disable-next-line line-length -- generated table\nint[] table = {{{}}};\nint[] other = {{{}}};\n",
        "1, ".repeat(40),
        "2, ".repeat(40)
    );
    let file = write(&dir, "Table.java", &text);

    let report = check(config_selecting(&["line-length"]), &[file]);

    let lines: Vec<_> = report.violations().map(|v| v.location.line).collect();
    assert_eq!(lines, vec![3]);
}

#[test]
fn unknown_rule_in_config_is_rejected_before_checking() {
    let dir = TempDir::new().unwrap();
    let config_path = write(&dir, ".kerf.yaml", "rules:\n  no-such-rule:\n    enabled: false\n");

    let config = Config::load(&config_path).expect("parses");
    match Engine::new(config) {
        Err(ConfigError::UnknownRule { rule, .. }) => assert_eq!(rule, "no-such-rule"),
        other => panic!("expected unknown rule error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn invalid_params_are_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        &dir,
        "kerf.yaml",
        "rules:\n  line-length:\n    params: { soft: 200, hard: 100 }\n",
    );

    let config = Config::load(&config_path).expect("parses");
    assert!(matches!(
        Engine::new(config),
        Err(ConfigError::InvalidParam { .. })
    ));
}

#[test]
fn config_params_reach_the_rules() {
    let dir = TempDir::new().unwrap();
    let config_path = write(
        &dir,
        ".kerf.yaml",
        "rules:\n  select: [line-length]\n  line-length:\n    params: { soft: 20, hard: 40 }\n",
    );
    let file = write(&dir, "short.py", "value = compute(alpha, beta, gamma)\n");

    let report = check(Config::load(&config_path).unwrap(), &[file]);

    assert_eq!(positions(&report), vec![("line-length".to_string(), 1, 21)]);
    assert_eq!(report.files[0].violations[0].severity, Severity::Warning);
}

#[test]
fn unparseable_file_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let broken = write(&dir, "Broken.java", "class Broken {\n    void f() {\n}\n");
    let fine = write(&dir, "fine.py", "x = 1\n");

    let report = check(Config::new(), &[broken, fine]);

    assert_eq!(report.files.len(), 2);
    let broken = &report.files[0];
    assert_eq!(broken.violations.len(), 1);
    assert_eq!(broken.violations[0].rule_id, "unparseable-file");
    assert_eq!(broken.violations[0].severity, Severity::Error);
    assert!(report.files[1].violations.is_empty());
}

#[test]
fn unknown_language_is_skipped_without_violations() {
    let dir = TempDir::new().unwrap();
    let notes = write(&dir, "notes.txt", &"word ".repeat(100));

    let report = check(Config::new(), &[notes]);

    assert_eq!(report.files[0].language, None);
    assert_eq!(report.status(), RunStatus::Success);
}

#[test]
fn cancelled_run_reports_cancelled_status() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.py", "x = 1\n");

    let engine = Engine::new(Config::new()).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let outcome = engine.check_with_cancel(&[file], &token);

    assert!(outcome.cancelled);
    assert!(outcome.report.files.is_empty());
    assert_eq!(outcome.status(), RunStatus::Cancelled);
    assert_eq!(outcome.status().exit_code(), 3);
}

#[test]
fn compact_output_lists_violations_in_order() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "a.js", "if (value <= 50) {\n  go();\n}\n");

    let report = check(config_selecting(&["magic-literal"]), &[file.clone()]);
    let output = CompactFormatter::new().format(&report);

    assert_eq!(
        output,
        format!(
            "{}:1:14: warning [magic-literal] magic literal 50 in comparison; use a named constant\n",
            file.display()
        )
    );
}
