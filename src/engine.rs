//! Core check engine
//!
//! Files are checked in parallel on a rayon pool; the rules for one file run
//! in parallel against the same immutable [`SourceFile`]. Each file's result
//! is written once into its own slot, so the report keeps the order the
//! files were supplied in no matter which worker finished first.

use crate::adapter::LanguageAdapter;
use crate::config::{resolve, ActiveRuleSet, Config, ConfigError, RulePlan};
use crate::diagnostic::{Location, RuleFailure, Severity, Violation};
use crate::model::SourceFile;
use crate::registry::RuleRegistry;
use crate::report::{FileReport, Report, RunStatus};
use crate::rule::{RuleContext, RuleError};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Cooperative cancellation shared between the caller and the workers.
///
/// Clones share the same flag. A deadline, when set, cancels implicitly once
/// it has passed.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that cancels itself after `timeout`
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Same flag, with the deadline tightened to `timeout` from now
    pub fn limited(&self, timeout: Option<Duration>) -> Self {
        let deadline = timeout.map(|t| Instant::now() + t);
        Self {
            flag: Arc::clone(&self.flag),
            deadline: match (self.deadline, deadline) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            },
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Result of a run that may have been cancelled
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    /// Files finished before cancellation (all files otherwise)
    pub report: Report,
    pub cancelled: bool,
    pub duration: Duration,
}

impl CheckOutcome {
    pub fn status(&self) -> RunStatus {
        if self.cancelled {
            RunStatus::Cancelled
        } else {
            self.report.status()
        }
    }
}

/// The main check engine
pub struct Engine {
    /// Configuration
    config: Config,

    /// Resolved rules per language
    rules: ActiveRuleSet,
}

impl Engine {
    /// Create an engine with the built-in rules. Fails before any file is
    /// touched if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Self::with_registry(config, &RuleRegistry::builtin())
    }

    /// Create an engine over a custom rule registry
    pub fn with_registry(config: Config, registry: &RuleRegistry) -> Result<Self, ConfigError> {
        let rules = resolve(registry, &config)?;
        Ok(Self { config, rules })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rules(&self) -> &ActiveRuleSet {
        &self.rules
    }

    /// Check files to completion (or until `engine.timeout_ms` runs out)
    pub fn check(&self, files: &[PathBuf]) -> Report {
        self.check_with_cancel(files, &CancellationToken::new()).report
    }

    /// Check files, stopping early when the token is cancelled
    pub fn check_with_cancel(&self, files: &[PathBuf], token: &CancellationToken) -> CheckOutcome {
        let start = Instant::now();
        let token = token.limited(self.config.engine.timeout_ms.map(Duration::from_millis));
        let slots: Mutex<Vec<Option<FileReport>>> = Mutex::new(vec![None; files.len()]);
        let interrupted = AtomicBool::new(false);

        let run = |(i, path): (usize, &PathBuf)| match self.check_file(path, &token) {
            Some(file) => slots.lock().unwrap_or_else(PoisonError::into_inner)[i] = Some(file),
            None => interrupted.store(true, Ordering::SeqCst),
        };

        if self.config.engine.parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(if self.config.engine.jobs > 0 {
                    self.config.engine.jobs
                } else {
                    num_cpus::get()
                })
                .build();

            match pool {
                Ok(pool) => pool.install(|| files.par_iter().enumerate().for_each(&run)),
                Err(e) => {
                    warn!("could not start worker pool ({}), checking sequentially", e);
                    files.iter().enumerate().for_each(&run);
                }
            }
        } else {
            files.iter().enumerate().for_each(&run);
        }

        let mut report = Report::new(self.rules.fail_on());
        for file in slots
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_iter()
            .flatten()
        {
            report.push(file);
        }

        let cancelled = interrupted.load(Ordering::SeqCst);
        let duration = start.elapsed();
        info!(
            "checked {} of {} files in {:.2?}{}",
            report.files.len(),
            files.len(),
            duration,
            if cancelled { " (cancelled)" } else { "" }
        );

        CheckOutcome {
            report,
            cancelled,
            duration,
        }
    }

    /// Check one file from disk. Returns `None` when cancelled mid-way.
    pub fn check_file(&self, path: &Path, token: &CancellationToken) -> Option<FileReport> {
        if token.is_cancelled() {
            return None;
        }

        let Some(adapter) = self.rules.languages().for_path(path) else {
            warn!("{}: no language profile for this file, skipped", path.display());
            return Some(FileReport::new(path.to_path_buf(), None));
        };

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                let mut report = FileReport::new(path.to_path_buf(), Some(adapter.id().to_string()));
                report.violations.push(Violation::new(
                    "unreadable-file",
                    Severity::Error,
                    &format!("could not read file: {}", e),
                    Location::file_level(path.to_path_buf()),
                ));
                return Some(report);
            }
        };

        self.check_text(path, &text, adapter.as_ref(), token)
    }

    /// Check in-memory source, choosing the language from `path`
    pub fn check_source(&self, path: &Path, text: &str) -> FileReport {
        match self.rules.languages().for_path(path) {
            Some(adapter) => self
                .check_text(path, text, adapter.as_ref(), &CancellationToken::new())
                .unwrap_or_else(|| FileReport::new(path.to_path_buf(), None)),
            None => FileReport::new(path.to_path_buf(), None),
        }
    }

    fn check_text(
        &self,
        path: &Path,
        text: &str,
        adapter: &dyn LanguageAdapter,
        token: &CancellationToken,
    ) -> Option<FileReport> {
        let mut report = FileReport::new(path.to_path_buf(), Some(adapter.id().to_string()));

        let file = match adapter.parse(text, path) {
            Ok(file) => file,
            Err(e) => {
                debug!("{}: {}", path.display(), e);
                report.violations.push(Violation::new(
                    "unparseable-file",
                    Severity::Error,
                    &format!("could not parse file: {}", e),
                    Location::new(path.to_path_buf(), e.line().max(1), 1),
                ));
                return Some(report);
            }
        };

        if token.is_cancelled() {
            return None;
        }

        let plans: Vec<&RulePlan> = self
            .rules
            .plans_for(adapter.id())
            .iter()
            .filter(|p| !self.rules.is_ignored_for_file(p.rule.id(), path))
            .collect();

        let results: Vec<(&RulePlan, Result<Vec<Violation>, RuleError>)> =
            if self.config.engine.parallel {
                plans.par_iter().map(|p| (*p, evaluate(p, &file))).collect()
            } else {
                plans.iter().map(|p| (*p, evaluate(p, &file))).collect()
            };

        if token.is_cancelled() {
            return None;
        }

        for (plan, result) in results {
            match result {
                Ok(violations) => report.violations.extend(
                    violations
                        .into_iter()
                        .filter(|v| {
                            let line = v.location.line;
                            if !file.suppressions.is_suppressed(&v.rule_id, line) {
                                return true;
                            }
                            debug!(
                                "{}:{}: {} suppressed ({})",
                                path.display(),
                                line,
                                v.rule_id,
                                file.suppressions.reason(&v.rule_id, line).unwrap_or("no reason given")
                            );
                            false
                        })
                        .map(|v| {
                            let v = v.with_help(plan.rule.description());
                            match file.line(v.location.line) {
                                Some(line) => {
                                    let text = line.text.clone();
                                    v.with_source_line(&text)
                                }
                                None => v,
                            }
                        }),
                ),
                Err(e) => {
                    warn!("{}: rule {} failed: {}", path.display(), plan.rule.id(), e);
                    report.failures.push(RuleFailure {
                        rule_id: plan.rule.id().to_string(),
                        file: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            "{}: {} violations from {} rules",
            path.display(),
            report.violations.len(),
            plans.len()
        );
        Some(report)
    }
}

/// Run one rule, turning a panic into a [`RuleError`]
fn evaluate(plan: &RulePlan, file: &SourceFile) -> Result<Vec<Violation>, RuleError> {
    let ctx = RuleContext::new(file, &plan.params, plan.severity);
    panic::catch_unwind(AssertUnwindSafe(|| plan.rule.check(&ctx)))
        .unwrap_or_else(|payload| Err(RuleError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Check files with the built-in rules
pub fn check(paths: &[PathBuf], config: &Config) -> Result<Report, ConfigError> {
    Ok(Engine::new(config.clone())?.check(paths))
}
