//! Suite Orchestrator.
//!
//! A [`Suite`] groups tests sharing setup and teardown. Hooks and test bodies are
//! plain functions receiving the explicit [`Context`]:
//!
//! ```no_run
//! use contract_harness::prelude::*;
//!
//! fn before(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
//!     async move {
//!         let pending = ctx.client().preflight(ctx.collection_url());
//!         ctx.store("preflight", pending);
//!         Ok(())
//!     }
//!     .boxed()
//! }
//!
//! fn allows_all_origins(ctx: &mut Context) -> BoxFuture<'_, StepResult> {
//!     async move {
//!         let preflight = ctx.pending("preflight")?;
//!         expect_eventually(&preflight, Facet::Headers)
//!             .to_have_property("access-control-allow-origin", "*")
//!             .await
//!     }
//!     .boxed()
//! }
//!
//! let suite = Suite::new("cors", "Cross Origin Requests")
//!     .before(before)
//!     .test("should allow all origins", allows_all_origins);
//! ```
//!
//! Phases run strictly in order `NotStarted -> SettingUp -> RunningTests ->
//! TearingDown -> Done`, re-entering `SettingUp` before each test when a
//! `before_each` hook is declared. Tests within a suite never overlap, and
//! [`Runner`] finishes one suite, teardown included, before starting the next.

use crate::context::Context;
use crate::error::{StepResult, TestError};
use crate::report::{RunReport, SuiteReport, TestOutcome, TestReport};
use futures::future::{BoxFuture, FutureExt};
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A hook or test body.
pub type Step = for<'a> fn(&'a mut Context) -> BoxFuture<'a, StepResult>;

/// Lifecycle phase of a running suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuitePhase {
    NotStarted,
    SettingUp,
    RunningTests,
    TearingDown,
    Done,
}

impl fmt::Display for SuitePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SuitePhase::NotStarted => "not-started",
            SuitePhase::SettingUp => "setting-up",
            SuitePhase::RunningTests => "running-tests",
            SuitePhase::TearingDown => "tearing-down",
            SuitePhase::Done => "done",
        })
    }
}

#[derive(Clone)]
struct TestCase {
    name: String,
    body: Step,
}

/// A named group of tests with `before`, `before_each` and `after` hooks.
#[derive(Clone)]
pub struct Suite {
    key: String,
    name: String,
    before: Option<Step>,
    before_each: Option<Step>,
    after: Option<Step>,
    tests: Vec<TestCase>,
}

impl Suite {
    /// `key` selects the suite from configuration; `name` is what reports show.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            before: None,
            before_each: None,
            after: None,
            tests: Vec::new(),
        }
    }

    /// Run once before the first test.
    pub fn before(mut self, hook: Step) -> Self {
        self.before = Some(hook);
        self
    }

    /// Run before every test.
    pub fn before_each(mut self, hook: Step) -> Self {
        self.before_each = Some(hook);
        self
    }

    /// Run once after all tests, whatever their outcome.
    pub fn after(mut self, hook: Step) -> Self {
        self.after = Some(hook);
        self
    }

    pub fn test(mut self, name: impl Into<String>, body: Step) -> Self {
        self.tests.push(TestCase {
            name: name.into(),
            body,
        });
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test_names(&self) -> impl Iterator<Item = &str> {
        self.tests.iter().map(|t| t.name.as_str())
    }

    /// Run the suite to completion against `ctx`. Scenario state is reset first.
    pub async fn run(&self, ctx: &mut Context) -> SuiteReport {
        ctx.reset();
        let mut phase = PhaseTracker::new(&self.name);

        let mut report = SuiteReport {
            key: self.key.clone(),
            name: self.name.clone(),
            tests: Vec::with_capacity(self.tests.len()),
            setup_error: None,
            teardown_error: None,
        };

        if let Some(hook) = self.before {
            phase.advance(SuitePhase::SettingUp);
            if let Err(err) = run_hook(hook, ctx).await {
                warn!(suite = %self.name, error = %err, "Setup failed, skipping suite tests");
                report.setup_error = Some(err.to_string());
            }
        }

        for test in &self.tests {
            if let Some(reason) = &report.setup_error {
                report.tests.push(skipped(test, format!("before hook failed: {}", reason)));
                continue;
            }

            if let Some(hook) = self.before_each {
                phase.advance(SuitePhase::SettingUp);
                if let Err(err) = run_hook(hook, ctx).await {
                    warn!(suite = %self.name, test = %test.name, error = %err, "Setup failed, skipping test");
                    report.tests.push(skipped(test, format!("beforeEach hook failed: {}", err)));
                    continue;
                }
            }

            phase.advance(SuitePhase::RunningTests);
            report.tests.push(run_test(&self.name, test, ctx).await);
        }

        if let Some(hook) = self.after {
            phase.advance(SuitePhase::TearingDown);
            if let Err(err) = run_hook(hook, ctx).await {
                warn!(suite = %self.name, error = %err, "Teardown failed");
                report.teardown_error = Some(err.to_string());
            }
        }

        phase.advance(SuitePhase::Done);
        report
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("before", &self.before.is_some())
            .field("before_each", &self.before_each.is_some())
            .field("after", &self.after.is_some())
            .field("tests", &self.tests.len())
            .finish()
    }
}

struct PhaseTracker<'a> {
    suite: &'a str,
    current: SuitePhase,
}

impl<'a> PhaseTracker<'a> {
    fn new(suite: &'a str) -> Self {
        Self {
            suite,
            current: SuitePhase::NotStarted,
        }
    }

    fn advance(&mut self, next: SuitePhase) {
        if self.current != next {
            debug!(suite = %self.suite, from = %self.current, to = %next, "Suite phase");
            self.current = next;
        }
    }
}

/// Run a hook, then wait for every pending result it stored.
async fn run_hook(hook: Step, ctx: &mut Context) -> StepResult {
    guarded(hook, ctx).await?;
    ctx.settle_stored().await;
    Ok(())
}

async fn run_test(suite: &str, test: &TestCase, ctx: &mut Context) -> TestReport {
    let started = Instant::now();
    let outcome = match guarded(test.body, ctx).await {
        Ok(()) => TestOutcome::Passed,
        Err(err) => TestOutcome::Failed(err.to_string()),
    };
    let duration = started.elapsed();

    match &outcome {
        TestOutcome::Failed(reason) => {
            info!(suite = %suite, test = %test.name, reason = %reason, "Test failed");
        }
        _ => info!(suite = %suite, test = %test.name, elapsed_ms = duration.as_millis() as u64, "Test passed"),
    }

    TestReport {
        name: test.name.clone(),
        outcome,
        duration,
    }
}

/// Run a step, turning a panic into a failure of that step only.
async fn guarded(step: Step, ctx: &mut Context) -> StepResult {
    match AssertUnwindSafe(step(ctx)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(TestError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn skipped(test: &TestCase, reason: String) -> TestReport {
    TestReport {
        name: test.name.clone(),
        outcome: TestOutcome::Skipped(reason),
        duration: std::time::Duration::ZERO,
    }
}

/// Runs suites one after another against a shared context.
#[derive(Debug, Default)]
pub struct Runner {
    suites: Vec<Suite>,
}

impl Runner {
    pub fn new(suites: Vec<Suite>) -> Self {
        Self { suites }
    }

    /// Keep only the suites whose key is in `keys`. An empty list keeps all.
    ///
    /// Returns the unknown key on error.
    pub fn select(self, keys: &[String]) -> Result<Self, String> {
        if keys.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = keys.iter().find(|k| !self.suites.iter().any(|s| &s.key == *k)) {
            return Err(unknown.clone());
        }
        let suites = self
            .suites
            .into_iter()
            .filter(|s| keys.contains(&s.key))
            .collect();
        Ok(Self { suites })
    }

    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Run every suite in declaration order.
    pub async fn run(&self, ctx: &mut Context) -> RunReport {
        let mut report = RunReport::default();
        for suite in &self.suites {
            info!(suite = %suite.name, "Running suite");
            report.suites.push(suite.run(ctx).await);
        }
        report
    }
}
