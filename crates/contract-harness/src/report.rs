//! Per-test results.

use std::fmt;
use std::time::Duration;

/// Outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed(String),
    /// Not run because its setup did not complete.
    Skipped(String),
}

impl TestOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed)
    }
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub name: String,
    pub outcome: TestOutcome,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub key: String,
    pub name: String,
    pub tests: Vec<TestReport>,
    /// Failure of the `before` hook, if any.
    pub setup_error: Option<String>,
    /// Failure of the `after` hook. Does not change any test outcome.
    pub teardown_error: Option<String>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.outcome.is_passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| matches!(t.outcome, TestOutcome::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| matches!(t.outcome, TestOutcome::Skipped(_)))
            .count()
    }

    /// Outcome of the test named `name`.
    pub fn outcome(&self, name: &str) -> Option<&TestOutcome> {
        self.tests.iter().find(|t| t.name == name).map(|t| &t.outcome)
    }

    /// Every test passed and teardown succeeded.
    pub fn is_success(&self) -> bool {
        self.teardown_error.is_none() && self.tests.iter().all(|t| t.outcome.is_passed())
    }
}

impl fmt::Display for SuiteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        if let Some(err) = &self.setup_error {
            writeln!(f, "  setup failed: {}", err)?;
        }
        for test in &self.tests {
            let millis = test.duration.as_millis();
            match &test.outcome {
                TestOutcome::Passed => writeln!(f, "  ok      {} ({}ms)", test.name, millis)?,
                TestOutcome::Failed(msg) => {
                    writeln!(f, "  FAILED  {} ({}ms)", test.name, millis)?;
                    writeln!(f, "          {}", msg)?;
                }
                TestOutcome::Skipped(msg) => {
                    writeln!(f, "  skipped {}", test.name)?;
                    writeln!(f, "          {}", msg)?;
                }
            }
        }
        if let Some(err) = &self.teardown_error {
            writeln!(f, "  teardown failed: {}", err)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    pub fn suite(&self, key: &str) -> Option<&SuiteReport> {
        self.suites.iter().find(|s| s.key == key)
    }

    pub fn passed(&self) -> usize {
        self.suites.iter().map(SuiteReport::passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.suites.iter().map(SuiteReport::failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.suites.iter().map(SuiteReport::skipped).sum()
    }

    pub fn is_success(&self) -> bool {
        self.suites.iter().all(SuiteReport::is_success)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for suite in &self.suites {
            writeln!(f, "{}", suite)?;
        }
        write!(
            f,
            "{} passing, {} failing, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}
