//! Result ledger - ordered record of check outcomes

use serde::{Deserialize, Serialize};

/// Pass/fail status of a single outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            Status::Pass
        } else {
            Status::Fail
        }
    }

    pub fn is_pass(self) -> bool {
        self == Status::Pass
    }
}

/// Recorded result of one check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default)]
    pub duration_ms: u64,
}

/// Totals derived from a ledger
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Percentage of passed outcomes, 0.0 for an empty ledger
    pub success_rate: f64,
}

/// Append-only sequence of outcomes in execution order.
///
/// Counters are kept alongside the outcomes so that `total == passed + failed`
/// holds after every append.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultLedger {
    outcomes: Vec<TestOutcome>,
    passed: usize,
    failed: usize,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an outcome and return a reference to it
    pub fn record(&mut self, name: impl Into<String>, passed: bool, detail: impl Into<String>) -> &TestOutcome {
        self.record_timed(name, passed, detail, 0)
    }

    pub fn record_timed(
        &mut self,
        name: impl Into<String>,
        passed: bool,
        detail: impl Into<String>,
        duration_ms: u64,
    ) -> &TestOutcome {
        if passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }

        self.outcomes.push(TestOutcome {
            name: name.into(),
            status: Status::from_passed(passed),
            detail: detail.into(),
            duration_ms,
        });

        &self.outcomes[self.outcomes.len() - 1]
    }

    pub fn summary(&self) -> Summary {
        let total = self.total();
        let success_rate = if total == 0 {
            0.0
        } else {
            self.passed as f64 / total as f64 * 100.0
        };

        Summary {
            total,
            passed: self.passed,
            failed: self.failed,
            success_rate,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// True when no recorded outcome failed
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn outcomes(&self) -> &[TestOutcome] {
        &self.outcomes
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestOutcome> {
        self.outcomes.iter()
    }
}
