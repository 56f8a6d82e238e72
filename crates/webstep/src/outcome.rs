//! Scenario execution and reporting.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::result::{StepError, StepResult};
use crate::table::GherkinTable;

/// Gherkin step keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKeyword {
    /// Precondition
    Given,
    /// Action
    When,
    /// Assertion
    Then,
    /// Continues the previous keyword
    And,
    /// Continues the previous keyword
    But,
}

impl StepKeyword {
    /// Parse a keyword (case-insensitive)
    #[must_use]
    pub fn parse(word: &str) -> Option<Self> {
        match word.trim().to_ascii_lowercase().as_str() {
            "given" => Some(Self::Given),
            "when" => Some(Self::When),
            "then" => Some(Self::Then),
            "and" => Some(Self::And),
            "but" => Some(Self::But),
            _ => None,
        }
    }

    /// `And`/`But` take the keyword of the step before them
    #[must_use]
    pub const fn resolve(self, previous: Self) -> Self {
        match self {
            Self::And | Self::But => previous,
            other => other,
        }
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let word = match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        };
        f.write_str(word)
    }
}

/// One step of a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioStep {
    /// Keyword as written
    pub keyword: StepKeyword,
    /// Sentence after the keyword
    pub sentence: String,
    /// Table argument
    pub table: Option<GherkinTable>,
}

impl fmt::Display for ScenarioStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.keyword, self.sentence)
    }
}

/// Named sequence of steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Steps in order
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, keyword: StepKeyword, sentence: impl Into<String>) -> Self {
        self.steps.push(ScenarioStep {
            keyword,
            sentence: sentence.into(),
            table: None,
        });
        self
    }

    /// Append a step with a table argument
    #[must_use]
    pub fn step_with_table(
        mut self,
        keyword: StepKeyword,
        sentence: impl Into<String>,
        table: GherkinTable,
    ) -> Self {
        self.steps.push(ScenarioStep {
            keyword,
            sentence: sentence.into(),
            table: Some(table),
        });
        self
    }

    /// Append a `Given` step
    #[must_use]
    pub fn given(self, sentence: impl Into<String>) -> Self {
        self.step(StepKeyword::Given, sentence)
    }

    /// Append a `When` step
    #[must_use]
    pub fn when(self, sentence: impl Into<String>) -> Self {
        self.step(StepKeyword::When, sentence)
    }

    /// Append a `Then` step
    #[must_use]
    pub fn then(self, sentence: impl Into<String>) -> Self {
        self.step(StepKeyword::Then, sentence)
    }

    /// Append an `And` step
    #[must_use]
    pub fn and(self, sentence: impl Into<String>) -> Self {
        self.step(StepKeyword::And, sentence)
    }
}

/// Result of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// Step succeeded
    Passed,
    /// Assertion or driver failure
    Failed(String),
    /// Step not implemented yet
    Pending(String),
    /// Not run because an earlier step did not pass
    Skipped,
}

impl StepOutcome {
    /// Whether the step passed
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl From<StepResult<()>> for StepOutcome {
    fn from(result: StepResult<()>) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(e) if e.is_pending() => Self::Pending(e.to_string()),
            Err(e) => Self::Failed(e.to_string()),
        }
    }
}

/// Outcome of one step with timing
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step as written
    pub step: String,
    /// Outcome
    pub outcome: StepOutcome,
    /// Time spent
    pub duration: Duration,
}

/// Outcome of a whole scenario
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Per-step reports, one per step
    pub steps: Vec<StepReport>,
    /// Total duration
    pub duration: Duration,
}

impl ScenarioReport {
    /// Every step passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| s.outcome.is_passed())
    }

    /// Count passed steps
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.steps.iter().filter(|s| s.outcome.is_passed()).count()
    }

    /// Count skipped steps
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.outcome == StepOutcome::Skipped)
            .count()
    }

    /// Failed step, if any
    #[must_use]
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Failed(_)))
    }

    /// Pending step, if any
    #[must_use]
    pub fn pending(&self) -> Option<&StepReport> {
        self.steps
            .iter()
            .find(|s| matches!(s.outcome, StepOutcome::Pending(_)))
    }
}

/// Something that can execute scenario steps
pub trait StepRunner {
    /// Reset per-scenario state
    fn begin_scenario(&mut self);

    /// Execute one step; `keyword` is already resolved (never `And`/`But`)
    fn run_step(
        &mut self,
        keyword: StepKeyword,
        sentence: &str,
        table: Option<&GherkinTable>,
    ) -> StepResult<()>;
}

/// Run `scenario` on a fresh context, stopping at the first step that does
/// not pass. Remaining steps are reported as skipped.
pub fn run_scenario<R: StepRunner + ?Sized>(runner: &mut R, scenario: &Scenario) -> ScenarioReport {
    let start = Instant::now();
    runner.begin_scenario();
    tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "scenario started");

    let mut previous = StepKeyword::Given;
    let mut halted = false;
    let mut steps = Vec::with_capacity(scenario.steps.len());

    for step in &scenario.steps {
        let keyword = step.keyword.resolve(previous);
        previous = keyword;

        if halted {
            steps.push(StepReport {
                step: step.to_string(),
                outcome: StepOutcome::Skipped,
                duration: Duration::ZERO,
            });
            continue;
        }

        let step_start = Instant::now();
        let result = runner.run_step(keyword, &step.sentence, step.table.as_ref());
        if let Err(StepError::Configuration { message }) = &result {
            tracing::error!(step = %step, %message, "suite configuration error");
        }
        let outcome = StepOutcome::from(result);
        if !outcome.is_passed() {
            tracing::warn!(step = %step, ?outcome, "step did not pass");
            halted = true;
        }
        steps.push(StepReport {
            step: step.to_string(),
            outcome,
            duration: step_start.elapsed(),
        });
    }

    let report = ScenarioReport {
        name: scenario.name.clone(),
        steps,
        duration: start.elapsed(),
    };
    tracing::info!(
        scenario = %report.name,
        passed = report.passed(),
        duration_ms = u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
        "scenario finished"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ScriptedRunner {
        resets: usize,
        seen: Vec<(StepKeyword, String)>,
    }

    impl StepRunner for ScriptedRunner {
        fn begin_scenario(&mut self) {
            self.resets += 1;
        }

        fn run_step(
            &mut self,
            keyword: StepKeyword,
            sentence: &str,
            _table: Option<&GherkinTable>,
        ) -> StepResult<()> {
            self.seen.push((keyword, sentence.to_string()));
            match sentence {
                "fail" => Err(StepError::assertion("boom")),
                "todo" => Err(StepError::pending("later")),
                _ => Ok(()),
            }
        }
    }

    mod keyword_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!(StepKeyword::parse("Given"), Some(StepKeyword::Given));
            assert_eq!(StepKeyword::parse(" then "), Some(StepKeyword::Then));
            assert_eq!(StepKeyword::parse("Scenario"), None);
        }

        #[test]
        fn test_and_inherits() {
            assert_eq!(StepKeyword::And.resolve(StepKeyword::Then), StepKeyword::Then);
            assert_eq!(StepKeyword::When.resolve(StepKeyword::Then), StepKeyword::When);
        }
    }

    mod outcome_tests {
        use super::*;

        #[test]
        fn test_from_result() {
            assert_eq!(StepOutcome::from(Ok(())), StepOutcome::Passed);
            assert!(matches!(
                StepOutcome::from(Err(StepError::pending("x"))),
                StepOutcome::Pending(_)
            ));
            assert!(matches!(
                StepOutcome::from(Err(StepError::UnsupportedType {
                    type_name: "paragraph".to_string()
                })),
                StepOutcome::Pending(_)
            ));
            assert!(matches!(
                StepOutcome::from(Err(StepError::assertion("x"))),
                StepOutcome::Failed(_)
            ));
        }
    }

    mod run_tests {
        use super::*;

        #[test]
        fn test_all_pass() {
            let mut runner = ScriptedRunner::default();
            let scenario = Scenario::new("ok").given("a").when("b").then("c");
            let report = run_scenario(&mut runner, &scenario);
            assert!(report.passed());
            assert_eq!(report.passed_count(), 3);
            assert_eq!(runner.resets, 1);
        }

        #[test]
        fn test_fail_fast_skips_rest() {
            let mut runner = ScriptedRunner::default();
            let scenario = Scenario::new("bad").given("a").when("fail").then("c").and("d");
            let report = run_scenario(&mut runner, &scenario);

            assert!(!report.passed());
            assert_eq!(report.skipped_count(), 2);
            assert_eq!(report.failure().unwrap().step, "When fail");
            assert_eq!(runner.seen.len(), 2);
        }

        #[test]
        fn test_pending_halts_but_is_not_failure() {
            let mut runner = ScriptedRunner::default();
            let scenario = Scenario::new("todo").given("todo").then("c");
            let report = run_scenario(&mut runner, &scenario);
            assert!(report.failure().is_none());
            assert!(report.pending().is_some());
            assert_eq!(report.skipped_count(), 1);
        }

        #[test]
        fn test_and_resolves_to_previous_keyword() {
            let mut runner = ScriptedRunner::default();
            let scenario = Scenario::new("kw").then("a").and("b");
            run_scenario(&mut runner, &scenario);
            assert_eq!(runner.seen[1].0, StepKeyword::Then);
        }

        #[test]
        fn test_context_reset_every_scenario() {
            let mut runner = ScriptedRunner::default();
            run_scenario(&mut runner, &Scenario::new("one").given("fail"));
            run_scenario(&mut runner, &Scenario::new("two").given("a"));
            assert_eq!(runner.resets, 2);
        }
    }
}
