//! Ordered scenarios.
//!
//! Cases run one after another in declaration order, sharing the driver's
//! bag, so a later case can refer to ids captured by an earlier one. A case
//! that aborts does not stop the scenario.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, info_span, warn, Instrument};

use crate::webtest::{Mismatch, TestCase, WebTest, WebTestError};

#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    cases: Vec<(String, TestCase)>,
}

impl Scenario {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Append a case. Cases run in the order they were added.
    pub fn case(mut self, name: impl Into<String>, case: TestCase) -> Self {
        self.cases.push((name.into(), case));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub async fn run(&self, web: &mut WebTest) -> ScenarioReport {
        let span = info_span!("scenario", name = %self.name);
        async {
            let mut results = Vec::with_capacity(self.cases.len());

            for (name, case) in &self.cases {
                let result = match web.execute(case).await {
                    Ok(report) => {
                        let elapsed_ms = report.elapsed.as_millis() as u64;
                        if report.is_success() {
                            info!(case = %name, elapsed_ms, "Case passed");
                            CaseResult::new(name, Some(report.elapsed), CaseOutcome::Passed)
                        } else {
                            warn!(
                                case = %name,
                                elapsed_ms,
                                mismatches = report.mismatches.len(),
                                "Case failed"
                            );
                            CaseResult::new(
                                name,
                                Some(report.elapsed),
                                CaseOutcome::Failed {
                                    mismatches: report.mismatches,
                                },
                            )
                        }
                    }
                    Err(e) => {
                        error!(case = %name, error = %e, "Case aborted");
                        CaseResult::new(name, None, CaseOutcome::Aborted { error: e })
                    }
                };
                results.push(result);
            }

            ScenarioReport {
                scenario: self.name.clone(),
                cases: results,
            }
        }
        .instrument(span)
        .await
    }
}

#[derive(Debug)]
pub enum CaseOutcome {
    Passed,
    Failed { mismatches: Vec<Mismatch> },
    Aborted { error: WebTestError },
}

#[derive(Debug)]
pub struct CaseResult {
    pub name: String,
    /// `None` when the case aborted before a response arrived.
    pub elapsed: Option<Duration>,
    pub outcome: CaseOutcome,
}

impl CaseResult {
    fn new(name: &str, elapsed: Option<Duration>, outcome: CaseOutcome) -> Self {
        Self {
            name: name.to_string(),
            elapsed,
            outcome,
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Passed)
    }
}

#[derive(Debug)]
pub struct ScenarioReport {
    pub scenario: String,
    pub cases: Vec<CaseResult>,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.cases.iter().all(CaseResult::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|c| !c.passed())
    }

    pub fn get(&self, name: &str) -> Option<&CaseResult> {
        self.cases.iter().find(|c| c.name == name)
    }

    /// # Panics
    ///
    /// With a per-case summary when any case failed or aborted.
    #[track_caller]
    pub fn assert_success(&self) {
        if !self.is_success() {
            panic!("{self}");
        }
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        writeln!(
            f,
            "scenario {}: {} of {} cases failed",
            self.scenario,
            failed,
            self.cases.len()
        )?;

        for case in self.failures() {
            match &case.outcome {
                CaseOutcome::Passed => {}
                CaseOutcome::Failed { mismatches } => {
                    writeln!(f, "  {}: failed", case.name)?;
                    for mismatch in mismatches {
                        writeln!(f, "    - {mismatch}")?;
                    }
                }
                CaseOutcome::Aborted { error } => {
                    writeln!(f, "  {}: aborted: {error}", case.name)?;
                }
            }
        }
        Ok(())
    }
}
