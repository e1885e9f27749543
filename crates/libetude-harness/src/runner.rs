//! Runs a set of [`ScenarioCase`]s and collects pass/fail results.
//! Grounded on `TestRunner`'s run-and-collect shape, minus the
//! mode-filtering this crate has no equivalent of (every scenario here
//! runs unconditionally, there is no strict/hardened split).

use crate::scenario::{ScenarioCase, ScenarioResult};

pub struct ScenarioRunner;

impl ScenarioRunner {
    pub fn run_all(cases: &[ScenarioCase]) -> Vec<ScenarioResult> {
        cases.iter().map(Self::run_one).collect()
    }

    pub fn run_named<'a>(cases: &'a [ScenarioCase], name: &str) -> Option<ScenarioResult> {
        cases.iter().find(|c| c.name.eq_ignore_ascii_case(name)).map(Self::run_one)
    }

    fn run_one(case: &ScenarioCase) -> ScenarioResult {
        match (case.run)() {
            Ok(()) => ScenarioResult { name: case.name.to_string(), spec_section: case.spec_section.to_string(), passed: true, detail: "ok".to_string() },
            Err(err) => ScenarioResult { name: case.name.to_string(), spec_section: case.spec_section.to_string(), passed: false, detail: err.to_string() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios;

    #[test]
    fn every_scenario_passes() {
        let results = ScenarioRunner::run_all(&scenarios::all());
        for result in &results {
            assert!(result.passed, "{} ({}) failed: {}", result.name, result.spec_section, result.detail);
        }
    }

    #[test]
    fn run_named_is_case_insensitive() {
        let cases = scenarios::all();
        let result = ScenarioRunner::run_named(&cases, "s1").expect("S1 exists");
        assert!(result.passed);
    }

    #[test]
    fn run_named_reports_none_for_unknown_scenario() {
        let cases = scenarios::all();
        assert!(ScenarioRunner::run_named(&cases, "S99").is_none());
    }
}
