use libetude_harness::{ScenarioRunner, scenarios};

#[test]
fn all_eight_scenarios_are_registered_and_pass() {
    let cases = scenarios::all();
    assert_eq!(cases.len(), 8);

    let results = ScenarioRunner::run_all(&cases);
    for result in &results {
        assert!(result.passed, "{} ({}) failed: {}", result.name, result.spec_section, result.detail);
    }
}
