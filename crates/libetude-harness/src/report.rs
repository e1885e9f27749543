//! Renders scenario results as a human-readable table or as JSON, the
//! same two-format split the teacher's conformance reports offer.

use crate::scenario::ScenarioResult;

pub fn render_text(results: &[ScenarioResult]) -> String {
    let mut out = String::new();
    let passed = results.iter().filter(|r| r.passed).count();
    for result in results {
        let mark = if result.passed { "PASS" } else { "FAIL" };
        out.push_str(&format!("[{mark}] {:<4} {:<20} {}\n", result.name, result.spec_section, result.detail));
    }
    out.push_str(&format!("\n{passed}/{} scenarios passed\n", results.len()));
    out
}

pub fn render_json(results: &[ScenarioResult]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_report_summarizes_pass_count() {
        let results = vec![
            ScenarioResult { name: "S1".into(), spec_section: "Pool stats".into(), passed: true, detail: "ok".into() },
            ScenarioResult { name: "S2".into(), spec_section: "Fixed pool".into(), passed: false, detail: "boom".into() },
        ];
        let text = render_text(&results);
        assert!(text.contains("[PASS] S1"));
        assert!(text.contains("[FAIL] S2"));
        assert!(text.contains("1/2 scenarios passed"));
    }

    #[test]
    fn json_report_round_trips() {
        let results = vec![ScenarioResult { name: "S1".into(), spec_section: "Pool stats".into(), passed: true, detail: "ok".into() }];
        let json = render_json(&results).unwrap();
        let parsed: Vec<ScenarioResult> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "S1");
    }
}
