//! A scenario case is a named, spec-section-tagged check function. This
//! mirrors the teacher's `FixtureCase`/`TestRunner` split (fixtures
//! describe intent and provenance, the runner executes and records
//! pass/fail) without the fixture-capture machinery, since every
//! scenario here runs live against these crates rather than replaying
//! captured host output.

use serde::{Deserialize, Serialize};

use crate::error::HarnessResult;

#[derive(Clone, Copy)]
pub struct ScenarioCase {
    pub name: &'static str,
    pub spec_section: &'static str,
    pub run: fn() -> HarnessResult<()>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub spec_section: String,
    pub passed: bool,
    pub detail: String,
}
