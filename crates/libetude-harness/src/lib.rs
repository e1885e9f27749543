//! Conformance scenario harness: runs the engine core's testable
//! properties (S1 through S8) live against the workspace crates and
//! reports pass/fail, in place of fixture-capture-and-replay against a
//! host reference implementation.

pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod scenarios;

pub use error::{HarnessError, HarnessResult};
pub use runner::ScenarioRunner;
pub use scenario::{ScenarioCase, ScenarioResult};
