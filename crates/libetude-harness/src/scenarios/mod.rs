//! One module per scenario, S1 through S8. Each exposes a `run()` that
//! executes the scenario live against the engine crates and returns
//! `Ok(())` or an explanatory [`HarnessError`].

mod s1_pool_stats;
mod s2_fixed_pool;
mod s3_tensor_matmul;
mod s4_reductions;
mod s5_graph_execute;
mod s6_lef_round_trip;
mod s7_streaming_cache;
mod s8_lefx_activation;

use crate::scenario::ScenarioCase;

pub fn all() -> Vec<ScenarioCase> {
    vec![
        ScenarioCase { name: "S1", spec_section: "Pool stats", run: s1_pool_stats::run },
        ScenarioCase { name: "S2", spec_section: "Fixed pool", run: s2_fixed_pool::run },
        ScenarioCase { name: "S3", spec_section: "Tensor matmul", run: s3_tensor_matmul::run },
        ScenarioCase { name: "S4", spec_section: "Reductions", run: s4_reductions::run },
        ScenarioCase { name: "S5", spec_section: "Graph execute", run: s5_graph_execute::run },
        ScenarioCase { name: "S6", spec_section: "LEF round-trip", run: s6_lef_round_trip::run },
        ScenarioCase { name: "S7", spec_section: "Streaming cache", run: s7_streaming_cache::run },
        ScenarioCase { name: "S8", spec_section: "LEFX activation", run: s8_lefx_activation::run },
    ]
}
