//! CLI entrypoint for the LibEtude conformance scenario harness.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use libetude_harness::{ScenarioRunner, report, scenarios};

/// Conformance tooling for the LibEtude engine core.
#[derive(Debug, Parser)]
#[command(name = "libetude-harness")]
#[command(about = "Runs the engine core's S1-S8 conformance scenarios")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every registered scenario.
    List,
    /// Run one scenario (by name, e.g. "S6") or every scenario if omitted.
    Run {
        #[arg(long)]
        scenario: Option<String>,
        /// Print results as JSON instead of a text table.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cases = scenarios::all();

    match cli.command {
        Command::List => {
            for case in &cases {
                println!("{:<4} {}", case.name, case.spec_section);
            }
            ExitCode::SUCCESS
        }
        Command::Run { scenario, json } => {
            let results = match scenario {
                Some(name) => match ScenarioRunner::run_named(&cases, &name) {
                    Some(result) => vec![result],
                    None => {
                        eprintln!("unknown scenario {name:?}");
                        return ExitCode::FAILURE;
                    }
                },
                None => ScenarioRunner::run_all(&cases),
            };

            if json {
                match report::render_json(&results) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        eprintln!("failed to render JSON report: {err}");
                        return ExitCode::FAILURE;
                    }
                }
            } else {
                print!("{}", report::render_text(&results));
            }

            if results.iter().all(|r| r.passed) { ExitCode::SUCCESS } else { ExitCode::FAILURE }
        }
    }
}
