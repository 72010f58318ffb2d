//! Array assignment with every participant on a thread of this process.
mod cli;

use array_decomp::run_local;
use clap::Parser;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "array_assign_local")]
#[command(version, about = "Scatter, update and gather an array across in-process participants")]
struct Cli {
    /// Number of participants, coordinator included
    #[arg(short = 'p', long, default_value_t = 4, env = "ARRAY_DECOMP_PARTICIPANTS")]
    participants: u32,

    #[command(flatten)]
    run: cli::RunArgs,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    cli::init_logging();

    let mut status = ExitCode::SUCCESS;
    for (rank, outcome) in run_local(&args.run.config(), args.participants)
        .into_iter()
        .enumerate()
    {
        match outcome {
            Ok(outcome) => {
                if let Some(report) = outcome.report {
                    println!("{}", report);
                }
            }
            Err(err) => {
                error!(rank, %err, "participant failed");
                status = ExitCode::FAILURE;
            }
        }
    }
    status
}
