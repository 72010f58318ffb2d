//! Array assignment with one MPI process per participant.
//!
//! mpirun -n 4 array_assign_mpi --array-len 12
mod cli;

use array_decomp::{init_standard_mpi, run_participant, CommGroup};
use clap::Parser;
use futures::executor;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "array_assign_mpi")]
#[command(version, about = "Scatter, update and gather an array across MPI ranks")]
struct Cli {
    #[command(flatten)]
    run: cli::RunArgs,
}

fn main() {
    let args = Cli::parse();
    cli::init_logging();

    let cg = match init_standard_mpi() {
        Ok(cg) => cg,
        Err(err) => {
            error!(%err, "could not initialize MPI");
            std::process::exit(1);
        }
    };

    match executor::block_on(run_participant(&cg, &args.run.config())) {
        Ok(outcome) => {
            if let Some(report) = outcome.report {
                println!("{}", report);
            }
        }
        Err(err) => {
            error!(rank = cg.rank(), %err, "participant failed");
            cg.abort(1);
        }
    }
}
