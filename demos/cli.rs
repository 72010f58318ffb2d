//! Options and logging setup shared by the array assignment binaries.
use array_decomp::config::{DEFAULT_ARRAY_LEN, DEFAULT_SAMPLE_WIDTH};
use array_decomp::RunConfig;
use clap::Args;
use tracing_subscriber::EnvFilter;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of elements in the global array (must be divisible by the
    /// number of participants)
    #[arg(short = 'n', long, default_value_t = DEFAULT_ARRAY_LEN)]
    pub array_len: usize,

    /// Leading values of each chunk shown in the sample output
    #[arg(long, default_value_t = DEFAULT_SAMPLE_WIDTH)]
    pub sample_width: usize,

    /// Log every chunk before and after its update (debug level)
    #[arg(long)]
    pub trace_chunks: bool,

    /// Do not print the whole final array
    #[arg(long)]
    pub no_full_array: bool,
}

impl RunArgs {
    pub fn config(&self) -> RunConfig {
        RunConfig {
            array_len: self.array_len,
            sample_width: self.sample_width,
            trace_chunks: self.trace_chunks,
            show_full_array: !self.no_full_array,
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the default `info` level.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
