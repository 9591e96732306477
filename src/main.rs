use actimer::{cli::run_cli, utils::runtime::single_thread_runtime};
use anyhow::Result;
use tracing::error;

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli());
    // The stdin reader can still be parked in a blocking read.
    runtime.shutdown_background();
    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
