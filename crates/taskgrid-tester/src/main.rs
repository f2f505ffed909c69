//! Reference harness executor serving the `cpptester` task set.
//!
//! Spawned by the governor test suite; configuration comes from the
//! `RAIN_EXECUTOR_*` environment variables.

use std::process;

use taskgrid_executor::{Context, DataInstance, Executor, ExecutorResult, init_logging};
use tracing::error;

fn hello(
    ctx: &mut Context,
    inputs: &[DataInstance],
    outputs: &mut Vec<DataInstance>,
) -> ExecutorResult<()> {
    if !ctx.check_n_args(1) {
        return Ok(());
    }
    let greeting = format!("Hello {}!", inputs[0].read_as_string()?);
    outputs.push(DataInstance::memory(greeting));
    Ok(())
}

fn fail(
    ctx: &mut Context,
    inputs: &[DataInstance],
    _outputs: &mut Vec<DataInstance>,
) -> ExecutorResult<()> {
    if !ctx.check_n_args(1) {
        return Ok(());
    }
    let message = inputs[0].read_as_string()?;
    ctx.set_error(message);
    Ok(())
}

fn panic_task(
    _ctx: &mut Context,
    _inputs: &[DataInstance],
    _outputs: &mut Vec<DataInstance>,
) -> ExecutorResult<()> {
    panic!("panic task invoked");
}

fn main() {
    init_logging().expect("failed to initialize logging");

    let mut executor = Executor::new("cpptester");
    executor.add_task("hello", hello);
    executor.add_task("fail", fail);
    executor.add_task("panic", panic_task);

    if let Err(e) = executor.start() {
        error!(error = %e, "executor terminated");
        process::exit(1);
    }
}
