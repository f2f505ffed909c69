//! Executor-side worker runtime for the taskgrid platform.
//!
//! A governor process spawns executor processes, each serving tasks of
//! one declared type. An executor connects to the governor over a local
//! socket, announces itself and then answers task calls until the
//! process is torn down: for each call it materialises the input data
//! objects, runs the registered task function and ships back a success
//! or error result.
//!
//! # Example
//!
//! ```rust,no_run
//! use taskgrid_executor::{Context, DataInstance, Executor, ExecutorResult, init_logging};
//!
//! fn hello(
//!     ctx: &mut Context,
//!     inputs: &[DataInstance],
//!     outputs: &mut Vec<DataInstance>,
//! ) -> ExecutorResult<()> {
//!     if !ctx.check_n_args(1) {
//!         return Ok(());
//!     }
//!     let greeting = format!("Hello {}!", inputs[0].read_as_string()?);
//!     outputs.push(DataInstance::memory(greeting));
//!     Ok(())
//! }
//!
//! fn main() {
//!     init_logging().expect("failed to initialize logging");
//!     let mut executor = Executor::new("greeter");
//!     executor.add_task("hello", hello);
//!     if let Err(error) = executor.start() {
//!         eprintln!("executor failed: {error}");
//!         std::process::exit(1);
//!     }
//! }
//! ```

mod connection;
mod context;
mod data;
mod error;
mod executor;
mod logging;

pub use context::Context;
pub use data::{DataInstance, FileBacked};
pub use error::{ExecutorError, ExecutorResult};
pub use executor::{ENV_EXECUTOR_ID, ENV_SOCKET, Executor, TaskFn};
pub use logging::{LoggingError, init_logging};
