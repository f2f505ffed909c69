//! Environment discovery, registration and the dispatch loop.

use std::collections::HashMap;
use std::env;
use std::io::{Read, Write};
use std::path::PathBuf;

use taskgrid_protocol::{
    CallMsg, Message, OutputSpec, RegisterMsg, ResultMsg, TaskId, from_bytes, to_bytes,
};
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::context::Context;
use crate::data::DataInstance;
use crate::error::{ExecutorError, ExecutorResult};

/// Environment variable holding the governor socket path.
pub const ENV_SOCKET: &str = "RAIN_EXECUTOR_SOCKET";

/// Environment variable holding this executor's instance id.
pub const ENV_EXECUTOR_ID: &str = "RAIN_EXECUTOR_ID";

/// A registered task function.
///
/// Receives the per-call [`Context`], the decoded inputs and the vector
/// to append outputs to, in declared order. Task-level failures go
/// through [`Context::set_error`]; a returned `Err` is a fatal runtime
/// error and terminates the executor.
pub type TaskFn = dyn Fn(&mut Context, &[DataInstance], &mut Vec<DataInstance>) -> ExecutorResult<()>
    + Send
    + Sync;

/// The executor runtime: a registry of task functions served over the
/// governor connection.
///
/// Register tasks with [`add_task`](Self::add_task), then enter the
/// dispatch loop with [`start`](Self::start). The loop is synchronous and
/// single-threaded: one call is decoded, run and answered before the next
/// frame is read.
pub struct Executor {
    /// Type name announced at registration; every served `task_type`
    /// starts with `"<type_name>/"`.
    type_name: String,
    /// Registered task functions; not mutated after `start`.
    tasks: HashMap<String, Box<TaskFn>>,
    /// Explicit id and socket path, bypassing environment discovery.
    params: Option<(u32, PathBuf)>,
}

impl Executor {
    /// Creates an executor serving tasks of the given type.
    ///
    /// The socket path and instance id are discovered from the
    /// environment when [`start`](Self::start) runs.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            tasks: HashMap::new(),
            params: None,
        }
    }

    /// Creates an executor with an explicit instance id and socket path,
    /// skipping environment discovery. Used by embedders and tests.
    pub fn with_params(
        type_name: impl Into<String>,
        executor_id: u32,
        socket_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            tasks: HashMap::new(),
            params: Some((executor_id, socket_path.into())),
        }
    }

    /// Registers `task_fn` under `name`.
    ///
    /// Must be called before [`start`](Self::start).
    ///
    /// # Panics
    ///
    /// Panics when a task with the same name is already registered.
    pub fn add_task<F>(&mut self, name: impl Into<String>, task_fn: F)
    where
        F: Fn(&mut Context, &[DataInstance], &mut Vec<DataInstance>) -> ExecutorResult<()>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.tasks.contains_key(&name) {
            panic!("task {name:?} is already registered");
        }
        self.tasks.insert(name, Box::new(task_fn));
    }

    /// Connects to the governor, registers and serves task calls.
    ///
    /// Does not return under normal operation. An `Err` means the
    /// protocol stream or the environment is unusable; the embedding
    /// binary is expected to log it and exit nonzero so the governor can
    /// re-spawn the executor.
    pub fn start(&mut self) -> ExecutorResult<()> {
        let (executor_id, socket_path) = self.discover()?;
        info!(
            executor_type = %self.type_name,
            executor_id,
            socket = %socket_path.display(),
            "starting executor"
        );

        let mut conn = Connection::connect(&socket_path)?;
        let register = Message::Register(RegisterMsg::new(&self.type_name, executor_id));
        conn.send(&to_bytes(&register)?)?;
        debug!("registration message sent");

        loop {
            let frame = conn.receive()?;
            self.process_message(&mut conn, &frame)?;
        }
    }

    /// Resolves the instance id and socket path, from explicit params or
    /// from the environment.
    fn discover(&self) -> ExecutorResult<(u32, PathBuf)> {
        if let Some((executor_id, socket_path)) = &self.params {
            return Ok((*executor_id, socket_path.clone()));
        }
        let socket_path = env::var_os(ENV_SOCKET)
            .map(PathBuf::from)
            .ok_or(ExecutorError::MissingEnv(ENV_SOCKET))?;
        let raw_id =
            env::var_os(ENV_EXECUTOR_ID).ok_or(ExecutorError::MissingEnv(ENV_EXECUTOR_ID))?;
        let executor_id = raw_id
            .to_str()
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| ExecutorError::InvalidEnv {
                name: ENV_EXECUTOR_ID,
                value: raw_id.to_string_lossy().into_owned(),
            })?;
        Ok((executor_id, socket_path))
    }

    fn process_message<S: Read + Write>(
        &self,
        conn: &mut Connection<S>,
        frame: &[u8],
    ) -> ExecutorResult<()> {
        debug!(len = frame.len(), "message received");
        match from_bytes::<Message>(frame)? {
            Message::Call(call) => self.process_call(conn, call),
            other => Err(ExecutorError::UnexpectedMessage(other.kind().to_string())),
        }
    }

    fn process_call<S: Read + Write>(
        &self,
        conn: &mut Connection<S>,
        call: CallMsg,
    ) -> ExecutorResult<()> {
        let task_id = call.spec.id;
        info!(method = %call.spec.task_type, task = %task_id, "running method");

        let Some(task_fn) = self.lookup(&call.spec.task_type) else {
            return self.send_error(
                conn,
                task_id,
                format!("Method '{}' not found in executor", call.spec.task_type),
            );
        };

        let inputs: Vec<DataInstance> = call
            .inputs
            .iter()
            .map(DataInstance::from_input_spec)
            .collect::<ExecutorResult<_>>()?;
        let declared_outputs = call.outputs.len();
        let mut outputs = Vec::with_capacity(declared_outputs);

        let mut ctx = Context::new(inputs.len());
        task_fn(&mut ctx, &inputs, &mut outputs)?;

        if let Some(message) = ctx.error_message() {
            info!(task = %task_id, error = message, "method finished with error");
            return self.send_error(conn, task_id, message.to_string());
        }
        if outputs.len() != declared_outputs {
            return self.send_error(
                conn,
                task_id,
                format!(
                    "Task produced {} outputs, but expected {}",
                    outputs.len(),
                    declared_outputs
                ),
            );
        }

        let specs: Vec<OutputSpec> = outputs
            .iter()
            .zip(&call.outputs)
            .map(|(output, stub)| output.make_output_spec(stub))
            .collect();
        info!(task = %task_id, outputs = specs.len(), "method finished");
        self.send_result(conn, ResultMsg::success(task_id, specs))
    }

    /// Derives the short task name by stripping the `"<type_name>/"`
    /// prefix, then resolves it in the registry.
    fn lookup(&self, task_type: &str) -> Option<&TaskFn> {
        let name = task_type.get(self.type_name.len() + 1..)?;
        self.tasks.get(name).map(|task_fn| &**task_fn)
    }

    fn send_error<S: Read + Write>(
        &self,
        conn: &mut Connection<S>,
        task: TaskId,
        message: String,
    ) -> ExecutorResult<()> {
        warn!(task = %task, error = %message, "reporting task failure");
        self.send_result(conn, ResultMsg::error(task, message))
    }

    fn send_result<S: Read + Write>(
        &self,
        conn: &mut Connection<S>,
        result: ResultMsg,
    ) -> ExecutorResult<()> {
        conn.send(&to_bytes(&Message::Result(result))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_executor() -> Executor {
        let mut executor = Executor::with_params("cpptester", 1, "/tmp/unused.sock");
        executor.add_task("hello", |_ctx, _inputs, _outputs| Ok(()));
        executor
    }

    #[test]
    fn lookup_strips_the_type_prefix() {
        let executor = noop_executor();
        assert!(executor.lookup("cpptester/hello").is_some());
        assert!(executor.lookup("cpptester/nope").is_none());
    }

    #[test]
    fn lookup_handles_short_task_types() {
        let executor = noop_executor();
        assert!(executor.lookup("cpp").is_none());
        assert!(executor.lookup("cpptester/").is_none());
        assert!(executor.lookup("").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut executor = noop_executor();
        executor.add_task("hello", |_ctx, _inputs, _outputs| Ok(()));
    }

    #[test]
    fn explicit_params_bypass_the_environment() {
        let executor = Executor::with_params("cpptester", 7, "/run/governor.sock");
        let (executor_id, socket_path) = executor.discover().unwrap();
        assert_eq!(executor_id, 7);
        assert_eq!(socket_path, PathBuf::from("/run/governor.sock"));
    }
}
