//! End-to-end dispatch scenarios against a mock governor.
//!
//! Each test binds a unix socket in a scratch directory, runs the
//! executor loop on a worker thread and drives it from the governor end
//! of the socket.

use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::thread::JoinHandle;

use taskgrid_executor::{Context, DataInstance, Executor, ExecutorError, ExecutorResult};
use taskgrid_protocol::{
    CallMsg, FrameBuffer, InputSpec, Location, Message, OutputSpec, RegisterMsg, ResultMsg, Sid,
    TaskSpec, Value, encode_frame, from_bytes, to_bytes, to_value,
};

/// Governor end of the socket: framed message exchange over a stream.
struct MockGovernor {
    stream: UnixStream,
    incoming: FrameBuffer,
}

impl MockGovernor {
    fn accept(listener: &UnixListener) -> Self {
        let (stream, _) = listener.accept().unwrap();
        Self {
            stream,
            incoming: FrameBuffer::new(),
        }
    }

    fn send_raw(&mut self, payload: &[u8]) {
        let frame = encode_frame(payload).unwrap();
        self.stream.write_all(&frame).unwrap();
    }

    fn send(&mut self, message: &Message) {
        self.send_raw(&to_bytes(message).unwrap());
    }

    fn receive(&mut self) -> Message {
        loop {
            if let Some(frame) = self.incoming.next_frame().unwrap() {
                return from_bytes(&frame).unwrap();
            }
            let n = self.incoming.read_from(&mut self.stream).unwrap();
            assert_ne!(n, 0, "executor closed the connection unexpectedly");
        }
    }

    fn expect_register(&mut self) -> RegisterMsg {
        match self.receive() {
            Message::Register(register) => register,
            other => panic!("expected a register message, got {other:?}"),
        }
    }

    fn call(
        &mut self,
        task_type: &str,
        id: Sid,
        inputs: Vec<Location>,
        declared_outputs: usize,
    ) -> ResultMsg {
        let call = CallMsg {
            spec: TaskSpec {
                task_type: task_type.into(),
                id,
            },
            inputs: inputs
                .into_iter()
                .map(|location| to_value(&InputSpec { location }).unwrap())
                .collect(),
            outputs: vec![Value::Map(Vec::new()); declared_outputs],
        };
        self.send(&Message::Call(call));
        match self.receive() {
            Message::Result(result) => result,
            other => panic!("expected a result message, got {other:?}"),
        }
    }
}

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

fn noop(
    _ctx: &mut Context,
    _inputs: &[DataInstance],
    _outputs: &mut Vec<DataInstance>,
) -> ExecutorResult<()> {
    Ok(())
}

/// Runs the executor loop on a worker thread; the loop only ends on a
/// fatal error, which the thread hands back.
fn spawn_executor(socket_path: &Path) -> JoinHandle<ExecutorError> {
    let mut executor = Executor::with_params("cpptester", 42, socket_path);
    executor.add_task("hello", hello);
    executor.add_task("fail", fail);
    executor.add_task("noop", noop);
    std::thread::spawn(move || executor.start().unwrap_err())
}

fn memory(bytes: &[u8]) -> Location {
    Location::Memory(bytes.to_vec())
}

#[test]
fn executor_serves_the_reference_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("governor.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let executor = spawn_executor(&socket_path);
    let mut governor = MockGovernor::accept(&listener);

    // Registration comes first.
    assert_eq!(governor.expect_register(), RegisterMsg::new("cpptester", 42));

    // Plain success: one memory input, one output.
    let result = governor.call(
        "cpptester/hello",
        Sid::new(7, 1),
        vec![memory(b"world")],
        1,
    );
    assert_eq!(
        result,
        ResultMsg::success(
            Sid::new(7, 1),
            vec![OutputSpec::new(memory(b"Hello world!"))],
        )
    );

    // Unknown method: the error names the full task_type.
    let result = governor.call("cpptester/nope", Sid::new(7, 2), Vec::new(), 0);
    assert!(!result.success);
    assert_eq!(result.task, Sid::new(7, 2));
    assert!(
        result
            .info
            .error
            .as_deref()
            .unwrap()
            .contains("Method 'cpptester/nope' not found")
    );

    // Task-level failure signalled through the context.
    let result = governor.call("cpptester/fail", Sid::new(7, 3), vec![memory(b"boom")], 1);
    assert_eq!(result, ResultMsg::error(Sid::new(7, 3), "boom"));
    assert_eq!(result.info.error.as_deref(), Some("\"boom\""));

    // Arity check failure.
    let result = governor.call("cpptester/hello", Sid::new(7, 4), Vec::new(), 1);
    assert_eq!(
        result.info.error.as_deref(),
        Some("\"Invalid number of arguments, expected = 1, but got = 0\"")
    );

    // Output count mismatch.
    let result = governor.call("cpptester/noop", Sid::new(7, 5), Vec::new(), 2);
    assert_eq!(
        result.info.error.as_deref(),
        Some("\"Task produced 0 outputs, but expected 2\"")
    );

    // File-backed input.
    let input_path = dir.path().join("input.txt");
    std::fs::write(&input_path, b"abc").unwrap();
    let result = governor.call(
        "cpptester/hello",
        Sid::new(7, 6),
        vec![Location::Path(input_path.to_str().unwrap().into())],
        1,
    );
    assert_eq!(result.task, Sid::new(7, 6));
    assert_eq!(
        result.outputs.unwrap()[0].location,
        memory(b"Hello abc!")
    );

    // Inputs are only decoded after the method resolves: a garbage input
    // spec on an unknown method still yields an error result.
    let call = CallMsg {
        spec: TaskSpec {
            task_type: "cpptester/missing".into(),
            id: Sid::new(7, 7),
        },
        inputs: vec![Value::Text("garbage".into())],
        outputs: Vec::new(),
    };
    governor.send(&Message::Call(call));
    let Message::Result(result) = governor.receive() else {
        panic!("expected a result message");
    };
    assert!(!result.success);
    assert!(
        result
            .info
            .error
            .as_deref()
            .unwrap()
            .contains("Method 'cpptester/missing' not found")
    );

    // A closed governor socket is fatal for the executor.
    drop(governor);
    assert!(matches!(
        executor.join().unwrap(),
        ExecutorError::PeerClosed
    ));
}

#[test]
fn unexpected_message_kind_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("governor.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let executor = spawn_executor(&socket_path);
    let mut governor = MockGovernor::accept(&listener);
    governor.expect_register();

    // A result message is well-formed but not served by executors.
    governor.send(&Message::Result(ResultMsg::error(Sid::new(1, 1), "bogus")));
    assert!(matches!(
        executor.join().unwrap(),
        ExecutorError::UnexpectedMessage(kind) if kind == "result"
    ));
}

#[test]
fn malformed_envelope_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("governor.sock");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let executor = spawn_executor(&socket_path);
    let mut governor = MockGovernor::accept(&listener);
    governor.expect_register();

    governor.send_raw(&to_bytes(&Value::Text("not an envelope".into())).unwrap());
    assert!(matches!(
        executor.join().unwrap(),
        ExecutorError::Protocol(_)
    ));
}
