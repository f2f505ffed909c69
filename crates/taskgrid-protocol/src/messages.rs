//! Message types for the governor–executor protocol.
//!
//! Every message on the wire is a two-element array `[kind, payload]`
//! where `kind` is a text string and `payload` a map. Three kinds exist:
//!
//! - `"register"`: executor to governor, sent once after connecting
//! - `"call"`: governor to executor, one task invocation
//! - `"result"`: executor to governor, the outcome of one call
//!
//! The positional shapes (the envelope, identifiers, data locations) carry
//! hand-written serde impls; everything else is derived.

use std::fmt;

use ciborium::value::Value;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PROTOCOL_VERSION;
use crate::ids::TaskId;

/// Top-level protocol message, wrapped on the wire as `[kind, payload]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Executor → governor greeting.
    Register(RegisterMsg),
    /// Governor → executor task invocation.
    Call(CallMsg),
    /// Executor → governor task outcome.
    Result(ResultMsg),
}

impl Message {
    /// Returns the envelope kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Register(_) => "register",
            Message::Call(_) => "call",
            Message::Result(_) => "result",
        }
    }
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut envelope = serializer.serialize_tuple(2)?;
        envelope.serialize_element(self.kind())?;
        match self {
            Message::Register(payload) => envelope.serialize_element(payload)?,
            Message::Call(payload) => envelope.serialize_element(payload)?,
            Message::Result(payload) => envelope.serialize_element(payload)?,
        }
        envelope.end()
    }
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MessageVisitor;

        impl<'de> Visitor<'de> for MessageVisitor {
            type Value = Message;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [kind, payload] message envelope")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Message, A::Error> {
                let kind: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let missing_payload = || de::Error::invalid_length(1, &self);
                match kind.as_str() {
                    "register" => Ok(Message::Register(
                        seq.next_element()?.ok_or_else(missing_payload)?,
                    )),
                    "call" => Ok(Message::Call(
                        seq.next_element()?.ok_or_else(missing_payload)?,
                    )),
                    "result" => Ok(Message::Result(
                        seq.next_element()?.ok_or_else(missing_payload)?,
                    )),
                    other => Err(de::Error::custom(format_args!(
                        "unknown message kind {other:?}"
                    ))),
                }
            }
        }

        deserializer.deserialize_tuple(2, MessageVisitor)
    }
}

/// First message sent by an executor after connecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterMsg {
    /// Protocol magic, always [`PROTOCOL_VERSION`].
    pub protocol: String,
    /// Executor type name, the prefix of every served `task_type`.
    pub executor_type: String,
    /// Instance id assigned by the governor at spawn time.
    pub executor_id: u32,
}

impl RegisterMsg {
    /// Creates a registration for the current protocol version.
    pub fn new(executor_type: impl Into<String>, executor_id: u32) -> Self {
        Self {
            protocol: PROTOCOL_VERSION.to_string(),
            executor_type: executor_type.into(),
            executor_id,
        }
    }
}

/// One task invocation issued by the governor.
///
/// Inputs and output stubs stay raw value trees here: the dispatcher only
/// decodes input specs once the task name has resolved, and stubs are
/// passed through to the produced objects untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMsg {
    /// What to run and under which task id.
    pub spec: TaskSpec,
    /// Input object descriptions, in argument order.
    #[serde(default)]
    pub inputs: Vec<Value>,
    /// Output stubs, one per declared output.
    #[serde(default)]
    pub outputs: Vec<Value>,
}

/// The `spec` map inside a call payload.
///
/// The governor sends further keys; only these two are consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Full method name of the form `"<executor_type>/<task_name>"`.
    pub task_type: String,
    /// Identifier of this task invocation.
    pub id: TaskId,
}

/// Description of one input object in a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    /// Where the object's bytes live.
    pub location: Location,
}

/// Spec of one produced output, sent back inside a success result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Object metadata; currently always empty.
    pub info: Value,
    /// Where the produced bytes live.
    pub location: Location,
}

impl OutputSpec {
    /// Creates a spec for an object at `location` with empty metadata.
    pub fn new(location: Location) -> Self {
        Self {
            info: Value::Map(Vec::new()),
            location,
        }
    }
}

/// Wire encoding of where a data object's bytes live.
///
/// A two-element array `[tag, payload]`: `["memory", <bytes>]` carries the
/// data inline, `["path", <text>]` points at a file on the local
/// filesystem.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Object bytes carried inline in the message.
    Memory(Vec<u8>),
    /// Absolute path of a file holding the object.
    Path(String),
}

impl Location {
    fn tag(&self) -> &'static str {
        match self {
            Location::Memory(_) => "memory",
            Location::Path(_) => "path",
        }
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(self.tag())?;
        match self {
            Location::Memory(data) => pair.serialize_element(serde_bytes::Bytes::new(data))?,
            Location::Path(path) => pair.serialize_element(path)?,
        }
        pair.end()
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LocationVisitor;

        impl<'de> Visitor<'de> for LocationVisitor {
            type Value = Location;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [tag, payload] location pair")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Location, A::Error> {
                let tag: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let missing_payload = || de::Error::invalid_length(1, &self);
                match tag.as_str() {
                    "memory" => {
                        let data: serde_bytes::ByteBuf =
                            seq.next_element()?.ok_or_else(missing_payload)?;
                        Ok(Location::Memory(data.into_vec()))
                    }
                    "path" => Ok(Location::Path(
                        seq.next_element()?.ok_or_else(missing_payload)?,
                    )),
                    other => Err(de::Error::custom(format_args!(
                        "unknown location tag {other:?}"
                    ))),
                }
            }
        }

        deserializer.deserialize_tuple(2, LocationVisitor)
    }
}

/// Outcome report for one task call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMsg {
    /// Task id copied verbatim from the call spec.
    pub task: TaskId,
    /// False when the info map carries an error.
    pub success: bool,
    /// Output object specs, present on success only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Vec<OutputSpec>>,
    /// Result metadata; empty on success.
    pub info: ResultInfo,
}

/// The `info` map of a result message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Diagnostic of a failed task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultMsg {
    /// Creates a success result carrying the given output specs.
    pub fn success(task: TaskId, outputs: Vec<OutputSpec>) -> Self {
        Self {
            task,
            success: true,
            outputs: Some(outputs),
            info: ResultInfo::default(),
        }
    }

    /// Creates a failure result carrying `message`.
    pub fn error(task: TaskId, message: impl Into<String>) -> Self {
        // TODO: replace the quote wrapping with a structured diagnostic
        // value; the governor currently expects the message in this exact
        // form.
        let error = format!("\"{}\"", message.into());
        Self {
            task,
            success: false,
            outputs: None,
            info: ResultInfo { error: Some(error) },
        }
    }
}
