//! Wire protocol for governor–executor communication.
//!
//! The taskgrid governor talks to its executors over a local stream
//! socket. Messages are framed with a 4-byte little-endian length prefix
//! and encoded as CBOR; every message is a `[kind, payload]` envelope.
//!
//! This crate holds the pieces shared by both ends of the socket:
//! identifiers ([`Sid`]), the codec ([`to_bytes`]/[`from_bytes`]), the
//! framing layer ([`encode_frame`]/[`FrameBuffer`]) and the typed message
//! set ([`Message`]).
//!
//! # Example
//!
//! ```rust
//! use taskgrid_protocol::{Message, RegisterMsg, from_bytes, to_bytes};
//!
//! let register = Message::Register(RegisterMsg::new("cpptester", 1));
//! let bytes = to_bytes(&register).unwrap();
//! let decoded: Message = from_bytes(&bytes).unwrap();
//! assert_eq!(decoded, register);
//! ```

mod error;
mod framing;
mod ids;
mod messages;
mod wire;

pub use ciborium::value::Value;
pub use error::{ProtocolError, ProtocolResult};
pub use framing::{FrameBuffer, encode_frame};
pub use ids::{DataObjectId, Sid, TaskId};
pub use messages::{
    CallMsg, InputSpec, Location, Message, OutputSpec, RegisterMsg, ResultInfo, ResultMsg,
    TaskSpec,
};
pub use wire::{from_bytes, from_value, to_bytes, to_value};

/// Protocol magic announced during registration.
pub const PROTOCOL_VERSION: &str = "cbor-1";

/// Maximum frame payload size (128 MiB).
pub const MAX_MESSAGE_SIZE: usize = 128 * 1024 * 1024;
