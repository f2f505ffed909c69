//! Session-scoped identifiers.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A session-scoped identifier: a `(session, id)` pair.
///
/// The zero pair `(0, 0)` is the "invalid" sentinel. On the wire a `Sid`
/// is a two-element array of unsigned integers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sid {
    session_id: u32,
    id: u32,
}

/// Identifier of a task invocation.
pub type TaskId = Sid;

/// Identifier of a data object.
pub type DataObjectId = Sid;

impl Sid {
    /// Creates an identifier from a session id and a per-session id.
    pub fn new(session_id: u32, id: u32) -> Self {
        Self { session_id, id }
    }

    /// Returns the session part.
    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Returns the per-session part.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns false for the `(0, 0)` sentinel.
    pub fn is_valid(&self) -> bool {
        self.session_id != 0 || self.id != 0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.session_id, self.id)
    }
}

impl Serialize for Sid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.session_id)?;
        pair.serialize_element(&self.id)?;
        pair.end()
    }
}

impl<'de> Deserialize<'de> for Sid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SidVisitor;

        impl<'de> Visitor<'de> for SidVisitor {
            type Value = Sid;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a [session_id, id] pair of unsigned integers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Sid, A::Error> {
                let session_id = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let id = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(Sid::new(session_id, id))
            }
        }

        deserializer.deserialize_tuple(2, SidVisitor)
    }
}
