//! Data objects: the read-only blobs handed to task functions.
//!
//! An object either owns its bytes inline or points at a file that is
//! lazily mapped on first access. Both variants share the same read
//! surface (`size`, `bytes`, `read_as_string`) and know how to encode
//! their location for the wire.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use memmap2::Mmap;
use taskgrid_protocol::{InputSpec, Location, OutputSpec, Value, from_value};

use crate::error::{ExecutorError, ExecutorResult};

/// A read-only byte sequence carried by the protocol.
///
/// Each object is owned exclusively by the inputs or the outputs of a
/// single call; the runtime never mutates the data.
#[derive(Debug)]
pub enum DataInstance {
    /// Bytes owned inline.
    Memory(Vec<u8>),
    /// A file on the local filesystem, mapped on demand.
    File(FileBacked),
}

impl DataInstance {
    /// Creates a memory-backed object owning `data`.
    pub fn memory(data: impl Into<Vec<u8>>) -> Self {
        DataInstance::Memory(data.into())
    }

    /// Creates a file-backed object for `path` with size and mapping
    /// still unresolved.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DataInstance::File(FileBacked::new(path))
    }

    /// Builds an object from the raw tree of one input spec.
    ///
    /// Inline bytes become an owned memory object; a path becomes a
    /// file-backed object with size and mapping still unresolved. An
    /// unusable spec (unknown location tags included) is fatal.
    pub fn from_input_spec(item: &Value) -> ExecutorResult<Self> {
        let spec: InputSpec = from_value(item)?;
        Ok(match spec.location {
            Location::Memory(data) => DataInstance::Memory(data),
            Location::Path(path) => DataInstance::file(path),
        })
    }

    /// Number of bytes in the object.
    ///
    /// The first call on a file-backed object stats the file; the result
    /// is cached for the object's lifetime.
    pub fn size(&self) -> ExecutorResult<u64> {
        match self {
            DataInstance::Memory(data) => Ok(data.len() as u64),
            DataInstance::File(file) => file.size(),
        }
    }

    /// The object's bytes.
    ///
    /// The first call on a file-backed object maps the whole file
    /// read-only; every later call returns the same mapping.
    pub fn bytes(&self) -> ExecutorResult<&[u8]> {
        match self {
            DataInstance::Memory(data) => Ok(data),
            DataInstance::File(file) => file.bytes(),
        }
    }

    /// The current byte contents as text.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the file is not
    /// re-read.
    pub fn read_as_string(&self) -> ExecutorResult<String> {
        Ok(String::from_utf8_lossy(self.bytes()?).into_owned())
    }

    /// Encodes where this object's bytes live.
    pub fn make_location(&self) -> Location {
        match self {
            DataInstance::Memory(data) => Location::Memory(data.clone()),
            DataInstance::File(file) => {
                Location::Path(file.path().to_string_lossy().into_owned())
            }
        }
    }

    /// Builds the output spec sent back to the governor for this object.
    ///
    /// `_stub` is the governor's per-index output stub; the current
    /// protocol revision consumes nothing from it.
    pub fn make_output_spec(&self, _stub: &Value) -> OutputSpec {
        OutputSpec::new(self.make_location())
    }
}

/// Lazily resolved file-backed data.
///
/// Resolution is a one-way state machine: unresolved, size known, mapped.
/// A mutex guards the transitions; once resolved, `size` and the mapping
/// are read lock-free and stay stable until the object is dropped, which
/// releases the mapping.
#[derive(Debug)]
pub struct FileBacked {
    path: PathBuf,
    resolve: Mutex<()>,
    size: OnceLock<u64>,
    mapping: OnceLock<Mmap>,
}

impl FileBacked {
    fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resolve: Mutex::new(()),
            size: OnceLock::new(),
            mapping: OnceLock::new(),
        }
    }

    /// The file path this object points at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn size(&self) -> ExecutorResult<u64> {
        if let Some(size) = self.size.get() {
            return Ok(*size);
        }
        let _guard = self.resolve.lock().unwrap_or_else(|e| e.into_inner());
        self.size_locked()
    }

    fn size_locked(&self) -> ExecutorResult<u64> {
        if let Some(size) = self.size.get() {
            return Ok(*size);
        }
        let metadata = std::fs::metadata(&self.path)
            .map_err(|source| ExecutorError::stat_failed(&self.path, source))?;
        Ok(*self.size.get_or_init(|| metadata.len()))
    }

    fn bytes(&self) -> ExecutorResult<&[u8]> {
        if let Some(mapping) = self.mapping.get() {
            return Ok(mapping);
        }
        let _guard = self.resolve.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mapping) = self.mapping.get() {
            return Ok(mapping);
        }
        self.size_locked()?;
        let file = File::open(&self.path)
            .map_err(|source| ExecutorError::map_failed(&self.path, source))?;
        // Read-only shared map; the governor guarantees object files stay
        // unmodified while tasks run. The fd is closed right after mapping.
        let mapping = unsafe { Mmap::map(&file) }
            .map_err(|source| ExecutorError::map_failed(&self.path, source))?;
        Ok(self.mapping.get_or_init(|| mapping))
    }
}
