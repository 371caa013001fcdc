//! Encoded job container.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier attached to every encoded job and its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying uuid
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device command bytes ready for streaming.
///
/// Immutable once built; the transport takes it by value. Two jobs are
/// equal when they carry the same bytes and pass count, whatever their ids.
#[derive(Debug, Clone)]
pub struct EncodedJob {
    id: JobId,
    bytes: Vec<u8>,
    passes: usize,
}

impl EncodedJob {
    pub fn new(bytes: Vec<u8>, passes: usize) -> Self {
        Self {
            id: JobId::new(),
            bytes,
            passes,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of chunks the job splits into at `chunk_size`
    pub fn chunk_count(&self, chunk_size: usize) -> usize {
        if chunk_size == 0 {
            return 0;
        }
        self.bytes.len().div_ceil(chunk_size)
    }
}

impl PartialEq for EncodedJob {
    fn eq(&self, other: &Self) -> bool {
        self.passes == other.passes && self.bytes == other.bytes
    }
}

impl Eq for EncodedJob {}
