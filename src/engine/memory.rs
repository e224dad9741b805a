//! Caller memory transport
//!
//! A hooked syscall hands its result back through the same channel the real
//! call uses. [`UserMemory`] models that channel; a failed copy is a fault.

use crate::error::{DeceptionError, Result};

/// Destination for a syscall's output structure
pub trait UserMemory {
    /// Copy `bytes` into the caller's buffer
    fn copy_to_user(&mut self, bytes: &[u8]) -> Result<()>;
}

/// An in-process stand-in for a caller's output buffer
#[derive(Debug, Clone)]
pub struct UserBuffer {
    data: Vec<u8>,
    capacity: usize,
    mapped: bool,
}

impl UserBuffer {
    /// A writable buffer of `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            capacity,
            mapped: true,
        }
    }

    /// A buffer whose every copy faults, like a bad user pointer
    pub fn unmapped() -> Self {
        Self {
            data: Vec::new(),
            capacity: 0,
            mapped: false,
        }
    }

    /// Bytes written by the last successful copy
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl UserMemory for UserBuffer {
    fn copy_to_user(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.mapped || bytes.len() > self.capacity {
            return Err(DeceptionError::TransportFault);
        }

        self.data.clear();
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}
