//! Errors reported by pools and the adapters built on them.

use alloc::alloc::AllocError;

use crate::width::Width;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
  /// No single free region can hold the request, or the backing buffer could
  /// not be obtained.
  #[error("out of pool memory: {requested} bytes requested")]
  OutOfMemory { requested: usize },

  /// The address was never handed out by this pool, or is already free.
  #[error("pointer {addr:#x} does not name an occupied block of this pool")]
  InvalidPointer { addr: usize },

  /// The free list is not in the shape the pool keeps it in.
  #[error("free list corrupted near offset {offset}")]
  Corrupted { offset: usize },

  #[error("capacity {capacity} cannot be addressed with {width} headers")]
  InvalidCapacity { capacity: usize, width: Width },
}

impl PoolError {
  pub fn is_out_of_memory(&self) -> bool {
    matches!(self, PoolError::OutOfMemory { .. })
  }
}

impl From<PoolError> for AllocError {
  fn from(_: PoolError) -> Self {
    AllocError
  }
}

pub type Result<T, E = PoolError> = core::result::Result<T, E>;
