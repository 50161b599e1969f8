//! [`Allocator`] adapter over a fixed-capacity pool.
//!
//! Requests are forwarded to the pool in bytes, so the same adapter serves
//! every element type. Containers that clone their allocator, such as
//! `BTreeMap`, should be handed `&PoolAllocator`: the reference is `Copy` and
//! every copy allocates from the same pool.

use alloc::{
  alloc::{
    AllocError,
    Allocator,
    Layout,
  },
  string::{
    String,
    ToString,
  },
  vec::Vec,
};
use core::{
  cell::RefCell,
  mem,
  ptr::NonNull,
};

use crate::{
  error::{
    PoolError,
    Result,
  },
  pool::{
    BlockInfo,
    DynPool,
  },
  width::{
    Width,
    pool_capacity_for,
  },
};

/// Pool-backed allocator.
///
/// Not reentrant: a nested call while the pool is borrowed panics instead of
/// touching the free list.
#[derive(Debug)]
pub struct PoolAllocator {
  pool: RefCell<DynPool>,
}

impl PoolAllocator {
  pub fn try_new(capacity: usize) -> Result<Self> {
    DynPool::new(capacity).map(Self::from)
  }

  pub fn new(capacity: usize) -> Self {
    Self::try_new(capacity)
      .unwrap_or_else(|err| panic!("Failed to create pool of capacity {capacity}: {err}"))
  }

  /// Pool sized for `count` separate allocations of one `T` each.
  pub fn try_for_elements<T>(count: usize) -> Result<Self> {
    let capacity = pool_capacity_for(count, mem::size_of::<T>(), mem::align_of::<T>()).ok_or(
      PoolError::OutOfMemory {
        requested: count.saturating_mul(mem::size_of::<T>()),
      },
    )?;
    Self::try_new(capacity)
  }

  pub fn for_elements<T>(count: usize) -> Self {
    Self::try_for_elements::<T>(count)
      .unwrap_or_else(|err| panic!("Failed to size pool for {count} elements: {err}"))
  }

  /// Independent copy of the pool: same layout and contents, new buffer.
  ///
  /// The copy never compares equal to `self`, and memory handed out by one
  /// must not be returned to the other.
  pub fn duplicate(&self) -> Result<Self> {
    self.pool.borrow().try_clone().map(Self::from)
  }

  pub fn capacity(&self) -> usize {
    self.pool.borrow().capacity()
  }

  pub fn width(&self) -> Width {
    self.pool.borrow().width()
  }

  pub fn overhead(&self) -> usize {
    self.pool.borrow().overhead()
  }

  pub fn free_bytes(&self) -> usize {
    self.pool.borrow().free_bytes()
  }

  pub fn first_free(&self) -> Option<usize> {
    self.pool.borrow().first_free()
  }

  pub fn base(&self) -> NonNull<u8> {
    self.pool.borrow().base()
  }

  pub fn has_space(&self, size: usize) -> bool {
    self.pool.borrow().has_space(size)
  }

  pub fn blocks(&self) -> Vec<BlockInfo> {
    self.pool.borrow().blocks().collect()
  }

  pub fn dump(&self, limit: usize) -> String {
    self.pool.borrow().dump(limit).to_string()
  }

  pub fn into_inner(self) -> DynPool {
    self.pool.into_inner()
  }
}

impl From<DynPool> for PoolAllocator {
  fn from(pool: DynPool) -> Self {
    Self {
      pool: RefCell::new(pool),
    }
  }
}

/// Two adapters are interchangeable only when they share one pool buffer
/// in the same state.
impl PartialEq for PoolAllocator {
  fn eq(&self, other: &Self) -> bool {
    let (lhs, rhs) = (self.pool.borrow(), other.pool.borrow());
    (lhs.base(), lhs.free_bytes(), lhs.first_free()) == (rhs.base(), rhs.free_bytes(), rhs.first_free())
  }
}

impl Eq for PoolAllocator {}

unsafe impl Allocator for PoolAllocator {
  fn allocate(&self, layout: Layout) -> core::result::Result<NonNull<[u8]>, AllocError> {
    let ptr = self
      .pool
      .borrow_mut()
      .allocate_aligned(layout.size(), layout.align())?;
    Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
  }

  unsafe fn deallocate(&self, ptr: NonNull<u8>, _layout: Layout) {
    if let Err(err) = self.pool.borrow_mut().deallocate(ptr) {
      panic!("PoolAllocator::deallocate: {err}");
    }
  }
}

#[cfg(test)]
mod tests;
