//! Pool whose header width is picked from its capacity at construction.

use alloc::boxed::Box;
use core::{
  fmt,
  ptr::NonNull,
};

use super::{
  BlockInfo,
  RawPool,
};
use crate::{
  error::Result,
  width::Width,
};

#[derive(Debug, Clone)]
pub enum DynPool {
  U8(RawPool<u8>),
  U16(RawPool<u16>),
  U32(RawPool<u32>),
  U64(RawPool<u64>),
}

macro_rules! dispatch {
  ($self:expr, $pool:ident => $body:expr) => {
    match $self {
      DynPool::U8($pool) => $body,
      DynPool::U16($pool) => $body,
      DynPool::U32($pool) => $body,
      DynPool::U64($pool) => $body,
    }
  };
}

impl DynPool {
  /// Builds a pool with the narrowest header width covering `capacity`.
  pub fn new(capacity: usize) -> Result<Self> {
    Ok(match Width::for_capacity(capacity) {
      Width::U8 => DynPool::U8(RawPool::new(capacity)?),
      Width::U16 => DynPool::U16(RawPool::new(capacity)?),
      Width::U32 => DynPool::U32(RawPool::new(capacity)?),
      Width::U64 => DynPool::U64(RawPool::new(capacity)?),
    })
  }

  pub fn width(&self) -> Width {
    match self {
      DynPool::U8(_) => Width::U8,
      DynPool::U16(_) => Width::U16,
      DynPool::U32(_) => Width::U32,
      DynPool::U64(_) => Width::U64,
    }
  }

  /// Header bytes charged to every allocation.
  pub fn overhead(&self) -> usize {
    self.width().bytes()
  }

  pub fn capacity(&self) -> usize {
    dispatch!(self, pool => pool.capacity())
  }

  pub fn base(&self) -> NonNull<u8> {
    dispatch!(self, pool => pool.base())
  }

  pub fn free_bytes(&self) -> usize {
    dispatch!(self, pool => pool.free_bytes())
  }

  pub fn first_free(&self) -> Option<usize> {
    dispatch!(self, pool => pool.first_free())
  }

  pub fn has_space(&self, size: usize) -> bool {
    dispatch!(self, pool => pool.has_space(size))
  }

  pub fn contains(&self, ptr: *const u8) -> bool {
    dispatch!(self, pool => pool.contains(ptr))
  }

  pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
    dispatch!(self, pool => pool.allocate(size))
  }

  pub fn allocate_aligned(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
    dispatch!(self, pool => pool.allocate_aligned(size, align))
  }

  pub fn deallocate(&mut self, ptr: NonNull<u8>) -> Result<()> {
    dispatch!(self, pool => pool.deallocate(ptr))
  }

  pub fn blocks(&self) -> Box<dyn Iterator<Item = BlockInfo> + '_> {
    dispatch!(self, pool => Box::new(pool.blocks()))
  }

  pub fn dump(&self, limit: usize) -> Box<dyn fmt::Display + '_> {
    dispatch!(self, pool => Box::new(pool.dump(limit)))
  }

  pub fn try_clone(&self) -> Result<Self> {
    Ok(match self {
      DynPool::U8(pool) => DynPool::U8(pool.try_clone()?),
      DynPool::U16(pool) => DynPool::U16(pool.try_clone()?),
      DynPool::U32(pool) => DynPool::U32(pool.try_clone()?),
      DynPool::U64(pool) => DynPool::U64(pool.try_clone()?),
    })
  }
}
