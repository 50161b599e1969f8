//! Header access and the physical block walk.

use getset::CopyGetters;

use super::RawPool;
use crate::width::Offset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
  Free,
  Occupied,
}

/// One block as seen by a physical walk of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct BlockInfo {
  /// Header offset from the pool base.
  offset: usize,
  /// Payload bytes, header excluded.
  size: usize,
  state: BlockState,
}

impl BlockInfo {
  pub fn is_free(&self) -> bool {
    self.state == BlockState::Free
  }
}

impl<O: Offset> RawPool<O> {
  fn field(&self, offset: usize) -> *mut u8 {
    debug_assert!(offset + O::WIDTH <= self.buffer_len());
    // SAFETY: offsets stay within the buffer
    unsafe { self.data.as_ptr().add(offset) }
  }

  pub(super) fn size_at(&self, offset: usize) -> usize {
    // SAFETY: `field` points into the buffer
    unsafe { O::read(self.field(offset)) }.to_usize()
  }

  pub(super) fn set_size(&mut self, offset: usize, size: usize) {
    // SAFETY: `field` points into the buffer
    unsafe { O::from_usize(size).write(self.field(offset)) }
  }

  pub(super) fn next_at(&self, offset: usize) -> Option<usize> {
    // SAFETY: `field` points into the buffer
    let next = unsafe { O::read(self.field(offset + O::WIDTH)) };
    (next != O::NONE).then(|| next.to_usize())
  }

  pub(super) fn set_next(&mut self, offset: usize, next: Option<usize>) {
    let next = next.map_or(O::NONE, O::from_usize);
    // SAFETY: `field` points into the buffer
    unsafe { next.write(self.field(offset + O::WIDTH)) }
  }

  /// Offset right past the payload of the block at `offset`.
  pub(super) fn end_of(&self, offset: usize) -> usize {
    offset + O::WIDTH + self.size_at(offset)
  }

  pub(super) fn head(&self) -> Option<usize> {
    (self.first_free_block != O::NONE).then(|| self.first_free_block.to_usize())
  }

  pub(super) fn set_head(&mut self, head: Option<usize>) {
    self.first_free_block = head.map_or(O::NONE, O::from_usize);
  }

  /// Points the list head (`from == None`) or the node `from` at `to`.
  pub(super) fn link(&mut self, from: Option<usize>, to: Option<usize>) {
    match from {
      Some(node) => self.set_next(node, to),
      None => self.set_head(to),
    }
  }

  pub(super) fn set_count(&mut self, count: usize) {
    debug_assert!(count <= self.capacity);
    self.count = O::from_usize(count);
  }

  /// Every block in address order.
  pub fn blocks(&self) -> Blocks<'_, O> {
    Blocks {
      pool: self,
      pos: 0,
      next_free: self.head(),
    }
  }
}

pub struct Blocks<'pool, O: Offset> {
  pool: &'pool RawPool<O>,
  pos: usize,
  next_free: Option<usize>,
}

impl<O: Offset> Iterator for Blocks<'_, O> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<Self::Item> {
    if self.pos >= self.pool.capacity + O::WIDTH {
      return None;
    }

    let offset = self.pos;
    let size = self.pool.size_at(offset);
    let state = if self.next_free == Some(offset) {
      self.next_free = self.pool.next_at(offset);
      BlockState::Free
    } else {
      BlockState::Occupied
    };
    self.pos = self.pool.end_of(offset);

    Some(BlockInfo {
      offset,
      size,
      state,
    })
  }
}
