//! Fixed-capacity pool with an address-ordered free list.
//!
//! A pool of capacity `C` with header width `H` owns a buffer of
//! `C + H + SAFETY_PADDING` bytes. Blocks tile `[0, C + H)`: each block is an
//! `H`-byte `size` field followed by `size` payload bytes. Free blocks keep
//! the offset of the next free block in the first `H` payload bytes, so a
//! free block always has `size >= H`. Whether a block is free is decided by
//! free-list membership only.
//!
//! ```text
//! occupied: | size | payload ...........|
//! free:     | size | next | ............|
//! ```

mod block;
mod dump;
mod dynamic;


use alloc::alloc::{
  Allocator,
  Global,
  Layout,
};
use core::ptr::{
  self,
  NonNull,
};

use getset::CopyGetters;
use tracing::{
  debug,
  trace,
  warn,
};

pub use block::{
  BlockInfo,
  BlockState,
  Blocks,
};
pub use dump::PoolDump;
pub use dynamic::DynPool;

use crate::{
  error::{
    PoolError,
    Result,
  },
  width::Offset,
};

/// Bytes kept after the addressable region of every pool buffer.
pub const SAFETY_PADDING: usize = 16;

const BUFFER_ALIGN: usize = 16;

/// A fixed-capacity byte pool whose headers use `O` for offsets and sizes.
///
/// The pool is single-threaded: it holds a raw buffer pointer and is neither
/// `Send` nor `Sync`.
#[derive(Debug, CopyGetters)]
pub struct RawPool<O: Offset> {
  data: NonNull<u8>,
  /// Addressable payload capacity in bytes.
  #[getset(get_copy = "pub")]
  capacity: usize,
  count: O,
  first_free_block: O,
}

impl<O: Offset> RawPool<O> {
  /// Header bytes charged to every allocation.
  pub const OVERHEAD: usize = O::WIDTH;

  const FREE_HEADER: usize = 2 * O::WIDTH;

  pub fn new(capacity: usize) -> Result<Self> {
    if capacity > O::MAX_CAPACITY || capacity < O::WIDTH {
      return Err(PoolError::InvalidCapacity {
        capacity,
        width: O::KIND,
      });
    }

    let layout = Self::buffer_layout(capacity)?;
    let data = Global
      .allocate_zeroed(layout)
      .map_err(|_| PoolError::OutOfMemory {
        requested: layout.size(),
      })?
      .cast::<u8>();

    let mut pool = Self {
      data,
      capacity,
      count: O::from_usize(capacity),
      first_free_block: O::from_usize(0),
    };
    pool.set_size(0, capacity);
    pool.set_next(0, None);

    debug!(capacity, width = %O::KIND, "pool created");
    Ok(pool)
  }

  fn buffer_layout(capacity: usize) -> Result<Layout> {
    let len = capacity
      .checked_add(O::WIDTH + SAFETY_PADDING)
      .ok_or(PoolError::OutOfMemory {
        requested: capacity,
      })?;
    Layout::from_size_align(len, BUFFER_ALIGN).map_err(|_| PoolError::OutOfMemory { requested: len })
  }

  fn buffer_len(&self) -> usize {
    self.capacity + O::WIDTH + SAFETY_PADDING
  }

  /// Start of the pool buffer.
  pub fn base(&self) -> NonNull<u8> {
    self.data
  }

  /// Sum of the sizes of all free blocks.
  pub fn free_bytes(&self) -> usize {
    self.count.to_usize()
  }

  /// Offset of the first free block, `None` when the pool is full.
  pub fn first_free(&self) -> Option<usize> {
    self.head()
  }

  /// Optimistic check: the free bytes cover `size` plus one header.
  ///
  /// Fragmentation is ignored, so [`allocate`](Self::allocate) can still fail
  /// when this returns `true`.
  pub fn has_space(&self, size: usize) -> bool {
    size
      .checked_add(Self::OVERHEAD)
      .is_some_and(|needed| self.free_bytes() >= needed)
  }

  /// Whether `ptr` falls inside the payload region of this pool.
  pub fn contains(&self, ptr: *const u8) -> bool {
    let addr = ptr as usize;
    let start = self.data.as_ptr() as usize + O::WIDTH;
    addr >= start && addr < start + self.capacity
  }

  /// First-fit allocation of `size` contiguous bytes.
  pub fn allocate(&mut self, size: usize) -> Result<NonNull<u8>> {
    self.allocate_aligned(size, 1)
  }

  /// First-fit allocation of `size` bytes whose address is a multiple of
  /// `align`, which must be a power of two.
  pub fn allocate_aligned(&mut self, requested: usize, align: usize) -> Result<NonNull<u8>> {
    debug_assert!(align.is_power_of_two());
    if !self.has_space(requested) {
      debug!(requested, free = self.free_bytes(), "pool request exceeds free bytes");
      return Err(PoolError::OutOfMemory { requested });
    }
    // a freed block must have room for its `next` field
    let size = requested.max(O::WIDTH);

    let mut prev = None;
    let mut cursor = self.head();
    while let Some(node) = cursor {
      let pad = self.front_padding(node, align);
      let Some(wanted) = pad.checked_add(size) else {
        break;
      };
      while self.size_at(node) < wanted && self.merge_with_next(node) {}

      if self.size_at(node) >= wanted {
        let block = self.carve(prev, node, pad, size);
        // SAFETY: block + H lies inside the buffer
        return Ok(unsafe { NonNull::new_unchecked(self.data.as_ptr().add(block + O::WIDTH)) });
      }

      prev = Some(node);
      cursor = self.next_at(node);
    }

    debug!(requested, align, free = self.free_bytes(), "no free block large enough");
    Err(PoolError::OutOfMemory { requested })
  }

  /// Bytes to skip at the front of free block `node` so that its payload
  /// lands on `align`. Non-zero padding is at least one free header.
  fn front_padding(&self, node: usize, align: usize) -> usize {
    let payload = self.data.as_ptr() as usize + node + O::WIDTH;
    let mut pad = payload.next_multiple_of(align) - payload;
    if pad != 0 {
      while pad < Self::FREE_HEADER {
        pad += align;
      }
    }
    pad
  }

  /// Turns free block `node` (linked from `prev`) into an occupied block of
  /// at least `size` bytes starting `pad` bytes in. Returns the occupied
  /// block's offset.
  fn carve(&mut self, prev: Option<usize>, node: usize, pad: usize, size: usize) -> usize {
    let total = self.size_at(node);
    let next = self.next_at(node);
    let block = node + pad;

    let (link_from, available, mut kept) = if pad > 0 {
      self.set_size(node, pad - O::WIDTH);
      trace!(offset = node, size = pad - O::WIDTH, "kept alignment padding free");
      (Some(node), total - pad, pad - O::WIDTH)
    } else {
      (prev, total, 0)
    };

    if available >= size + Self::FREE_HEADER {
      let rest = block + O::WIDTH + size;
      let rest_size = available - size - O::WIDTH;
      self.set_size(rest, rest_size);
      self.set_next(rest, next);
      self.link(link_from, Some(rest));
      self.set_size(block, size);
      kept += rest_size;
      trace!(offset = block, size, rest, rest_size, "split free block");
    } else {
      self.link(link_from, next);
      self.set_size(block, available);
      trace!(offset = block, size = available, "took whole free block");
    }

    self.set_count(self.free_bytes() - total + kept);
    block
  }

  /// Returns the block behind `ptr` to the free list and coalesces it with
  /// physically adjacent free neighbours.
  ///
  /// Validating `ptr` walks the block chain from offset 0, so every call is
  /// linear in the number of blocks, including frees that become the head.
  pub fn deallocate(&mut self, ptr: NonNull<u8>) -> Result<()> {
    let addr = ptr.as_ptr() as usize;
    if !self.contains(ptr.as_ptr()) {
      warn!(addr, "pointer outside pool");
      return Err(PoolError::InvalidPointer { addr });
    }

    let offset = addr - self.data.as_ptr() as usize - O::WIDTH;
    if !self.is_occupied_block(offset) {
      warn!(addr, offset, "pointer is not an occupied block");
      return Err(PoolError::InvalidPointer { addr });
    }

    let size = self.size_at(offset);
    match self.head() {
      Some(head) if head < offset => {
        let prev = self.find_previous_free_block(offset)?;
        let next = self.next_at(prev);
        self.set_next(offset, next);
        self.set_next(prev, Some(offset));
        self.set_count(self.free_bytes() + size);
        trace!(offset, size, prev, "spliced freed block");
        self.merge_with_next(offset);
        self.merge_with_next(prev);
      }
      head => {
        self.set_next(offset, head);
        self.set_head(Some(offset));
        self.set_count(self.free_bytes() + size);
        trace!(offset, size, "freed block is new head");
        self.merge_with_next(offset);
      }
    }
    Ok(())
  }

  /// The free node after which `offset` belongs in address order.
  fn find_previous_free_block(&self, offset: usize) -> Result<usize> {
    let mut cursor = self.head();
    while let Some(node) = cursor {
      if node >= offset {
        break;
      }
      match self.next_at(node) {
        Some(next) if next <= node => break,
        Some(next) if next <= offset => cursor = Some(next),
        _ => return Ok(node),
      }
    }
    Err(PoolError::Corrupted { offset })
  }

  /// Absorbs the next free node into `node` when it starts right where
  /// `node` ends.
  fn merge_with_next(&mut self, node: usize) -> bool {
    let Some(next) = self.next_at(node) else {
      return false;
    };
    if self.end_of(node) != next {
      return false;
    }

    let merged = self.size_at(node) + O::WIDTH + self.size_at(next);
    let after = self.next_at(next);
    self.set_size(node, merged);
    self.set_next(node, after);
    self.set_count(self.free_bytes() + O::WIDTH);
    trace!(offset = node, absorbed = next, size = merged, "merged adjacent free blocks");
    true
  }

  /// Walks the block chain to check `offset` is a block boundary not on
  /// the free list.
  fn is_occupied_block(&self, offset: usize) -> bool {
    self
      .blocks()
      .take_while(|block| block.offset() <= offset)
      .any(|block| block.offset() == offset && block.state() == BlockState::Occupied)
  }

  /// Deep copy into a freshly allocated buffer.
  pub fn try_clone(&self) -> Result<Self> {
    let layout = Self::buffer_layout(self.capacity)?;
    let data = Global
      .allocate(layout)
      .map_err(|_| PoolError::OutOfMemory {
        requested: layout.size(),
      })?
      .cast::<u8>();
    // SAFETY: both buffers are `buffer_len` bytes and distinct
    unsafe { ptr::copy_nonoverlapping(self.data.as_ptr(), data.as_ptr(), self.buffer_len()) };

    Ok(Self {
      data,
      capacity: self.capacity,
      count: self.count,
      first_free_block: self.first_free_block,
    })
  }
}

impl<O: Offset> Clone for RawPool<O> {
  fn clone(&self) -> Self {
    self
      .try_clone()
      .unwrap_or_else(|err| panic!("Failed to clone pool of capacity {}: {err}", self.capacity))
  }
}

impl<O: Offset> Drop for RawPool<O> {
  fn drop(&mut self) {
    // SAFETY: the same size and alignment were validated in `new`
    let layout = unsafe { Layout::from_size_align_unchecked(self.buffer_len(), BUFFER_ALIGN) };
    // SAFETY: data was allocated by Global with this layout
    unsafe { Global.deallocate(self.data, layout) };
  }
}
