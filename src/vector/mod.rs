//! Minimal growable array over any [`Allocator`].

use alloc::alloc::{
  AllocError,
  Allocator,
  Global,
  Layout,
};
use core::{
  fmt,
  mem,
  ops::{
    Deref,
    DerefMut,
  },
  ptr::{
    self,
    NonNull,
  },
  slice,
};

const INITIAL_CAPACITY: usize = 8;

pub struct PoolVec<T, A: Allocator = Global> {
  ptr: NonNull<T>,
  len: usize,
  capacity: usize,
  allocator: A,
}

impl<T> PoolVec<T, Global> {
  pub fn new() -> Self {
    Self::new_in(Global)
  }

  pub fn filled(len: usize, value: T) -> Self
  where
    T: Clone,
  {
    Self::filled_in(len, value, Global)
  }
}

impl<T> Default for PoolVec<T, Global> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T, A: Allocator> PoolVec<T, A> {
  pub fn new_in(allocator: A) -> Self {
    Self {
      ptr: NonNull::dangling(),
      len: 0,
      capacity: 0,
      allocator,
    }
  }

  /// A vector of `len` copies of `value`, allocated in one request.
  pub fn try_filled_in(len: usize, value: T, allocator: A) -> Result<Self, AllocError>
  where
    T: Clone,
  {
    let mut vec = Self::new_in(allocator);
    vec.try_reserve_exact(len)?;
    for _ in 0..len {
      vec.try_push(value.clone())?;
    }
    Ok(vec)
  }

  pub fn filled_in(len: usize, value: T, allocator: A) -> Self
  where
    T: Clone,
  {
    Self::try_filled_in(len, value, allocator).expect("Failed to allocate PoolVec")
  }

  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.len == 0
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn allocator(&self) -> &A {
    &self.allocator
  }

  /// Grows the buffer to hold exactly `capacity` elements. Smaller requests
  /// are ignored.
  pub fn try_reserve_exact(&mut self, capacity: usize) -> Result<(), AllocError> {
    if capacity <= self.capacity || mem::size_of::<T>() == 0 {
      return Ok(());
    }

    let layout = Layout::array::<T>(capacity).map_err(|_| AllocError)?;
    let new_ptr = self.allocator.allocate(layout)?.cast::<T>();
    if self.capacity > 0 {
      // SAFETY: the old buffer holds `len` initialised elements and the new
      // one has room for `capacity > len`
      unsafe {
        ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
        self.release();
      }
    }
    self.ptr = new_ptr;
    self.capacity = capacity;
    Ok(())
  }

  pub fn try_push(&mut self, value: T) -> Result<(), AllocError> {
    if self.len == self.capacity && mem::size_of::<T>() != 0 {
      let grown = match self.capacity {
        0 => INITIAL_CAPACITY,
        capacity => capacity.checked_mul(2).ok_or(AllocError)?,
      };
      self.try_reserve_exact(grown)?;
    }
    // SAFETY: len < capacity after the reserve above
    unsafe { self.ptr.as_ptr().add(self.len).write(value) };
    self.len += 1;
    Ok(())
  }

  pub fn push(&mut self, value: T) {
    self.try_push(value).expect("Failed to grow PoolVec")
  }

  pub fn pop(&mut self) -> Option<T> {
    if self.len == 0 {
      return None;
    }
    self.len -= 1;
    // SAFETY: the slot at `len` was initialised and is now outside the vector
    Some(unsafe { self.ptr.as_ptr().add(self.len).read() })
  }

  /// # Safety
  /// The elements must already be dropped or moved out.
  unsafe fn release(&mut self) {
    if self.capacity == 0 || mem::size_of::<T>() == 0 {
      return;
    }
    // SAFETY: the buffer was allocated with this layout
    unsafe {
      let layout = Layout::array::<T>(self.capacity).unwrap_unchecked();
      self.allocator.deallocate(self.ptr.cast(), layout);
    }
  }
}

impl<T, A: Allocator> Deref for PoolVec<T, A> {
  type Target = [T];

  fn deref(&self) -> &[T] {
    // SAFETY: the first `len` slots are initialised
    unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
  }
}

impl<T, A: Allocator> DerefMut for PoolVec<T, A> {
  fn deref_mut(&mut self) -> &mut [T] {
    // SAFETY: the first `len` slots are initialised
    unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
  }
}

impl<T: Clone, A: Allocator + Clone> Clone for PoolVec<T, A> {
  fn clone(&self) -> Self {
    let mut vec = Self::new_in(self.allocator.clone());
    vec
      .try_reserve_exact(self.len)
      .expect("Failed to allocate PoolVec");
    for value in self.iter() {
      vec.push(value.clone());
    }
    vec
  }
}

impl<T: fmt::Debug, A: Allocator> fmt::Debug for PoolVec<T, A> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.iter()).finish()
  }
}

impl<'vec, T, A: Allocator> IntoIterator for &'vec PoolVec<T, A> {
  type Item = &'vec T;
  type IntoIter = slice::Iter<'vec, T>;

  fn into_iter(self) -> Self::IntoIter {
    self.iter()
  }
}

impl<T, A: Allocator> Drop for PoolVec<T, A> {
  fn drop(&mut self) {
    // SAFETY: the first `len` slots are initialised and dropped exactly once
    unsafe {
      ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
      self.release();
    }
  }
}
