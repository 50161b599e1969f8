//! Address-width selection for pool headers.
//!
//! Every header field inside a pool is stored with the narrowest unsigned
//! integer able to address any offset in that pool, so small pools pay for
//! small headers.

use core::{
  fmt,
  ptr,
};

mod sealed {
  pub trait Sealed {}
}

/// Unsigned integer type used for offsets and sizes inside a pool.
///
/// Implemented for `u8`, `u16`, `u32` and `u64` only.
pub trait Offset: sealed::Sealed + Copy + Ord + fmt::Debug + fmt::Display {
  const KIND: Width;
  /// Number of bytes one header field occupies.
  const WIDTH: usize = Self::KIND.bytes();
  /// Reserved "end of list" marker, never a valid block offset.
  const NONE: Self;
  /// Largest capacity addressable with this width.
  const MAX_CAPACITY: usize;

  fn from_usize(value: usize) -> Self;

  fn to_usize(self) -> usize;

  /// # Safety
  /// `src` must be valid for reads of `Self::WIDTH` bytes.
  unsafe fn read(src: *const u8) -> Self;

  /// # Safety
  /// `dst` must be valid for writes of `Self::WIDTH` bytes.
  unsafe fn write(self, dst: *mut u8);
}

macro_rules! impl_offset {
  ($($ty:ty => $kind:ident),* $(,)?) => {
    $(
      impl sealed::Sealed for $ty {}

      impl Offset for $ty {
        const KIND: Width = Width::$kind;
        const NONE: Self = <$ty>::MAX;
        const MAX_CAPACITY: usize = if (<$ty>::MAX as u128) > (usize::MAX as u128) {
          usize::MAX
        } else {
          <$ty>::MAX as usize
        };

        #[inline]
        fn from_usize(value: usize) -> Self {
          debug_assert!(value as u128 <= <$ty>::MAX as u128);
          value as $ty
        }

        #[inline]
        fn to_usize(self) -> usize {
          self as usize
        }

        #[inline]
        unsafe fn read(src: *const u8) -> Self {
          // SAFETY: caller guarantees `src` is readable for WIDTH bytes
          unsafe { ptr::read_unaligned(src.cast::<$ty>()) }
        }

        #[inline]
        unsafe fn write(self, dst: *mut u8) {
          // SAFETY: caller guarantees `dst` is writable for WIDTH bytes
          unsafe { ptr::write_unaligned(dst.cast::<$ty>(), self) }
        }
      }
    )*
  };
}

impl_offset! {
  u8 => U8,
  u16 => U16,
  u32 => U32,
  u64 => U64,
}

/// Number of header-field bytes needed to address every offset of a pool
/// holding `capacity` bytes: 1, 2, 4 or 8.
pub const fn offset_width(capacity: usize) -> usize {
  let bits = usize::BITS - capacity.leading_zeros();
  let bytes = bits.div_ceil(8) as usize;
  if bytes <= 1 {
    1
  } else {
    bytes.next_power_of_two()
  }
}

/// Per-allocation header cost of a pool holding `capacity` bytes.
pub const fn overhead_for(capacity: usize) -> usize {
  offset_width(capacity)
}

/// Pool capacity needed to hold `count` separate allocations of `size` bytes
/// aligned to `align`, header overhead and worst-case alignment padding
/// included. Returns `None` on overflow.
pub fn pool_capacity_for(count: usize, size: usize, align: usize) -> Option<usize> {
  for width in [1usize, 2, 4, 8] {
    let slack = if align > 1 { align + 2 * width } else { 0 };
    let per_item = size.checked_add(width)?.checked_add(slack)?;
    let capacity = count.checked_mul(per_item)?.max(width);
    if offset_width(capacity) <= width {
      return Some(capacity);
    }
  }
  None
}

/// The four header widths a pool can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Width {
  U8,
  U16,
  U32,
  U64,
}

impl Width {
  pub const fn for_capacity(capacity: usize) -> Self {
    match offset_width(capacity) {
      1 => Width::U8,
      2 => Width::U16,
      4 => Width::U32,
      _ => Width::U64,
    }
  }

  pub const fn bytes(self) -> usize {
    match self {
      Width::U8 => 1,
      Width::U16 => 2,
      Width::U32 => 4,
      Width::U64 => 8,
    }
  }
}

impl fmt::Display for Width {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "u{}", self.bytes() * 8)
  }
}
