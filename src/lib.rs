//! Fixed-capacity memory pools with explicit free-list management.
//!
//! A [`RawPool`](pool::RawPool) owns one buffer and hands out byte ranges
//! from an address-ordered free list, splitting blocks on allocation and
//! coalescing neighbours on release. Header fields use the narrowest integer
//! able to address the pool (see [`width`]). [`PoolAllocator`] exposes a
//! pool through the [`Allocator`](alloc::alloc::Allocator) trait so that
//! standard containers and [`PoolVec`] can live inside it.
//!
//! Pools are single-threaded and never grow.

#![feature(allocator_api)]
#![cfg_attr(test, feature(btreemap_alloc))]

extern crate alloc;

pub mod allocator;
pub mod error;
pub mod pool;
pub mod vector;
pub mod width;

pub use allocator::PoolAllocator;
pub use error::PoolError;
pub use pool::{
  DynPool,
  RawPool,
};
pub use vector::PoolVec;
