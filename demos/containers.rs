//! Fills an ordered map and a `PoolVec` with factorials, once with the global
//! allocator and once inside a fixed pool, and prints them.
//!
//! Run with `RUST_LOG=rawpool=trace` to watch the pool split and merge blocks.

#![feature(allocator_api, btreemap_alloc)]

use std::collections::BTreeMap;

use rawpool::{
  PoolAllocator,
  PoolVec,
};
use tracing_subscriber::EnvFilter;

const MAX_SIZE: usize = 10;
const MAP_POOL_BYTES: usize = 1024;

fn factorials() -> impl Iterator<Item = (usize, u64)> {
  (0..MAX_SIZE).scan(1u64, |factorial, i| {
    let value = *factorial;
    *factorial *= i as u64 + 1;
    Some((i, value))
  })
}

fn fill_vec<A: std::alloc::Allocator>(vec: &mut PoolVec<u64, A>) {
  for (i, value) in factorials() {
    vec[i] = value;
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  println!("\nBTreeMap<usize, u64>");
  let mut m0 = BTreeMap::new();
  m0.extend(factorials());
  for (key, value) in &m0 {
    println!("{key} {value}");
  }

  println!("\nBTreeMap<usize, u64, &PoolAllocator>");
  let map_pool = PoolAllocator::new(MAP_POOL_BYTES);
  {
    let mut m1 = BTreeMap::new_in(&map_pool);
    m1.extend(factorials());
    for (key, value) in &m1 {
      println!("{key} {value}");
    }
    println!("pool: {} of {} bytes free", map_pool.free_bytes(), map_pool.capacity());
  }

  println!("\nPoolVec<u64>");
  let mut v0 = PoolVec::filled(MAX_SIZE, 0u64);
  fill_vec(&mut v0);
  for value in &v0 {
    println!("{value}");
  }

  println!("\nPoolVec<u64, &PoolAllocator>");
  let vec_pool = PoolAllocator::for_elements::<u64>(MAX_SIZE);
  let mut v1 = PoolVec::filled_in(MAX_SIZE, 0u64, &vec_pool);
  fill_vec(&mut v1);
  for value in &v1 {
    println!("{value}");
  }
  print!("{}", vec_pool.dump(vec_pool.capacity()));
}
