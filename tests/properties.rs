//! Property tests for pool bookkeeping under random allocate/free sequences.

use std::ptr::NonNull;

use proptest::prelude::*;
use rawpool::{
  PoolError,
  RawPool,
  pool::BlockState,
  width::Offset,
};

const CAPACITY: usize = 2048;

#[derive(Debug, Clone)]
enum Op {
  Alloc { size: usize, align: usize },
  Free(usize),
  Probe(usize),
}

fn op() -> impl Strategy<Value = Op> {
  prop_oneof![
    4 => (0usize..300, prop_oneof![Just(1usize), Just(2), Just(4), Just(8), Just(16)])
      .prop_map(|(size, align)| Op::Alloc { size, align }),
    3 => any::<prop::sample::Index>().prop_map(|idx| Op::Free(idx.index(usize::MAX))),
    1 => (0usize..CAPACITY).prop_map(Op::Probe),
  ]
}

struct Live {
  ptr: NonNull<u8>,
  size: usize,
}

fn layout<O: Offset>(pool: &RawPool<O>) -> Vec<(usize, usize, BlockState)> {
  pool
    .blocks()
    .map(|block| (block.offset(), block.size(), block.state()))
    .collect()
}

fn check_invariants<O: Offset>(pool: &RawPool<O>, live: &[Live]) {
  let header = RawPool::<O>::OVERHEAD;
  let base = pool.base().as_ptr() as usize;
  let blocks: Vec<_> = pool.blocks().collect();

  // blocks tile the pool
  let mut end = 0;
  for block in &blocks {
    assert_eq!(block.offset(), end);
    end = block.offset() + header + block.size();
  }
  assert_eq!(end, CAPACITY + header);

  // free counter matches the free list, and no two free blocks touch
  let free: usize = blocks.iter().filter(|b| b.is_free()).map(|b| b.size()).sum();
  assert_eq!(free, pool.free_bytes());
  for pair in blocks.windows(2) {
    assert!(!(pair[0].is_free() && pair[1].is_free()), "adjacent free blocks left unmerged");
  }

  // capacity is conserved
  let occupied: usize = blocks.iter().filter(|b| !b.is_free()).map(|b| b.size()).sum();
  assert_eq!(occupied + free + header * (blocks.len() - 1), CAPACITY);

  // every live allocation sits in its own occupied block
  assert_eq!(blocks.iter().filter(|b| !b.is_free()).count(), live.len());
  for item in live {
    let offset = item.ptr.as_ptr() as usize - base - header;
    let block = blocks
      .iter()
      .find(|b| b.offset() == offset)
      .expect("live pointer is not a block boundary");
    assert_eq!(block.state(), BlockState::Occupied);
    assert!(block.size() >= item.size);
  }
}

fn run_ops<O: Offset>(ops: Vec<Op>) -> Result<(), TestCaseError> {
  let mut pool = RawPool::<O>::new(CAPACITY).unwrap();
  let mut live: Vec<Live> = Vec::new();

  for op in ops {
    match op {
      Op::Alloc { size, align } => match pool.allocate_aligned(size, align) {
        Ok(ptr) => {
          prop_assert_eq!(ptr.as_ptr() as usize % align, 0);
          live.push(Live { ptr, size });
        }
        Err(err) => prop_assert_eq!(err, PoolError::OutOfMemory { requested: size }),
      },
      Op::Free(idx) if !live.is_empty() => {
        let item = live.swap_remove(idx % live.len());
        pool.deallocate(item.ptr).unwrap();
      }
      Op::Free(_) => {}
      Op::Probe(size) => {
        let before = layout(&pool);
        let had_space = pool.has_space(size);
        if let Ok(ptr) = pool.allocate(size) {
          prop_assert!(had_space);
          pool.deallocate(ptr).unwrap();
        }
        prop_assert_eq!(layout(&pool), before);
        for smaller in [0, size / 2, size] {
          prop_assert_eq!(pool.has_space(smaller), pool.free_bytes() >= smaller + RawPool::<O>::OVERHEAD);
        }
      }
    }
    check_invariants(&pool, &live);
  }

  for item in live.drain(..) {
    pool.deallocate(item.ptr).unwrap();
  }
  prop_assert_eq!(layout(&pool), vec![(0, CAPACITY, BlockState::Free)]);
  prop_assert_eq!(pool.free_bytes(), CAPACITY);
  Ok(())
}

fn foreign_pointer_is_rejected<O: Offset>(offset: usize, size: usize) -> Result<(), TestCaseError> {
  let mut pool = RawPool::<O>::new(CAPACITY).unwrap();
  let ptr = pool.allocate(size).unwrap();
  let before = layout(&pool);

  let candidate = pool.base().as_ptr().wrapping_add(offset);
  if candidate != ptr.as_ptr() {
    let candidate = NonNull::new(candidate).unwrap();
    let is_invalid = matches!(pool.deallocate(candidate), Err(PoolError::InvalidPointer { .. }));
    prop_assert!(is_invalid);
    prop_assert_eq!(layout(&pool), before);
  }
  Ok(())
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(200))]

  #[test]
  fn bookkeeping_survives_random_ops(ops in proptest::collection::vec(op(), 1..80)) {
    run_ops::<u16>(ops)?;
  }

  #[test]
  fn wide_header_bookkeeping_survives_random_ops(ops in proptest::collection::vec(op(), 1..80)) {
    run_ops::<u64>(ops)?;
  }

  #[test]
  fn foreign_pointers_never_mutate(offset in 0usize..CAPACITY + 64, size in 1usize..100) {
    foreign_pointer_is_rejected::<u16>(offset, size)?;
    foreign_pointer_is_rejected::<u32>(offset, size)?;
  }
}
