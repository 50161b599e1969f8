use super::PoolAllocator;
use crate::width::Width;
use alloc::{
  alloc::{
    Allocator,
    Layout,
  },
  boxed::Box,
  collections::BTreeMap,
  vec::Vec,
};

#[test]
fn basic_allocation() {
  let allocator = PoolAllocator::new(1024);
  assert_eq!(allocator.width(), Width::U16);
  assert_eq!(allocator.overhead(), 2);

  let layout = Layout::new::<u64>();
  let ptr = allocator.allocate(layout).unwrap();
  assert_eq!(ptr.len(), 8);
  assert_eq!(ptr.as_ptr().cast::<u8>() as usize % 8, 0);
  assert!(allocator.free_bytes() < 1024);

  unsafe {
    ptr.as_ptr().cast::<u64>().write(0xDEAD_BEEF);
    assert_eq!(ptr.as_ptr().cast::<u64>().read(), 0xDEAD_BEEF);
    allocator.deallocate(ptr.cast(), layout);
  }
  assert_eq!(allocator.free_bytes(), 1024);
  assert_eq!(allocator.first_free(), Some(0));
}

#[test]
fn out_of_memory() {
  let allocator = PoolAllocator::new(16);
  let layout = Layout::from_size_align(32, 1).unwrap();
  assert!(allocator.allocate(layout).is_err());
  assert_eq!(allocator.free_bytes(), 16);
}

#[test]
fn vec_in_pool() {
  let allocator = PoolAllocator::new(4096);
  {
    let mut values = Vec::new_in(&allocator);
    for i in 0..100u64 {
      values.push(i * i);
    }
    assert_eq!(values[99], 99 * 99);
    assert!(allocator.free_bytes() < 4096 - 800);
  }
  assert_eq!(allocator.free_bytes(), 4096);
}

#[test]
fn btree_map_in_pool() {
  let allocator = PoolAllocator::new(8192);
  {
    let mut map = BTreeMap::new_in(&allocator);
    let mut factorial = 1u64;
    for i in 0..10u64 {
      map.insert(i, factorial);
      factorial *= i + 1;
    }
    assert_eq!(map.get(&9), Some(&362_880));
    assert_eq!(map.keys().copied().collect::<Vec<_>>(), (0..10).collect::<Vec<_>>());
  }
  assert_eq!(allocator.free_bytes(), 8192);
}

#[test]
fn sized_for_elements() {
  let allocator = PoolAllocator::for_elements::<u32>(10);
  let boxes: Vec<Box<u32, &PoolAllocator>> = (0..10).map(|i| Box::new_in(i, &allocator)).collect();
  assert_eq!(boxes.iter().map(|b| **b).sum::<u32>(), 45);
  drop(boxes);
  assert_eq!(allocator.free_bytes(), allocator.capacity());
}

#[test]
fn equality_requires_shared_pool() {
  let a = PoolAllocator::new(256);
  let b = PoolAllocator::new(256);
  assert_eq!(a, a);
  assert_ne!(a, b);

  let layout = Layout::new::<u32>();
  let ptr = a.allocate(layout).unwrap();
  let copy = a.duplicate().unwrap();
  assert_ne!(a, copy);
  assert_eq!(copy.free_bytes(), a.free_bytes());
  assert_eq!(copy.blocks(), a.blocks());

  unsafe { a.deallocate(ptr.cast(), layout) };
  assert_eq!(a.free_bytes(), 256);
  assert!(copy.free_bytes() < 256);
}

#[test]
#[should_panic(expected = "does not name an occupied block")]
fn foreign_pointer_panics() {
  let allocator = PoolAllocator::new(64);
  let mut local = 0u8;
  unsafe { allocator.deallocate(core::ptr::NonNull::from(&mut local), Layout::new::<u8>()) };
}

#[test]
fn dump_through_adapter() {
  let allocator = PoolAllocator::new(100);
  let _ptr = allocator.allocate(Layout::from_size_align(10, 1).unwrap()).unwrap();
  assert_eq!(
    allocator.dump(100),
    "count: 89, first free: 11\n     0: 10 occupied\n    11: 89 free -> end\n"
  );
  assert_eq!(allocator.into_inner().free_bytes(), 89);
}
