use core::fmt;

use super::RawPool;
use crate::width::Offset;

/// Diagnostic listing of a pool's blocks, see [`RawPool::dump`].
pub struct PoolDump<'pool, O: Offset> {
  pool: &'pool RawPool<O>,
  limit: usize,
}

impl<O: Offset> RawPool<O> {
  /// Lists the blocks whose header starts below `limit`.
  pub fn dump(&self, limit: usize) -> PoolDump<'_, O> {
    PoolDump { pool: self, limit }
  }
}

impl<O: Offset> fmt::Display for PoolDump<'_, O> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "count: {}, first free: ", self.pool.free_bytes())?;
    match self.pool.first_free() {
      Some(head) => writeln!(f, "{head}")?,
      None => writeln!(f, "none")?,
    }

    for block in self.pool.blocks().take_while(|block| block.offset() < self.limit) {
      write!(f, "{:>6}: {}", block.offset(), block.size())?;
      if block.is_free() {
        match self.pool.next_at(block.offset()) {
          Some(next) => writeln!(f, " free -> {next}")?,
          None => writeln!(f, " free -> end")?,
        }
      } else {
        writeln!(f, " occupied")?;
      }
    }
    Ok(())
  }
}
