use crate::segment::Segment;
use std::sync::atomic::{AtomicI32, Ordering};

static NEXT: AtomicI32 = AtomicI32::new(1);

/// A key no other test in this process uses, with any stale segment removed
pub(crate) fn fresh_key() -> i32 {
    let pid = (std::process::id() & 0xffff) as i32;
    let key = 0x4000_0000 | (pid << 12) | (NEXT.fetch_add(1, Ordering::Relaxed) & 0xfff);

    if let Ok(mut stale) = Segment::acquire(key, 64) {
        stale.release(true);
    }
    key
}
