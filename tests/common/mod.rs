#![allow(dead_code)]

use shmlink::{Channel, ChannelConfig, Segment};
use std::sync::atomic::{AtomicI32, Ordering};

static NEXT: AtomicI32 = AtomicI32::new(1);

/// A key unique to this test process, with any stale segment removed
pub fn fresh_key() -> i32 {
    let pid = (std::process::id() & 0xffff) as i32;
    let key = 0x5000_0000 | (pid << 12) | (NEXT.fetch_add(1, Ordering::Relaxed) & 0xfff);

    if let Ok(mut stale) = Segment::acquire(key, 64) {
        stale.release(true);
    }
    key
}

pub fn open(key: i32, size: usize, remove_on_close: bool) -> Channel {
    Channel::open(ChannelConfig {
        key,
        size,
        remove_on_close,
        ..ChannelConfig::default()
    })
    .unwrap()
}
