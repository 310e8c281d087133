//! Example Producer (Writer)
//!
//! Writes {"data": n} to the segment once a second. Run `monitor` in
//! another terminal with the same key to watch the values arrive.

use serde_json::json;
use shmlink::{Channel, ChannelConfig};
use std::time::Duration;

fn main() {
    let key = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(12345);

    println!("[Producer] Opening channel on key {}", key);

    let config = ChannelConfig {
        key,
        size: 1024,
        // Leave the segment for the monitor when we exit
        remove_on_close: false,
        ..ChannelConfig::default()
    };

    let channel = match Channel::open(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[Producer] Failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    println!("[Producer] Segment has {} bytes", channel.capacity());

    for n in 0..60u64 {
        let payload = json!({ "data": n, "pid": std::process::id() });
        match channel.write(&payload) {
            Ok(()) => println!("[Producer] Wrote {}", payload),
            Err(e) => eprintln!("[Producer] Write failed: {}", e),
        }
        std::thread::sleep(Duration::from_secs(1));
    }

    channel.close();
    println!("[Producer] Done");
}
