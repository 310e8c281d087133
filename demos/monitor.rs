//! Example Monitor (Reader)
//!
//! Attaches to the segment and prints every message until Ctrl+C, then
//! detaches and removes the segment.

use serde_json::Value;
use shmlink::{Channel, ChannelConfig, Frame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() {
    let key = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(12345);

    let channel = match Channel::open(ChannelConfig::with_key(key)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[Monitor] Failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    // Register Ctrl+C handler
    let stop = Arc::new(AtomicBool::new(false));
    let r = stop.clone();
    ctrlc::set_handler(move || {
        r.store(true, Ordering::SeqCst);
    })
    .ok();

    println!("[Monitor] Starting shared memory monitor on key {}...", key);

    let interval = channel.config().poll_interval();
    for result in channel.poll_until::<Value>(interval, stop) {
        match result {
            Ok(Frame::Message(value)) => println!("[Monitor] Read from shared memory: {}", value),
            // No valid data yet
            Ok(Frame::NoData) => {}
            Err(e) if e.is_decode() => {}
            Err(e) => {
                eprintln!("[Monitor] {}", e);
                break;
            }
        }
    }

    println!();
    println!("[Monitor] Stopping...");
    channel.close();
}
