use anyhow::Context;
use console::style;
use serde_json::Value;
use shmlink::{Channel, ChannelConfig, Frame};

use super::shutdown_flag;
use crate::error::CliResult;

/// Poll the segment and print each message that differs from the last one
pub fn execute(config: ChannelConfig) -> CliResult<()> {
    let stop = shutdown_flag()?;
    let channel = Channel::open(config.clone())
        .with_context(|| format!("failed to open channel on key {}", config.key))?;

    println!(
        "{}",
        style(format!(
            "Monitoring key {} ({} bytes, every {} ms). Press Ctrl+C to stop.",
            channel.key(),
            channel.capacity(),
            config.poll_interval_ms
        ))
        .cyan()
    );

    let mut last: Option<Value> = None;
    for result in channel.poll_until::<Value>(config.poll_interval(), stop) {
        match result {
            Ok(Frame::Message(value)) => {
                if last.as_ref() != Some(&value) {
                    println!("Read from shared memory: {value}");
                    last = Some(value);
                }
            }
            Ok(Frame::NoData) => {}
            Err(e) if e.is_decode() => tracing::debug!(error = %e, "skipping unreadable frame"),
            Err(e) => return Err(e).context("polling failed"),
        }
    }

    println!("{}", style("Stopping...").yellow());
    channel.close();
    Ok(())
}
