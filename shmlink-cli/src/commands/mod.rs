pub mod monitor;
pub mod segment;
pub mod shell;
pub mod socket;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

use crate::error::CliResult;

/// Flag set by Ctrl+C so long-running commands can clean up before exiting
pub fn shutdown_flag() -> CliResult<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl+C handler")?;
    Ok(stop)
}
