use std::sync::atomic::Ordering;

use anyhow::Context;
use console::style;
use serde_json::Value;
use shmlink::{server, ServerConfig, SocketServer};

use super::shutdown_flag;
use crate::error::CliResult;

pub fn serve(config: ServerConfig) -> CliResult<()> {
    let stop = shutdown_flag()?;
    let path = config.socket_path.clone();
    let server = SocketServer::bind(config)
        .with_context(|| format!("failed to bind {}", path.display()))?;

    println!(
        "{}",
        style(format!("Server listening on {}. Press Ctrl+C to stop.", path.display())).cyan()
    );
    server.serve(&stop)?;

    if stop.load(Ordering::SeqCst) {
        println!("{}", style("Stopping...").yellow());
    }
    Ok(())
}

pub fn send(config: ServerConfig, json: &str) -> CliResult<()> {
    let request: Value = serde_json::from_str(json).context("request is not valid JSON")?;
    let path = &config.socket_path;
    let response: Value = server::request(path, &request)
        .with_context(|| format!("request to {} failed", path.display()))?;
    println!("{response}");
    Ok(())
}
