use std::path::PathBuf;

use shmlink::{ChannelConfig, FileConfig, ServerConfig};

use crate::cli::ChannelArgs;

/// How long the process keeps the segment
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lifetime {
    /// One read or write, then exit. The segment always outlives us.
    OneShot,
    /// Runs until interrupted and cleans up per config.
    Session,
}

/// Merge file config with command-line flags; flags win
pub fn merge_channel(file: &FileConfig, args: &ChannelArgs, lifetime: Lifetime) -> ChannelConfig {
    let mut config = file.channel.clone();
    if let Some(key) = args.key {
        config.key = key;
    }
    if let Some(size) = args.size {
        config.size = size;
    }
    if args.keep || lifetime == Lifetime::OneShot {
        config.remove_on_close = false;
    }
    config
}

pub fn merge_server(file: &FileConfig, socket: Option<PathBuf>) -> ServerConfig {
    let mut config = file.server.clone();
    if let Some(socket) = socket {
        config.socket_path = socket;
    }
    config
}
