use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "shmlink")]
#[command(about = "📡 JSON messaging over shared memory and Unix sockets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, env = "SHMLINK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every shared memory command
#[derive(Args, Clone, Debug, Default)]
pub struct ChannelArgs {
    /// Segment key shared by all processes
    #[arg(short, long, env = "SHMLINK_KEY")]
    pub key: Option<i32>,

    /// Segment size in bytes, used when creating it
    #[arg(short, long, env = "SHMLINK_SIZE")]
    pub size: Option<usize>,

    /// Leave the segment in place on exit
    #[arg(long)]
    pub keep: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll the segment and print every new message until Ctrl+C
    Monitor {
        #[command(flatten)]
        channel: ChannelArgs,

        /// Polling interval in milliseconds
        #[arg(short, long)]
        interval_ms: Option<u64>,
    },

    /// Read the current message once
    Read {
        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Write a message
    Write {
        #[command(flatten)]
        channel: ChannelArgs,

        /// JSON document to write
        #[arg(required_unless_present = "message")]
        json: Option<String>,

        /// Plain text, written as {"message": <text>}
        #[arg(short, long, conflicts_with = "json")]
        message: Option<String>,
    },

    /// Zero the segment
    Clear {
        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Show segment details
    Info {
        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Interactive read/write prompt
    Shell {
        #[command(flatten)]
        channel: ChannelArgs,
    },

    /// Run the socket request/response server
    Serve {
        /// Socket path
        #[arg(long, env = "SHMLINK_SOCKET")]
        socket: Option<PathBuf>,
    },

    /// Send one request to a socket server and print the reply
    Send {
        /// Socket path
        #[arg(long, env = "SHMLINK_SOCKET")]
        socket: Option<PathBuf>,

        /// JSON request, e.g. '{"data": 5}'
        json: String,
    },
}
