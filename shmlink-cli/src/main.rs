//! shmlink CLI - shared memory and socket tools
//!
//!   - cli.rs: argument definitions
//!   - config.rs: file config + flag merging
//!   - commands/: one module per command family

mod cli;
mod commands;
mod config;
mod error;

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use shmlink::FileConfig;

use cli::{Cli, Commands};
use config::{merge_channel, merge_server, Lifetime};
use error::{to_exit_code, CliResult};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "shmlink=debug"
    } else {
        "shmlink=warn,shmlink::commands=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    to_exit_code(run(cli))
}

fn run(cli: Cli) -> CliResult<()> {
    let file = FileConfig::load(cli.config.as_deref()).context("failed to load config file")?;

    match cli.command {
        Commands::Monitor { channel, interval_ms } => {
            let mut config = merge_channel(&file, &channel, Lifetime::Session);
            if let Some(ms) = interval_ms {
                config.poll_interval_ms = ms;
            }
            commands::monitor::execute(config)
        }
        Commands::Read { channel } => {
            commands::segment::read(merge_channel(&file, &channel, Lifetime::OneShot))
        }
        Commands::Write { channel, json, message } => {
            let config = merge_channel(&file, &channel, Lifetime::OneShot);
            commands::segment::write(config, json.as_deref(), message.as_deref())
        }
        Commands::Clear { channel } => {
            commands::segment::clear(merge_channel(&file, &channel, Lifetime::OneShot))
        }
        Commands::Info { channel } => {
            commands::segment::info(merge_channel(&file, &channel, Lifetime::OneShot))
        }
        Commands::Shell { channel } => {
            commands::shell::execute(merge_channel(&file, &channel, Lifetime::Session))
        }
        Commands::Serve { socket } => commands::socket::serve(merge_server(&file, socket)),
        Commands::Send { socket, json } => commands::socket::send(merge_server(&file, socket), &json),
    }
}
