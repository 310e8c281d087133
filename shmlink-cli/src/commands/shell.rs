use anyhow::Context;
use console::style;
use inquire::{InquireError, Text};
use serde_json::{json, Value};
use shmlink::{Channel, ChannelConfig, Frame};

use crate::error::CliResult;

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Read,
    Write(String),
    Clear,
    Help,
    Quit,
}

fn parse_command(input: &str) -> Option<ShellCommand> {
    let input = input.trim();
    let (cmd, arg) = match input.split_once(' ') {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (input, ""),
    };

    match cmd {
        "read" => Some(ShellCommand::Read),
        "write" if !arg.is_empty() => Some(ShellCommand::Write(arg.to_string())),
        "clear" => Some(ShellCommand::Clear),
        "help" => Some(ShellCommand::Help),
        "quit" | "exit" => Some(ShellCommand::Quit),
        _ => None,
    }
}

fn print_help() {
    println!("Commands:");
    println!("  read             - Read from shared memory");
    println!("  write <message>  - Write {{\"message\": <message>}} to shared memory");
    println!("  clear            - Zero the segment");
    println!("  quit             - Exit the program");
}

pub fn execute(config: ChannelConfig) -> CliResult<()> {
    let key = config.key;
    let channel =
        Channel::open(config).with_context(|| format!("failed to open channel on key {key}"))?;

    println!(
        "{}",
        style(format!("Shared memory shell on key {key}. Ctrl+C to exit.")).cyan()
    );
    print_help();

    loop {
        let line = match Text::new(">").prompt() {
            Ok(line) => line,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e).context("failed to read input"),
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_command(&line) {
            Some(ShellCommand::Read) => match channel.read::<Value>() {
                Ok(Frame::Message(value)) => println!("Read from shared memory: {value}"),
                Ok(Frame::NoData) => println!("Read from shared memory: {}", style("no data").dim()),
                Err(e) => println!("{} {e}", style("Error:").red()),
            },
            Some(ShellCommand::Write(message)) => {
                match channel.write(&json!({ "message": message })) {
                    Ok(()) => println!("{}", style("Write successful").green()),
                    Err(e) => println!("{} {e}", style("Error:").red()),
                }
            }
            Some(ShellCommand::Clear) => channel.clear()?,
            Some(ShellCommand::Help) => print_help(),
            Some(ShellCommand::Quit) => break,
            None => println!("Unknown command"),
        }
    }

    println!("{}", style("Stopping...").yellow());
    channel.close();
    Ok(())
}
