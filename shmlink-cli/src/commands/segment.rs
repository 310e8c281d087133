use anyhow::{bail, Context};
use console::style;
use serde_json::{json, Value};
use shmlink::{Channel, ChannelConfig, Frame};

use crate::error::CliResult;

fn open(config: ChannelConfig) -> CliResult<Channel> {
    let key = config.key;
    Channel::open(config).with_context(|| format!("failed to open channel on key {key}"))
}

/// Build the payload for `write`: either a JSON document or a plain message
pub fn payload(json: Option<&str>, message: Option<&str>) -> CliResult<Value> {
    match (json, message) {
        (Some(text), None) => serde_json::from_str(text).context("payload is not valid JSON"),
        (None, Some(text)) => Ok(json!({ "message": text })),
        _ => bail!("pass either a JSON document or --message"),
    }
}

pub fn read(config: ChannelConfig) -> CliResult<()> {
    let channel = open(config)?;
    match channel.read::<Value>() {
        Ok(Frame::Message(value)) => println!("{value}"),
        Ok(Frame::NoData) => println!("{}", style("no data").dim()),
        Err(e) if e.is_decode() => println!("{} {e}", style("unreadable frame:").yellow()),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

pub fn write(config: ChannelConfig, json: Option<&str>, message: Option<&str>) -> CliResult<()> {
    let value = payload(json, message)?;
    let channel = open(config)?;
    channel.write(&value).context("write failed")?;
    println!("{} {value}", style("✓ wrote").green());
    Ok(())
}

pub fn clear(config: ChannelConfig) -> CliResult<()> {
    let channel = open(config)?;
    channel.clear()?;
    println!("{}", style("✓ cleared").green());
    Ok(())
}

pub fn info(config: ChannelConfig) -> CliResult<()> {
    let requested = config.size;
    let channel = open(config)?;
    let segment = channel.segment();

    println!("   Key:       {}", style(segment.key()).green());
    println!("   Id:        {}", style(segment.id()).green());
    println!("   Size:      {} bytes (requested {requested})", style(segment.size()).green());
    println!("   Attached:  {}", style(segment.attach_count()?).green());
    println!("   Created:   {}", style(segment.created()).green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_from_json() {
        assert_eq!(payload(Some(r#"{"data": 21}"#), None).unwrap(), json!({"data": 21}));
        assert!(payload(Some("{not json"), None).is_err());
    }

    #[test]
    fn test_payload_from_message() {
        assert_eq!(payload(None, Some("hello")).unwrap(), json!({"message": "hello"}));
    }

    #[test]
    fn test_payload_needs_exactly_one_source() {
        assert!(payload(None, None).is_err());
        assert!(payload(Some("1"), Some("x")).is_err());
    }
}
