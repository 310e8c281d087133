//! shmlink - JSON messaging over System V shared memory and Unix sockets
//!
//! Processes that agree on an integer key exchange length-prefixed JSON
//! frames through a shared memory segment, with no handshake and no locks.
//!
//! # Architecture
//!
//! - **Segment**: create-or-attach, map, release of one kernel segment
//! - **Frame**: `[u32 length, native order][UTF-8 JSON]`
//! - **Channel**: frames over a segment, with polling
//! - **Server**: request/response over a Unix domain socket
//!
//! # Example
//!
//! ```no_run
//! use shmlink::{Channel, ChannelConfig, Frame};
//! use serde_json::{json, Value};
//!
//! let channel = Channel::open(ChannelConfig::with_key(12345))?;
//! channel.write(&json!({"data": 21}))?;
//!
//! if let Frame::Message(value) = channel.read::<Value>()? {
//!     println!("{value}");
//! }
//! # Ok::<(), shmlink::ShmLinkError>(())
//! ```
//!
//! Reads of an idle or zeroed segment return [`Frame::NoData`], not an error.

pub mod error;
pub mod config;
pub mod segment;
pub mod frame;
pub mod channel;
pub mod server;
pub mod bindings;

#[cfg(test)]
mod testutil;

pub use error::{ShmLinkError, Result};
pub use config::{ChannelConfig, FileConfig, ServerConfig};
pub use segment::{Segment, SegmentState};
pub use frame::Frame;
pub use channel::{Channel, Poll};
pub use server::{SocketServer, Response};
