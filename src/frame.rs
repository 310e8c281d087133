//! Length-prefixed frame codec
//!
//! Wire format:
//! ```text
//!   [4 bytes: payload length (u32, native byte order)]
//!   [payload bytes (UTF-8 JSON)]
//! ```
//!
//! Shared memory has no end-of-stream signal, so an idle or zeroed buffer
//! must be told apart from a corrupted one. [`decode`] returns
//! [`Frame::NoData`] for the former and an error only for the latter.

use crate::error::{Result, ShmLinkError};
use serde::{de::DeserializeOwned, Serialize};

/// Size of the length prefix
pub const HEADER_LEN: usize = 4;

/// Outcome of reading a buffer that may or may not hold a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<T> {
    /// A complete, decoded payload
    Message(T),
    /// Nothing valid to read yet
    NoData,
}

impl<T> Frame<T> {
    /// Convert into an `Option`, dropping the distinction from `NoData`
    pub fn into_message(self) -> Option<T> {
        match self {
            Frame::Message(value) => Some(value),
            Frame::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Frame::NoData)
    }
}

/// Encode a payload as a frame
pub fn encode<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(payload).map_err(ShmLinkError::Encode)?;
    let len = u32::try_from(json.len()).map_err(|_| ShmLinkError::FrameTooLarge {
        max: u32::MAX as usize,
        got: json.len(),
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + json.len());
    buf.extend_from_slice(&len.to_ne_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Decode the frame at the start of `buffer`
pub fn decode<T: DeserializeOwned>(buffer: &[u8]) -> Result<Frame<T>> {
    let Some(header) = buffer.first_chunk::<HEADER_LEN>() else {
        return Ok(Frame::NoData);
    };

    match declared_len(header, buffer.len()) {
        Some(len) => decode_payload(&buffer[HEADER_LEN..HEADER_LEN + len]).map(Frame::Message),
        None => Ok(Frame::NoData),
    }
}

/// Validate a length prefix against the capacity of the buffer it heads
///
/// Returns the payload length if `1 <= len <= capacity - HEADER_LEN`.
pub fn declared_len(header: &[u8; HEADER_LEN], capacity: usize) -> Option<usize> {
    let len = u32::from_ne_bytes(*header) as usize;
    let max = capacity.checked_sub(HEADER_LEN)?;
    (len != 0 && len <= max).then_some(len)
}

/// Decode a payload that has already been cut out of its frame
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(bytes).map_err(ShmLinkError::InvalidUtf8)?;
    serde_json::from_str(text).map_err(ShmLinkError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::{json, Value};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Reading {
        sensor: String,
        values: Vec<f64>,
        ok: bool,
    }

    fn frame_with_len(len: u32, payload: &[u8], capacity: usize) -> Vec<u8> {
        let mut buf = vec![0u8; capacity];
        buf[..4].copy_from_slice(&len.to_ne_bytes());
        buf[4..4 + payload.len()].copy_from_slice(payload);
        buf
    }

    #[test]
    fn test_layout() {
        let bytes = encode(&json!({"data": 21})).unwrap();
        let body = br#"{"data":21}"#;
        assert_eq!(bytes.len(), HEADER_LEN + body.len());
        assert_eq!(&bytes[..4], &(body.len() as u32).to_ne_bytes());
        assert_eq!(&bytes[4..], body);
    }

    #[test]
    fn test_roundtrip_values() {
        let values = [
            json!({"data": 21}),
            json!([1, "two", 3.5, null, true]),
            json!("héllo wörld ✓"),
            json!(null),
            json!({"nested": {"list": [], "map": {}}}),
        ];
        for value in values {
            let bytes = encode(&value).unwrap();
            assert_eq!(decode::<Value>(&bytes).unwrap(), Frame::Message(value));
        }
    }

    #[test]
    fn test_roundtrip_typed() {
        let reading = Reading {
            sensor: "imu".to_string(),
            values: vec![0.5, -1.25],
            ok: true,
        };
        let mut buf = encode(&reading).unwrap();
        // Trailing zeroes from the rest of a segment are ignored
        buf.resize(1024, 0);
        assert_eq!(decode::<Reading>(&buf).unwrap(), Frame::Message(reading));
    }

    #[test]
    fn test_zeroed_buffer_is_no_data() {
        let buf = vec![0u8; 1024];
        assert_eq!(decode::<Value>(&buf).unwrap(), Frame::NoData);
    }

    #[test]
    fn test_short_buffer_is_no_data() {
        assert!(decode::<Value>(&[]).unwrap().is_no_data());
        assert!(decode::<Value>(&[1, 0, 0]).unwrap().is_no_data());
        // Header only: any non-zero length overruns
        assert!(decode::<Value>(&1u32.to_ne_bytes()).unwrap().is_no_data());
    }

    #[test]
    fn test_oversized_length_is_no_data() {
        let capacity = 64;
        for len in [61u32, 100, u32::MAX, i32::MAX as u32 + 1] {
            let buf = frame_with_len(len, b"{}", capacity);
            assert!(decode::<Value>(&buf).unwrap().is_no_data(), "len {len}");
        }

        // Exactly filling the buffer is valid
        let body = vec![b' '; 60];
        let mut exact = frame_with_len(60, &body, capacity);
        exact[4] = b'1';
        exact[5] = b'2';
        assert_eq!(decode::<Value>(&exact).unwrap(), Frame::Message(json!(12)));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let buf = frame_with_len(5, b"{\"da", 32);
        let err = decode::<Value>(&buf).unwrap_err();
        assert!(matches!(err, ShmLinkError::Decode(_)));
        assert!(err.is_decode());

        let buf = frame_with_len(2, &[0xc3, 0x28], 32);
        let err = decode::<Value>(&buf).unwrap_err();
        assert!(matches!(err, ShmLinkError::InvalidUtf8(_)));
    }

    #[test]
    fn test_declared_len() {
        assert_eq!(declared_len(&0u32.to_ne_bytes(), 100), None);
        assert_eq!(declared_len(&96u32.to_ne_bytes(), 100), Some(96));
        assert_eq!(declared_len(&97u32.to_ne_bytes(), 100), None);
        assert_eq!(declared_len(&1u32.to_ne_bytes(), 3), None);
    }

    #[test]
    fn test_unserializable_payload_is_encode_error() {
        use std::collections::HashMap;

        // JSON object keys must be strings
        let mut map = HashMap::new();
        map.insert(vec![1u8], 1);
        assert!(matches!(encode(&map), Err(ShmLinkError::Encode(_))));
    }
}
