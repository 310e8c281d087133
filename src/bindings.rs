//! C Bindings for shmlink
//!
//! Lets processes written in other languages share a channel by key.
//! Payloads cross the boundary as NUL-terminated JSON text.

use crate::channel::Channel;
use crate::config::ChannelConfig;
use crate::error::ShmLinkError;
use crate::frame::Frame;
use serde_json::Value;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::slice;

/// Returned by [`shmlink_channel_read`] when the frame is not valid
pub const SHMLINK_DECODE_ERROR: isize = -1;

/// Returned by [`shmlink_channel_read`] when `buf` cannot hold the payload
pub const SHMLINK_BUFFER_TOO_SMALL: isize = -2;

/// Returned for a null handle or argument
pub const SHMLINK_INVALID_ARGUMENT: isize = -3;

/// Returned when the segment itself could not be accessed
pub const SHMLINK_SEGMENT_ERROR: isize = -4;

// Opaque handle
pub struct ShmLinkChannelHandle(Channel);

/// Open a channel on `key`, creating the segment if needed
///
/// Returns null on failure.
#[no_mangle]
pub extern "C" fn shmlink_channel_open(
    key: i32,
    size: usize,
    remove_on_close: bool,
) -> *mut ShmLinkChannelHandle {
    let config = ChannelConfig {
        key,
        size,
        remove_on_close,
        ..ChannelConfig::default()
    };

    match Channel::open(config) {
        Ok(channel) => Box::into_raw(Box::new(ShmLinkChannelHandle(channel))),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to open channel over C ABI");
            ptr::null_mut()
        }
    }
}

/// Close a channel handle
///
/// # Safety
/// `handle` must come from [`shmlink_channel_open`] and not be used afterwards
#[no_mangle]
pub unsafe extern "C" fn shmlink_channel_close(handle: *mut ShmLinkChannelHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Write a JSON document as the current frame
///
/// Returns 0 on success, [`SHMLINK_BUFFER_TOO_SMALL`] if the frame does not
/// fit the segment, or another negative code.
///
/// # Safety
/// `handle` must be live and `json` must be a valid null-terminated string
#[no_mangle]
pub unsafe extern "C" fn shmlink_channel_write(
    handle: *mut ShmLinkChannelHandle,
    json: *const c_char,
) -> isize {
    if handle.is_null() || json.is_null() {
        return SHMLINK_INVALID_ARGUMENT;
    }
    let channel = &(*handle).0;

    let Ok(text) = CStr::from_ptr(json).to_str() else {
        return SHMLINK_DECODE_ERROR;
    };
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return SHMLINK_DECODE_ERROR;
    };

    match channel.write(&value) {
        Ok(()) => 0,
        Err(ShmLinkError::FrameTooLarge { .. }) => SHMLINK_BUFFER_TOO_SMALL,
        Err(e) => {
            tracing::warn!(error = %e, "write over C ABI failed");
            SHMLINK_SEGMENT_ERROR
        }
    }
}

/// Read the current frame as JSON text into `buf`
///
/// Returns the number of bytes written (not NUL-terminated), 0 if there is
/// no data, or a negative code.
///
/// # Safety
/// `handle` must be live and `buf` must be valid for `max_len` bytes
#[no_mangle]
pub unsafe extern "C" fn shmlink_channel_read(
    handle: *mut ShmLinkChannelHandle,
    buf: *mut u8,
    max_len: usize,
) -> isize {
    if handle.is_null() || buf.is_null() {
        return SHMLINK_INVALID_ARGUMENT;
    }
    let channel = &(*handle).0;

    let value = match channel.read::<Value>() {
        Ok(Frame::Message(value)) => value,
        Ok(Frame::NoData) => return 0,
        Err(_) => return SHMLINK_DECODE_ERROR,
    };

    let Ok(text) = serde_json::to_vec(&value) else {
        return SHMLINK_DECODE_ERROR;
    };
    if text.len() > max_len {
        return SHMLINK_BUFFER_TOO_SMALL;
    }

    let out = slice::from_raw_parts_mut(buf, max_len);
    out[..text.len()].copy_from_slice(&text);
    text.len() as isize
}

/// Usable size of the channel's segment
///
/// # Safety
/// `handle` must be live
#[no_mangle]
pub unsafe extern "C" fn shmlink_channel_capacity(handle: *mut ShmLinkChannelHandle) -> usize {
    if handle.is_null() {
        return 0;
    }
    (*handle).0.capacity()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::fresh_key;
    use std::ffi::CString;

    #[test]
    fn test_write_read_over_c_abi() {
        let key = fresh_key();
        let writer = shmlink_channel_open(key, 512, true);
        let reader = shmlink_channel_open(key, 512, false);
        assert!(!writer.is_null() && !reader.is_null());

        let mut buf = [0u8; 128];
        unsafe {
            assert_eq!(shmlink_channel_capacity(reader), 512);
            assert_eq!(shmlink_channel_read(reader, buf.as_mut_ptr(), buf.len()), 0);

            let json = CString::new(r#"{"message": "hi"}"#).unwrap();
            assert_eq!(shmlink_channel_write(writer, json.as_ptr()), 0);

            let n = shmlink_channel_read(reader, buf.as_mut_ptr(), buf.len());
            assert!(n > 0);
            let value: Value = serde_json::from_slice(&buf[..n as usize]).unwrap();
            assert_eq!(value, serde_json::json!({"message": "hi"}));

            let mut tiny = [0u8; 4];
            assert_eq!(
                shmlink_channel_read(reader, tiny.as_mut_ptr(), tiny.len()),
                SHMLINK_BUFFER_TOO_SMALL
            );

            shmlink_channel_close(reader);
            shmlink_channel_close(writer);
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        let key = fresh_key();
        let handle = shmlink_channel_open(key, 64, true);
        assert!(!handle.is_null());

        unsafe {
            let not_json = CString::new("{oops").unwrap();
            assert_eq!(shmlink_channel_write(handle, not_json.as_ptr()), SHMLINK_DECODE_ERROR);
            assert_eq!(shmlink_channel_write(handle, ptr::null()), SHMLINK_INVALID_ARGUMENT);
            assert_eq!(
                shmlink_channel_read(ptr::null_mut(), ptr::null_mut(), 0),
                SHMLINK_INVALID_ARGUMENT
            );
            shmlink_channel_close(handle);
        }

        assert!(shmlink_channel_open(0, 64, true).is_null());
    }
}
