//! High-level Channel API for shmlink
//!
//! A [`Channel`] maps one segment and exchanges frames through it. Any
//! process may write and any process may read; nothing serializes them.
//! A read that races a write sees [`Frame::NoData`] or a decode error,
//! never out-of-bounds memory.

use crate::config::ChannelConfig;
use crate::error::{Result, ShmLinkError};
use crate::frame::{self, Frame, HEADER_LEN};
use crate::segment::Segment;
use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared memory channel bound to one key
pub struct Channel {
    segment: Segment,
    config: ChannelConfig,
}

impl Channel {
    /// Create or attach to the segment for `config.key` and map it
    pub fn open(config: ChannelConfig) -> Result<Self> {
        config.validate()?;

        let mut segment = Segment::acquire_with_mode(config.key, config.size, config.mode)?;
        segment.map()?;

        tracing::info!(
            key = config.key,
            capacity = segment.size(),
            created = segment.created(),
            "shared memory channel open"
        );

        Ok(Self { segment, config })
    }

    /// Encode `payload` and write it as the current frame
    pub fn write<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let frame = frame::encode(payload)?;
        self.write_raw(&frame)
    }

    /// Write an already-encoded frame
    ///
    /// The whole segment is zeroed first so a shorter frame never inherits
    /// trailing bytes from a longer one.
    pub fn write_raw(&self, frame: &[u8]) -> Result<()> {
        let capacity = self.capacity();
        if frame.len() > capacity {
            return Err(ShmLinkError::FrameTooLarge {
                max: capacity,
                got: frame.len(),
            });
        }

        self.segment.fill(0, capacity, 0)?;
        self.segment.write_at(0, frame)?;

        tracing::trace!(key = self.key(), len = frame.len(), "wrote frame");
        Ok(())
    }

    /// Read the current frame
    pub fn read<T: DeserializeOwned>(&self) -> Result<Frame<T>> {
        let capacity = self.capacity();
        if capacity < HEADER_LEN {
            return Ok(Frame::NoData);
        }

        let mut header = [0u8; HEADER_LEN];
        self.segment.read_at(0, &mut header)?;

        let Some(len) = frame::declared_len(&header, capacity) else {
            return Ok(Frame::NoData);
        };

        let mut payload = vec![0u8; len];
        self.segment.read_at(HEADER_LEN, &mut payload)?;
        frame::decode_payload(&payload).map(Frame::Message)
    }

    /// Zero the segment so readers see no data
    pub fn clear(&self) -> Result<()> {
        self.segment.fill(0, self.capacity(), 0)
    }

    /// Read repeatedly, once per `interval`, forever
    ///
    /// The first read happens immediately. Calling `poll` again starts a
    /// fresh sequence.
    pub fn poll<T: DeserializeOwned>(&self, interval: Duration) -> Poll<'_, T> {
        Poll {
            channel: self,
            interval,
            stop: None,
            started: false,
            _marker: PhantomData,
        }
    }

    /// Like [`Channel::poll`], ending once `stop` is set
    pub fn poll_until<T: DeserializeOwned>(
        &self,
        interval: Duration,
        stop: Arc<AtomicBool>,
    ) -> Poll<'_, T> {
        Poll {
            stop: Some(stop),
            ..self.poll(interval)
        }
    }

    /// Unmap the segment, removing it if the config asks for it
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.segment.is_attached() {
            tracing::info!(key = self.key(), remove = self.config.remove_on_close, "closing shared memory channel");
        }
        self.segment.release(self.config.remove_on_close);
    }

    #[inline]
    pub fn key(&self) -> i32 {
        self.segment.key()
    }

    /// Usable bytes, which is the size of the segment actually attached
    #[inline]
    pub fn capacity(&self) -> usize {
        self.segment.size()
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lazy, infinite sequence of reads produced by [`Channel::poll`]
pub struct Poll<'a, T> {
    channel: &'a Channel,
    interval: Duration,
    stop: Option<Arc<AtomicBool>>,
    started: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Poll<'_, T> {
    fn stopped(&self) -> bool {
        self.stop
            .as_ref()
            .is_some_and(|stop| stop.load(Ordering::SeqCst))
    }
}

impl<T: DeserializeOwned> Iterator for Poll<'_, T> {
    type Item = Result<Frame<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped() {
            return None;
        }
        if self.started {
            std::thread::sleep(self.interval);
            if self.stopped() {
                return None;
            }
        }
        self.started = true;
        Some(self.channel.read())
    }
}
