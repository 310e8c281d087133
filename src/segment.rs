//! Low-level System V shared memory operations
//!
//! A [`Segment`] wraps one kernel segment identified by an integer key.
//! Every process holds its own handle; none of them owns the kernel object,
//! so removal is best-effort and never fails the caller.
//!
//! All access to the mapped bytes goes through bounds-checked methods
//! ([`Segment::read_at`], [`Segment::write_at`], [`Segment::fill`]). The raw
//! base address never leaves this module.

use crate::config::DEFAULT_MODE;
use crate::error::{Result, ShmLinkError};
use rustix::io::Errno;
use std::mem::MaybeUninit;
use std::ptr::{self, NonNull};

/// Lifecycle of a [`Segment`] handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    /// Acquired, not yet mapped into this process
    Unattached,
    /// Mapped and usable
    Attached,
    /// Released. Terminal.
    Detached,
}

#[derive(Debug)]
enum Mapping {
    Unattached,
    Attached(NonNull<u8>),
    Detached,
}

/// Handle to a System V shared memory segment
#[derive(Debug)]
pub struct Segment {
    key: i32,
    id: i32,
    size: usize,
    created: bool,
    mapping: Mapping,
}

// SAFETY: the base address is only dereferenced through the checked accessors
// below, and the segment is process-shared memory rather than thread-local state.
unsafe impl Send for Segment {}

impl Segment {
    /// Create a segment for `key`, or attach to the one that already exists
    ///
    /// # Arguments
    /// * `key` - Key agreed upon by all participating processes
    /// * `size` - Requested size in bytes; ignored if the segment already exists
    ///
    /// # Returns
    /// An unattached handle. Call [`Segment::map`] before accessing memory.
    pub fn acquire(key: i32, size: usize) -> Result<Self> {
        Self::acquire_with_mode(key, size, DEFAULT_MODE)
    }

    /// Same as [`Segment::acquire`] with explicit permission bits for creation
    pub fn acquire_with_mode(key: i32, size: usize, mode: u32) -> Result<Self> {
        let perms = (mode & 0o777) as libc::c_int;

        // Try to create exclusively first, fall back to attach if it exists
        let (id, created) = match shmget(key, size, libc::IPC_CREAT | libc::IPC_EXCL | perms) {
            Ok(id) => (id, true),
            Err(e) if e == Errno::EXIST => {
                let id = shmget(key, 0, 0).map_err(|source| ShmLinkError::Acquire { key, source })?;
                (id, false)
            }
            Err(source) => return Err(ShmLinkError::Acquire { key, source }),
        };

        // The existing segment may not have the size we asked for
        let stat = shm_stat(id).map_err(|source| ShmLinkError::Stat { key, source })?;
        let actual = stat.shm_segsz as usize;

        if !created && actual != size {
            tracing::debug!(key, requested = size, actual, "attached to segment of different size");
        }
        tracing::debug!(key, id, size = actual, created, "acquired shared memory segment");

        Ok(Self {
            key,
            id,
            size: actual,
            created,
            mapping: Mapping::Unattached,
        })
    }

    /// Map the segment into this process's address space
    pub fn map(&mut self) -> Result<()> {
        match self.mapping {
            Mapping::Unattached => {}
            Mapping::Attached(_) => return Err(ShmLinkError::AlreadyMapped { key: self.key }),
            Mapping::Detached => return Err(ShmLinkError::Detached { key: self.key }),
        }

        let addr = unsafe { libc::shmat(self.id, ptr::null(), 0) };
        if addr as isize == -1 {
            return Err(ShmLinkError::Map {
                key: self.key,
                source: last_errno(),
            });
        }

        let addr = NonNull::new(addr.cast::<u8>()).ok_or(ShmLinkError::Map {
            key: self.key,
            source: Errno::FAULT,
        })?;
        self.mapping = Mapping::Attached(addr);

        tracing::debug!(key = self.key, id = self.id, "mapped shared memory segment");
        Ok(())
    }

    /// Unmap the segment and optionally request its destruction
    ///
    /// Removal only marks the segment; the kernel destroys it once the last
    /// holder detaches. Failures are logged, never returned. Releasing twice
    /// is a no-op.
    pub fn release(&mut self, remove: bool) {
        let addr = match std::mem::replace(&mut self.mapping, Mapping::Detached) {
            Mapping::Detached => return,
            Mapping::Attached(addr) => Some(addr),
            Mapping::Unattached => None,
        };

        if let Some(addr) = addr {
            if unsafe { libc::shmdt(addr.as_ptr() as *const libc::c_void) } == -1 {
                tracing::warn!(key = self.key, error = %last_errno(), "failed to detach shared memory segment");
            }
        }

        if remove {
            match self.remove() {
                Ok(()) => tracing::debug!(key = self.key, id = self.id, "shared memory segment marked for removal"),
                Err(ShmLinkError::Remove { source, .. })
                    if source == Errno::INVAL || source == Errno::IDRM =>
                {
                    tracing::debug!(key = self.key, "shared memory segment already removed");
                }
                Err(e) => tracing::warn!(error = %e, "shared memory segment left in place"),
            }
        }

        tracing::debug!(key = self.key, "released shared memory segment");
    }

    fn remove(&self) -> Result<()> {
        let rc = unsafe { libc::shmctl(self.id, libc::IPC_RMID, ptr::null_mut()) };
        if rc == -1 {
            return Err(ShmLinkError::Remove {
                key: self.key,
                source: last_errno(),
            });
        }
        Ok(())
    }

    /// Copy `buf.len()` bytes starting at `offset` out of the segment
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let base = self.base()?;
        self.check_bounds(offset, buf.len())?;
        unsafe {
            ptr::copy_nonoverlapping(base.as_ptr().add(offset), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Copy `data` into the segment starting at `offset`
    pub fn write_at(&self, offset: usize, data: &[u8]) -> Result<()> {
        let base = self.base()?;
        self.check_bounds(offset, data.len())?;
        unsafe {
            ptr::copy_nonoverlapping(data.as_ptr(), base.as_ptr().add(offset), data.len());
        }
        Ok(())
    }

    /// Set `len` bytes starting at `offset` to `byte`
    pub fn fill(&self, offset: usize, len: usize, byte: u8) -> Result<()> {
        let base = self.base()?;
        self.check_bounds(offset, len)?;
        unsafe {
            ptr::write_bytes(base.as_ptr().add(offset), byte, len);
        }
        Ok(())
    }

    /// Copy the whole segment
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size];
        self.read_at(0, &mut buf)?;
        Ok(buf)
    }

    /// Number of processes currently attached, as reported by the kernel
    pub fn attach_count(&self) -> Result<u64> {
        let stat = shm_stat(self.id).map_err(|source| ShmLinkError::Stat {
            key: self.key,
            source,
        })?;
        Ok(stat.shm_nattch as u64)
    }

    #[inline]
    pub fn key(&self) -> i32 {
        self.key
    }

    /// Kernel-assigned segment identifier
    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Actual size of the segment in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether this handle created the segment rather than attaching to it
    #[inline]
    pub fn created(&self) -> bool {
        self.created
    }

    pub fn state(&self) -> SegmentState {
        match self.mapping {
            Mapping::Unattached => SegmentState::Unattached,
            Mapping::Attached(_) => SegmentState::Attached,
            Mapping::Detached => SegmentState::Detached,
        }
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        matches!(self.mapping, Mapping::Attached(_))
    }

    fn base(&self) -> Result<NonNull<u8>> {
        match self.mapping {
            Mapping::Attached(addr) => Ok(addr),
            Mapping::Unattached => Err(ShmLinkError::NotMapped { key: self.key }),
            Mapping::Detached => Err(ShmLinkError::Detached { key: self.key }),
        }
    }

    fn check_bounds(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(ShmLinkError::OutOfBounds {
                offset,
                len,
                capacity: self.size,
            }),
        }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.release(false);
    }
}

fn last_errno() -> Errno {
    let raw = std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EIO);
    Errno::from_raw_os_error(raw)
}

fn shmget(key: i32, size: usize, flags: libc::c_int) -> std::result::Result<i32, Errno> {
    let id = unsafe { libc::shmget(key as libc::key_t, size, flags) };
    if id == -1 {
        Err(last_errno())
    } else {
        Ok(id)
    }
}

fn shm_stat(id: i32) -> std::result::Result<libc::shmid_ds, Errno> {
    let mut ds = MaybeUninit::<libc::shmid_ds>::zeroed();
    let rc = unsafe { libc::shmctl(id, libc::IPC_STAT, ds.as_mut_ptr()) };
    if rc == -1 {
        Err(last_errno())
    } else {
        Ok(unsafe { ds.assume_init() })
    }
}
