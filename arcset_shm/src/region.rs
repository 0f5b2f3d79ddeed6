//! Named shared region: header plus the ring's record slots.
//!
//! ```text
//! offset 0   ┌──────────────────────────────────────────────┐
//!            │ RegionHeader (64 B)                          │
//!            │ magic | layout_hash | capacity | owner_pid   │
//!            │ status | write_cursor | padding              │
//! offset 64  ├──────────────────────────────────────────────┤
//!            │ slots[0] .. slots[N-1]   (Record, 68 B each) │
//!            └──────────────────────────────────────────────┘
//! ```
//!
//! The coordinator creates the region exclusively and is the only process
//! that unlinks it. Workers open and map the existing region and validate
//! the header against their own compiled layout before touching a slot.

use crate::error::{ShmError, ShmResult};
use crate::platform::get_current_pid;
use arcset::arcset::Record;
use memmap2::{MmapMut, MmapOptions};
use nix::fcntl::OFlag;
use nix::sys::mman::{shm_open, shm_unlink};
use nix::sys::stat::Mode;
use nix::unistd::ftruncate;
use static_assertions::const_assert_eq;
use std::cell::UnsafeCell;
use std::fs::File;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

/// Magic bytes identifying an arcset region: `"ARCSET\0\0"`.
pub const ARCSET_MAGIC: [u8; 8] = *b"ARCSET\0\0";

/// Global run status published by the coordinator.
///
/// Only ever moves `Running -> Terminating` within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum RingStatus {
    /// Workers keep producing candidates.
    Running = 0,
    /// Workers must stop.
    Terminating = 1,
}

impl RingStatus {
    /// Decode a raw status word. Anything but `0` means terminating.
    #[inline]
    pub const fn from_raw(value: u32) -> Self {
        match value {
            0 => Self::Running,
            _ => Self::Terminating,
        }
    }
}

/// Region header, 64 bytes and cache-line aligned.
#[repr(C, align(64))]
pub struct RegionHeader {
    /// Must be [`ARCSET_MAGIC`].
    pub magic: [u8; 8],
    /// [`layout_hash`] of the creator's `RegionLayout<N>`.
    pub layout_hash: u32,
    /// Number of record slots (`N`).
    pub capacity: u32,
    /// PID of the coordinator that created the region.
    pub owner_pid: AtomicU32,
    /// Raw [`RingStatus`]. Relaxed accesses only.
    pub status: AtomicU32,
    /// Next slot to fill. Only touched while holding the write mutex.
    pub write_cursor: AtomicU32,
    _padding: [u8; 36],
}

const_assert_eq!(core::mem::size_of::<RegionHeader>(), 64);
const_assert_eq!(core::mem::align_of::<RegionHeader>(), 64);

impl RegionHeader {
    fn new(capacity: u32, layout_hash: u32, owner_pid: u32) -> Self {
        Self {
            magic: ARCSET_MAGIC,
            layout_hash,
            capacity,
            owner_pid: AtomicU32::new(owner_pid),
            status: AtomicU32::new(RingStatus::Running as u32),
            write_cursor: AtomicU32::new(0),
            _padding: [0; 36],
        }
    }

    /// Validate the magic bytes.
    #[inline]
    pub fn is_magic_valid(&self) -> bool {
        self.magic == ARCSET_MAGIC
    }
}

/// Full region layout for a ring of `N` slots.
#[repr(C)]
pub struct RegionLayout<const N: usize> {
    /// Header.
    pub header: RegionHeader,
    slots: [UnsafeCell<Record>; N],
}

impl<const N: usize> RegionLayout<N> {
    /// Copy `record` into the slot under the write cursor and advance the
    /// cursor modulo `N`.
    ///
    /// # Safety
    ///
    /// The caller holds the ring's write mutex and a free-slot permit, so no
    /// other process writes this slot and the consumer is not reading it.
    pub(crate) unsafe fn write_and_advance(&self, record: &Record) -> usize {
        let cursor = self.header.write_cursor.load(Ordering::Relaxed) as usize % N;
        // SAFETY: exclusive access to `slots[cursor]` per the contract above.
        unsafe { self.slots[cursor].get().write(*record) };
        self.header
            .write_cursor
            .store(((cursor + 1) % N) as u32, Ordering::Relaxed);
        cursor
    }

    /// Copy the record out of `slots[index]`.
    ///
    /// # Safety
    ///
    /// The caller holds a used-slot permit for `index`, so the slot has been
    /// filled and no producer writes it until a free-slot permit is released.
    pub(crate) unsafe fn read(&self, index: usize) -> Record {
        // SAFETY: see contract above.
        unsafe { self.slots[index % N].get().read() }
    }
}

/// Size/alignment fingerprint of a layout type.
///
/// Catches a worker built with a different `N` or record definition.
pub const fn layout_hash<T>() -> u32 {
    let size = core::mem::size_of::<T>() as u32;
    let align = core::mem::align_of::<T>() as u32;
    size.wrapping_mul(0x9E3779B9) ^ align.wrapping_mul(0x517CC1B7)
}

/// Handle on the named region mapped into this process.
pub struct SharedRegion<const N: usize> {
    name: String,
    mmap: Option<MmapMut>,
    owned: bool,
}

impl<const N: usize> SharedRegion<N> {
    /// Exact size of the mapping in bytes.
    pub const fn size() -> usize {
        core::mem::size_of::<RegionLayout<N>>()
    }

    /// Owner bootstrap: exclusively create the region, size it, map it and
    /// initialize the header. Slots start zeroed, i.e. as empty records.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if the name is taken; any later failure unlinks the
    /// half-created object before returning.
    pub fn create(name: &str) -> ShmResult<Self> {
        const { assert!(N > 0 && N <= u32::MAX as usize, "ring capacity out of range") };

        let fd = shm_open(
            name,
            OFlag::O_CREAT | OFlag::O_EXCL | OFlag::O_RDWR,
            Mode::S_IRUSR | Mode::S_IWUSR,
        )
        .map_err(|e| ShmError::from_errno(name, e))?;

        // From here on Drop unlinks the name if mapping fails.
        let mut region = Self {
            name: name.to_string(),
            mmap: None,
            owned: true,
        };

        ftruncate(&fd, Self::size() as i64)?;
        let mut mmap = map_file(&File::from(fd), Self::size())?;

        let header = RegionHeader::new(N as u32, layout_hash::<RegionLayout<N>>(), get_current_pid());
        // SAFETY: the mapping is page aligned and at least `size()` bytes long.
        unsafe { mmap.as_mut_ptr().cast::<RegionHeader>().write(header) };

        debug!("Created region {} ({} bytes, {} slots)", name, Self::size(), N);
        region.mmap = Some(mmap);
        Ok(region)
    }

    /// Attacher bootstrap: open and map an existing region, then validate
    /// its header against `RegionLayout<N>`.
    ///
    /// # Errors
    ///
    /// `NotFound` if no coordinator created the region, `LayoutMismatch` if
    /// it was created for a different layout.
    pub fn attach(name: &str) -> ShmResult<Self> {
        const { assert!(N > 0 && N <= u32::MAX as usize, "ring capacity out of range") };

        let fd = shm_open(name, OFlag::O_RDWR, Mode::empty())
            .map_err(|e| ShmError::from_errno(name, e))?;

        let file = File::from(fd);
        let file_size = file.metadata()?.len() as usize;
        if file_size < Self::size() {
            return Err(ShmError::LayoutMismatch {
                name: name.to_string(),
                reason: format!("region is {file_size} bytes, expected {}", Self::size()),
            });
        }

        let mmap = map_file(&file, Self::size())?;
        let region = Self {
            name: name.to_string(),
            mmap: Some(mmap),
            owned: false,
        };
        region.validate_header()?;

        debug!("Attached region {} ({} slots)", name, N);
        Ok(region)
    }

    fn validate_header(&self) -> ShmResult<()> {
        let header = &self.layout()?.header;
        let mismatch = |reason: String| ShmError::LayoutMismatch {
            name: self.name.clone(),
            reason,
        };

        if !header.is_magic_valid() {
            return Err(mismatch("bad magic".to_string()));
        }
        if header.capacity as usize != N {
            return Err(mismatch(format!(
                "capacity {} != compiled capacity {N}",
                header.capacity
            )));
        }
        if header.layout_hash != layout_hash::<RegionLayout<N>>() {
            return Err(mismatch("layout hash differs".to_string()));
        }
        Ok(())
    }

    /// The mapped layout.
    ///
    /// # Errors
    ///
    /// `Detached` after [`unmap`](Self::unmap).
    pub fn layout(&self) -> ShmResult<&RegionLayout<N>> {
        let mmap = self.mmap.as_ref().ok_or(ShmError::Detached)?;
        // SAFETY: the mapping is `size()` bytes, page aligned, and every
        // field mutated by other processes is atomic or an `UnsafeCell`.
        Ok(unsafe { &*mmap.as_ptr().cast::<RegionLayout<N>>() })
    }

    /// Current run status (relaxed read, may lag the coordinator briefly).
    pub fn status(&self) -> ShmResult<RingStatus> {
        let raw = self.layout()?.header.status.load(Ordering::Relaxed);
        Ok(RingStatus::from_raw(raw))
    }

    /// Publish `Terminating`. There is no way back to `Running`.
    pub fn set_terminating(&self) -> ShmResult<()> {
        self.layout()?
            .header
            .status
            .store(RingStatus::Terminating as u32, Ordering::Relaxed);
        Ok(())
    }

    /// Current write cursor.
    pub fn write_cursor(&self) -> ShmResult<usize> {
        Ok(self.layout()?.header.write_cursor.load(Ordering::Relaxed) as usize)
    }

    /// PID of the creating coordinator.
    pub fn owner_pid(&self) -> ShmResult<u32> {
        Ok(self.layout()?.header.owner_pid.load(Ordering::Relaxed))
    }

    /// Region name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `true` if this process created the region.
    pub fn is_owner(&self) -> bool {
        self.owned
    }

    /// `true` until [`unmap`](Self::unmap) has run.
    pub fn is_mapped(&self) -> bool {
        self.mmap.is_some()
    }

    /// Unmap the region. Returns `false` if it was already unmapped.
    pub fn unmap(&mut self) -> bool {
        self.mmap.take().is_some()
    }

    /// Remove the name from the OS namespace if this process created it.
    /// Subsequent calls are no-ops.
    pub fn unlink(&mut self) -> ShmResult<()> {
        if !self.owned {
            return Ok(());
        }
        self.owned = false;
        Self::unlink_name(&self.name)
    }

    /// Remove a region name regardless of who created it.
    pub fn unlink_name(name: &str) -> ShmResult<()> {
        shm_unlink(name).map_err(|e| ShmError::from_errno(name, e))
    }

    /// Read the owner PID recorded in an existing region without attaching
    /// to it. Returns `None` if the object is too small or not an arcset
    /// region.
    pub fn peek_owner(name: &str) -> ShmResult<Option<u32>> {
        let fd = shm_open(name, OFlag::O_RDONLY, Mode::empty())
            .map_err(|e| ShmError::from_errno(name, e))?;
        let file = File::from(fd);
        let header_size = core::mem::size_of::<RegionHeader>();
        if (file.metadata()?.len() as usize) < header_size {
            return Ok(None);
        }

        // SAFETY: read-only view of the header bytes of a shared object.
        let mmap = unsafe { MmapOptions::new().len(header_size).map(&file)? };
        // SAFETY: at least one header in size, page aligned.
        let header = unsafe { &*mmap.as_ptr().cast::<RegionHeader>() };
        if !header.is_magic_valid() {
            return Ok(None);
        }
        Ok(Some(header.owner_pid.load(Ordering::Relaxed)))
    }
}

impl<const N: usize> Drop for SharedRegion<N> {
    fn drop(&mut self) {
        self.unmap();
        if let Err(e) = self.unlink() {
            warn!("Failed to unlink region {}: {}", self.name, e);
        }
    }
}

fn map_file(file: &File, len: usize) -> ShmResult<MmapMut> {
    // SAFETY: shared mapping of a POSIX shm object; concurrent mutation by
    // other processes is confined to atomics and `UnsafeCell` slots.
    let mmap = unsafe { MmapOptions::new().len(len).map_mut(file)? };
    Ok(mmap)
}
