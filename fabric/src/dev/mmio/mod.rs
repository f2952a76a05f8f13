//! Register transport used by peripheral drivers.
//!
//! Drivers never touch hardware addresses themselves. They receive a [RegisterTransport]
//! for the window described by their record and address registers by byte offset.
use crate::error::{MmioError, Result};
use core::{
    cell::UnsafeCell,
    fmt::Debug,
    ptr::{read_volatile, write_volatile},
};
use desc::AttributeRecord;

/// 32-bit register access at byte offsets within one device window.
pub trait RegisterTransport: Send + Sync {
    fn read(&self, offset: usize) -> Result<u32>;
    fn write(&self, offset: usize, value: u32) -> Result<()>;
}

/// Physical address window of an IP, taken from its record.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IoRange {
    pub start: u64,
    pub len: u64,
}

impl IoRange {
    pub fn from_record(record: &AttributeRecord) -> core::result::Result<IoRange, MmioError> {
        let start = record.phys_addr.ok_or(MmioError::AddressNotSpecified)?;
        let len = record.addr_range.ok_or(MmioError::AddressNotSpecified)?;
        Ok(IoRange { start, len })
    }

    pub fn validate(&self, val_type: IoRangeValidationType) -> bool {
        match val_type {
            IoRangeValidationType::Fit(size) => self.len == size,
            IoRangeValidationType::Compatible(size) => self.len >= size,
        }
    }
}

impl Debug for IoRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("[{:#x},{:#x})", self.start, self.start + self.len))
    }
}

pub enum IoRangeValidationType {
    /// The size of the IO range is exactly the given register block size
    Fit(u64),
    /// The size of the IO range equal or is greater than the given register block size
    Compatible(u64),
}

/// One device register, only ever reached through a pointer into a mapped window.
#[repr(transparent)]
struct Register<T: Sized + Copy> {
    inner: UnsafeCell<T>,
}

impl<T: Sized + Copy> Register<T> {
    #[inline(always)]
    fn read(&self) -> T {
        // SAFETY: `MmioRegion::register` only hands out in-bounds, aligned registers.
        unsafe { read_volatile(self.inner.get()) }
    }

    #[inline(always)]
    fn write(&self, value: T) {
        // SAFETY: see `read`.
        unsafe { write_volatile(self.inner.get(), value) }
    }
}

/// A mapped register window accessed with volatile 32-bit operations.
pub struct MmioRegion {
    base: *mut u8,
    len: usize,
}

unsafe impl Sync for MmioRegion {}
unsafe impl Send for MmioRegion {}

impl MmioRegion {
    /// # Safety
    /// `base` must point to `len` bytes of mapped device memory (or ordinary memory) that stay
    /// valid for as long as the region exists and are not accessed through references.
    pub unsafe fn new(base: *mut u8, len: usize) -> core::result::Result<MmioRegion, MmioError> {
        if base.is_null() || base as usize % 4 != 0 {
            return Err(MmioError::InvalidAddress);
        }
        Ok(MmioRegion { base, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn register(&self, offset: usize) -> core::result::Result<&Register<u32>, MmioError> {
        if offset % 4 != 0 || offset.checked_add(4).is_none_or(|end| end > self.len) {
            return Err(MmioError::OutOfBounds {
                offset,
                len: self.len,
            });
        }
        Ok(unsafe { &*(self.base.add(offset) as *const Register<u32>) })
    }
}

impl RegisterTransport for MmioRegion {
    fn read(&self, offset: usize) -> Result<u32> {
        Ok(self.register(offset)?.read())
    }

    fn write(&self, offset: usize, value: u32) -> Result<()> {
        self.register(offset)?.write(value);
        Ok(())
    }
}

impl Debug for MmioRegion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmioRegion")
            .field("base", &self.base)
            .field("len", &self.len)
            .finish()
    }
}
