// Licensed under the Apache-2.0 license

//! Volatile access to a memory-mapped register block.

/// Base address of a peripheral's register block.
#[derive(Clone, Copy, Debug)]
pub struct RegisterBlock {
    base: usize,
}

impl RegisterBlock {
    /// # Safety
    ///
    /// `base` must be the address of a register block that stays mapped for
    /// the lifetime of the value, and nothing else may drive the same
    /// registers concurrently.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    #[must_use]
    pub const fn base(&self) -> usize {
        self.base
    }

    #[must_use]
    pub fn read(&self, offset: usize) -> u32 {
        // SAFETY: the constructor's contract covers every offset the
        // adapters use.
        unsafe { core::ptr::read_volatile((self.base + offset) as *const u32) }
    }

    pub fn write(&self, offset: usize, value: u32) {
        // SAFETY: as for `read`.
        unsafe { core::ptr::write_volatile((self.base + offset) as *mut u32, value) }
    }

    pub fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        self.write(offset, f(self.read(offset)));
    }
}
