// Licensed under the Apache-2.0 license

//! Plain memory standing in for a peripheral register block.
//!
//! The register adapters are pointed at the block's base address and do
//! their usual volatile accesses; the tests then inspect or preset words by
//! byte offset. Nothing reacts to a write the way silicon would.

use core::cell::UnsafeCell;
use std::boxed::Box;
use std::vec::Vec;

pub struct FakeRegisters {
    words: Box<[UnsafeCell<u32>]>,
}

impl FakeRegisters {
    /// A zeroed block covering `span` bytes.
    pub fn new(span: usize) -> Self {
        let words: Vec<UnsafeCell<u32>> = (0..span.div_ceil(4)).map(|_| UnsafeCell::new(0)).collect();
        Self {
            words: words.into_boxed_slice(),
        }
    }

    pub fn base(&self) -> usize {
        self.words.as_ptr() as usize
    }

    pub fn read(&self, offset: usize) -> u32 {
        // SAFETY: in-bounds cell of a live allocation.
        unsafe { self.words[offset / 4].get().read_volatile() }
    }

    pub fn write(&self, offset: usize, value: u32) {
        // SAFETY: in-bounds cell of a live allocation.
        unsafe { self.words[offset / 4].get().write_volatile(value) }
    }
}
