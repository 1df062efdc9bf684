// Licensed under the Apache-2.0 license

//! AT24C08A serial EEPROM on top of the I2C controller.
//!
//! The 1 KiB array is split into four 256-byte blocks selected by the two low
//! bits of the slave address; the word address byte picks the byte inside a
//! block. Writes are cut at 16-byte page boundaries because the device wraps
//! inside a page instead of advancing to the next one.

use crate::common::{Logger, NoOpLogger};
use crate::i2c::common::Error;
use crate::i2c::i2c_controller::I2cController;
use crate::i2c::state_machine::I2C_MAX_TRANSFER;
use crate::i2c::traits::I2cMasterPort;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::SevenBitAddress;

pub const AT24C08_SIZE: usize = 1024;
pub const AT24C08_PAGE_SIZE: usize = 16;
const BLOCK_SIZE: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum At24cError {
    Bus(Error),
    /// The range does not fit inside the array.
    OutOfBounds,
}

impl From<Error> for At24cError {
    fn from(err: Error) -> Self {
        At24cError::Bus(err)
    }
}

pub struct At24c08<'c, H: I2cMasterPort, D: DelayNs, L: Logger = NoOpLogger> {
    bus: I2cController<'c, H, D, L>,
}

impl<'c, H: I2cMasterPort, D: DelayNs, L: Logger> At24c08<'c, H, D, L> {
    pub fn new(bus: I2cController<'c, H, D, L>) -> Self {
        Self { bus }
    }

    pub fn bus(&mut self) -> &mut I2cController<'c, H, D, L> {
        &mut self.bus
    }

    pub fn release(self) -> I2cController<'c, H, D, L> {
        self.bus
    }

    /// Slave address and word address for an array offset.
    #[must_use]
    pub fn locate(&self, offset: usize) -> (SevenBitAddress, u8) {
        let block = ((offset >> 8) & 0x03) as u8;
        (
            self.bus.config.device_address | block,
            (offset & 0xff) as u8,
        )
    }

    fn check(offset: usize, len: usize) -> Result<(), At24cError> {
        match offset.checked_add(len) {
            Some(end) if end <= AT24C08_SIZE => Ok(()),
            _ => Err(At24cError::OutOfBounds),
        }
    }

    /// Program `data` at `offset`, one page at a time, waiting out each
    /// internal write cycle.
    ///
    /// # Errors
    ///
    /// [`At24cError::OutOfBounds`] if the range leaves the array, otherwise
    /// the first bus error.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), At24cError> {
        Self::check(offset, data.len())?;
        let mut offset = offset;
        let mut rest = data;
        while !rest.is_empty() {
            let room = AT24C08_PAGE_SIZE - offset % AT24C08_PAGE_SIZE;
            let (page, tail) = rest.split_at(room.min(rest.len()));
            let (address, word) = self.locate(offset);
            self.bus.write_blocking(address, word, page)?;
            offset += page.len();
            rest = tail;
        }
        Ok(())
    }

    /// Fill `buffer` from `offset`.
    ///
    /// # Errors
    ///
    /// [`At24cError::OutOfBounds`] if the range leaves the array, otherwise
    /// the first bus error.
    pub fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), At24cError> {
        Self::check(offset, buffer.len())?;
        let mut offset = offset;
        let mut rest = buffer;
        while !rest.is_empty() {
            let room = (BLOCK_SIZE - offset % BLOCK_SIZE).min(I2C_MAX_TRANSFER);
            let (chunk, tail) = rest.split_at_mut(room.min(rest.len()));
            let (address, word) = self.locate(offset);
            self.bus.read_blocking(address, word, chunk)?;
            offset += chunk.len();
            rest = tail;
        }
        Ok(())
    }
}
