// Licensed under the Apache-2.0 license

//! AT25F1024A serial flash on top of the SSI controller.
//!
//! Every command is one chip-select framed transfer. Commands that make the
//! device busy (program, erase, status write) are followed by polling the
//! status register until the busy bit clears, within the configured busy
//! budget.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Vec;
use hex_literal::hex;

use crate::common::{Logger, NoOpLogger, PollBudget};
use crate::descriptor::MAX_TRANSFER;
use crate::spi::common::Error;
use crate::spi::norflash::{program_pages, SpiNorDevice};
use crate::spi::ssi_controller::SsiController;
use crate::spi::traits::SsiFifo;

/// Set write enable latch.
pub const CMD_WREN: u8 = 0x06;
/// Reset write enable latch.
pub const CMD_WRDI: u8 = 0x04;
/// Read status register.
pub const CMD_RDSR: u8 = 0x05;
/// Write status register.
pub const CMD_WRSR: u8 = 0x01;
pub const CMD_READ: u8 = 0x03;
pub const CMD_PROGRAM: u8 = 0x02;
pub const CMD_SECTOR_ERASE: u8 = 0x52;
pub const CMD_CHIP_ERASE: u8 = 0x62;
/// Read manufacturer and product ID.
pub const CMD_RDID: u8 = 0x15;

pub const STATUS_BUSY: u8 = 0x01;
pub const STATUS_WEL: u8 = 0x02;

/// Atmel manufacturer code followed by the AT25F1024A device code.
pub const AT25F1024_ID: u16 = u16::from_be_bytes(hex!("1f 60"));

pub const AT25F_CAPACITY: usize = 128 * 1024;
pub const AT25F_PAGE_SIZE: usize = 256;
pub const AT25F_SECTOR_SIZE: usize = 32 * 1024;

/// Opcode plus 24-bit address.
const HEADER_LEN: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum At25fError {
    Bus(Error),
    /// The device answered with an unexpected manufacturer/device ID.
    BadDeviceId(u16),
    /// The range does not fit inside the array.
    OutOfBounds,
    /// The busy bit did not clear within the busy budget.
    BusyTimeout,
}

impl From<Error> for At25fError {
    fn from(err: Error) -> Self {
        At25fError::Bus(err)
    }
}

fn header(command: u8, address: usize) -> [u8; HEADER_LEN] {
    let [_, high, mid, low] = (address as u32).to_be_bytes();
    [command, high, mid, low]
}

fn check(address: usize, len: usize) -> Result<(), At25fError> {
    match address.checked_add(len) {
        Some(end) if end <= AT25F_CAPACITY => Ok(()),
        _ => Err(At25fError::OutOfBounds),
    }
}

pub struct At25f1024<'c, H, CS, D, L = NoOpLogger>
where
    H: SsiFifo,
    CS: OutputPin,
    D: DelayNs,
    L: Logger,
{
    ssi: SsiController<'c, H, CS, D, L>,
}

impl<'c, H, CS, D, L> At25f1024<'c, H, CS, D, L>
where
    H: SsiFifo,
    CS: OutputPin,
    D: DelayNs,
    L: Logger,
{
    pub fn new(ssi: SsiController<'c, H, CS, D, L>) -> Self {
        Self { ssi }
    }

    pub fn ssi(&mut self) -> &mut SsiController<'c, H, CS, D, L> {
        &mut self.ssi
    }

    pub fn release(self) -> SsiController<'c, H, CS, D, L> {
        self.ssi
    }

    /// Manufacturer code in the high byte, device code in the low byte.
    ///
    /// # Errors
    ///
    /// Any bus error.
    pub fn read_id(&mut self) -> Result<u16, At25fError> {
        // The opcode frame clocks in one byte of nothing before the ID.
        let mut reply = [0u8; 3];
        self.ssi.transfer(&[CMD_RDID], &mut reply)?;
        let [_, manufacturer, device] = reply;
        Ok(u16::from_be_bytes([manufacturer, device]))
    }

    /// # Errors
    ///
    /// [`At25fError::BadDeviceId`] if something other than an AT25F1024A
    /// answers.
    pub fn verify_id(&mut self) -> Result<(), At25fError> {
        match self.read_id()? {
            AT25F1024_ID => Ok(()),
            other => {
                self.ssi.logger.error("at25f: unexpected device id");
                Err(At25fError::BadDeviceId(other))
            }
        }
    }

    /// # Errors
    ///
    /// Any bus error.
    pub fn chip_status(&mut self) -> Result<u8, At25fError> {
        let mut reply = [0u8; 2];
        self.ssi.transfer(&[CMD_RDSR], &mut reply)?;
        let [_, status] = reply;
        Ok(status)
    }

    fn command(&mut self, frame: &[u8]) -> Result<(), At25fError> {
        self.ssi.transfer(frame, &mut [])?;
        Ok(())
    }

    /// # Errors
    ///
    /// Any bus error.
    pub fn write_enable(&mut self) -> Result<(), At25fError> {
        self.command(&[CMD_WREN])
    }

    /// # Errors
    ///
    /// Any bus error.
    pub fn write_disable(&mut self) -> Result<(), At25fError> {
        self.command(&[CMD_WRDI])
    }

    /// Poll the status register until the busy bit clears.
    ///
    /// # Errors
    ///
    /// [`At25fError::BusyTimeout`] once the busy budget is spent.
    pub fn wait_until_ready(&mut self) -> Result<(), At25fError> {
        let mut budget = PollBudget::new(
            self.ssi.config.busy_timeout,
            self.ssi.config.busy_poll_interval_us,
        );
        loop {
            if self.chip_status()? & STATUS_BUSY == 0 {
                return Ok(());
            }
            if !budget.idle(self.ssi.poll_delay()) {
                self.ssi.logger.error("at25f: device stuck busy");
                return Err(At25fError::BusyTimeout);
            }
        }
    }

    /// Write the block-protect bits of the status register.
    ///
    /// # Errors
    ///
    /// Any bus error, or [`At25fError::BusyTimeout`].
    pub fn write_status(&mut self, status: u8) -> Result<(), At25fError> {
        self.write_enable()?;
        self.command(&[CMD_WRSR, status])?;
        self.wait_until_ready()
    }

    /// Erase the whole array and wait for the erase to finish.
    ///
    /// # Errors
    ///
    /// Any bus error, or [`At25fError::BusyTimeout`].
    pub fn erase_chip(&mut self) -> Result<(), At25fError> {
        self.write_enable()?;
        self.command(&[CMD_CHIP_ERASE])?;
        self.wait_until_ready()
    }

    /// Erase the 32 KiB sector containing `address`.
    ///
    /// # Errors
    ///
    /// [`At25fError::OutOfBounds`], any bus error, or
    /// [`At25fError::BusyTimeout`].
    pub fn erase_sector(&mut self, address: usize) -> Result<(), At25fError> {
        check(address, 1)?;
        self.write_enable()?;
        self.command(&header(CMD_SECTOR_ERASE, address))?;
        self.wait_until_ready()
    }

    /// Program one page-bounded chunk without waiting for completion.
    fn program(&mut self, address: usize, data: &[u8]) -> Result<(), At25fError> {
        let mut frame: Vec<u8, MAX_TRANSFER> = Vec::new();
        let too_long = |()| At25fError::Bus(Error::InvalidLength);
        frame
            .extend_from_slice(&header(CMD_PROGRAM, address))
            .map_err(too_long)?;
        frame.extend_from_slice(data).map_err(too_long)?;
        self.command(&frame)
    }

    /// Program `data` at `address`, one page at a time.
    ///
    /// The target range must have been erased.
    ///
    /// # Errors
    ///
    /// [`At25fError::OutOfBounds`], any bus error, or
    /// [`At25fError::BusyTimeout`].
    pub fn write(&mut self, address: usize, data: &[u8]) -> Result<(), At25fError> {
        check(address, data.len())?;
        program_pages(self, address as u32, data)
    }

    /// Fill `buffer` from `address`.
    ///
    /// # Errors
    ///
    /// [`At25fError::OutOfBounds`] or any bus error.
    pub fn read(&mut self, address: usize, buffer: &mut [u8]) -> Result<(), At25fError> {
        check(address, buffer.len())?;
        let mut address = address;
        for chunk in buffer.chunks_mut(MAX_TRANSFER - HEADER_LEN) {
            // The reply to the opcode and address frames is discarded.
            self.ssi
                .start_transfer(&header(CMD_READ, address), chunk.len() + HEADER_LEN)?;
            self.ssi.wait()?;
            let data = self
                .ssi
                .received()
                .get(HEADER_LEN..)
                .ok_or(At25fError::Bus(Error::InvalidLength))?;
            if data.len() != chunk.len() {
                return Err(At25fError::Bus(Error::InvalidLength));
            }
            chunk.copy_from_slice(data);
            address += chunk.len();
        }
        Ok(())
    }
}

impl<H, CS, D, L> SpiNorDevice for At25f1024<'_, H, CS, D, L>
where
    H: SsiFifo,
    CS: OutputPin,
    D: DelayNs,
    L: Logger,
{
    type Error = At25fError;

    const PAGE_SIZE: usize = AT25F_PAGE_SIZE;
    const SECTOR_SIZE: usize = AT25F_SECTOR_SIZE;
    const CAPACITY: usize = AT25F_CAPACITY;

    fn nor_read_id(&mut self) -> Result<u16, Self::Error> {
        self.read_id()
    }

    fn nor_read_status(&mut self) -> Result<u8, Self::Error> {
        self.chip_status()
    }

    fn nor_write_enable(&mut self) -> Result<(), Self::Error> {
        self.write_enable()
    }

    fn nor_write_disable(&mut self) -> Result<(), Self::Error> {
        self.write_disable()
    }

    fn nor_read_data(&mut self, address: u32, data: &mut [u8]) -> Result<(), Self::Error> {
        self.read(address as usize, data)
    }

    fn nor_page_program(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error> {
        let address = address as usize;
        check(address, data.len())?;
        if address % AT25F_PAGE_SIZE + data.len() > AT25F_PAGE_SIZE {
            return Err(At25fError::OutOfBounds);
        }
        self.program(address, data)
    }

    fn nor_sector_erase(&mut self, address: u32) -> Result<(), Self::Error> {
        check(address as usize, 1)?;
        self.command(&header(CMD_SECTOR_ERASE, address as usize))
    }

    fn nor_chip_erase(&mut self) -> Result<(), Self::Error> {
        self.command(&[CMD_CHIP_ERASE])
    }

    fn nor_wait_until_ready(&mut self) -> Result<(), Self::Error> {
        self.wait_until_ready()
    }
}
