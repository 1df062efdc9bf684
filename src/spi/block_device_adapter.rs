// Licensed under the Apache-2.0 license

use core::fmt::Debug;

use embedded_storage::nor_flash::{
    check_erase, check_read, check_write, ErrorType, NorFlash, NorFlashError, NorFlashErrorKind,
    ReadNorFlash,
};

use crate::spi::norflash::{program_pages, SpiNorDevice};

/// Errors of the storage adapter.
///
/// It wraps the underlying device's error type `E` and adds logical errors.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E: Debug> {
    /// An error occurred during a read operation.
    Read(E),
    /// An error occurred during a program (write) operation.
    Program(E),
    /// An error occurred during an erase operation.
    Erase(E),
    /// The requested operation is outside the bounds of the device.
    OutOfBounds,
    /// An erase range that does not start and end on sector boundaries.
    NotAligned,
}

impl<E: Debug> NorFlashError for Error<E> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            Error::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            Error::NotAligned => NorFlashErrorKind::NotAligned,
            Error::Read(_) | Error::Program(_) | Error::Erase(_) => NorFlashErrorKind::Other,
        }
    }
}

impl<E: Debug> From<NorFlashErrorKind> for Error<E> {
    fn from(kind: NorFlashErrorKind) -> Self {
        match kind {
            NorFlashErrorKind::NotAligned => Error::NotAligned,
            _ => Error::OutOfBounds,
        }
    }
}

/// An adapter to expose a `SpiNorDevice` as `embedded-storage` NOR flash.
///
/// Reads and programs are byte granular; programming is split at page
/// boundaries and every page is followed by a busy wait.
pub struct SpiNorFlash<D: SpiNorDevice> {
    /// The underlying SPI NOR flash device.
    nor: D,
}

impl<D: SpiNorDevice> SpiNorFlash<D> {
    pub fn new(nor: D) -> Self {
        Self { nor }
    }

    pub fn inner(&mut self) -> &mut D {
        &mut self.nor
    }

    pub fn release(self) -> D {
        self.nor
    }
}

impl<D: SpiNorDevice> ErrorType for SpiNorFlash<D>
where
    D::Error: Debug,
{
    type Error = Error<D::Error>;
}

impl<D: SpiNorDevice> ReadNorFlash for SpiNorFlash<D>
where
    D::Error: Debug,
{
    const READ_SIZE: usize = 1;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        check_read(self, offset, bytes.len())?;
        self.nor.nor_read_data(offset, bytes).map_err(Error::Read)
    }

    fn capacity(&self) -> usize {
        D::CAPACITY
    }
}

impl<D: SpiNorDevice> NorFlash for SpiNorFlash<D>
where
    D::Error: Debug,
{
    const WRITE_SIZE: usize = 1;
    const ERASE_SIZE: usize = D::SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        check_erase(self, from, to)?;
        for sector in (from..to).step_by(D::SECTOR_SIZE) {
            self.nor.nor_write_enable().map_err(Error::Erase)?;
            self.nor.nor_sector_erase(sector).map_err(Error::Erase)?;
            self.nor.nor_wait_until_ready().map_err(Error::Erase)?;
        }
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        check_write(self, offset, bytes.len())?;
        program_pages(&mut self.nor, offset, bytes).map_err(Error::Program)
    }
}
