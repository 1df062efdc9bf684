// Licensed under the Apache-2.0 license

//! Command-level interface of a serial NOR flash.
//!
//! Each method is one device operation. Sequencing (write enable before a
//! program, waiting out the busy bit afterwards) is left to the caller;
//! [`program_pages`] does it for multi-page writes.

pub trait SpiNorDevice {
    type Error;

    /// Bytes programmable by a single page-program command.
    const PAGE_SIZE: usize;
    /// Smallest erasable unit.
    const SECTOR_SIZE: usize;
    const CAPACITY: usize;

    fn nor_read_id(&mut self) -> Result<u16, Self::Error>;

    fn nor_read_status(&mut self) -> Result<u8, Self::Error>;

    fn nor_write_enable(&mut self) -> Result<(), Self::Error>;

    fn nor_write_disable(&mut self) -> Result<(), Self::Error>;

    fn nor_read_data(&mut self, address: u32, data: &mut [u8]) -> Result<(), Self::Error>;

    /// Program bytes inside the page containing `address`.
    fn nor_page_program(&mut self, address: u32, data: &[u8]) -> Result<(), Self::Error>;

    fn nor_sector_erase(&mut self, address: u32) -> Result<(), Self::Error>;

    fn nor_chip_erase(&mut self) -> Result<(), Self::Error>;

    /// Poll the status register until the device reports ready.
    fn nor_wait_until_ready(&mut self) -> Result<(), Self::Error>;
}

/// Program `data` at `address`, split at page boundaries.
///
/// Every page is preceded by a write enable and followed by a busy wait.
/// Bounds are the caller's to check.
///
/// # Errors
///
/// The first device error; pages before it stay programmed.
pub fn program_pages<D: SpiNorDevice>(
    nor: &mut D,
    address: u32,
    data: &[u8],
) -> Result<(), D::Error> {
    let mut address = address as usize;
    let mut rest = data;
    while !rest.is_empty() {
        let room = D::PAGE_SIZE - address % D::PAGE_SIZE;
        let (page, tail) = rest.split_at(room.min(rest.len()));
        nor.nor_write_enable()?;
        nor.nor_page_program(address as u32, page)?;
        nor.nor_wait_until_ready()?;
        address += page.len();
        rest = tail;
    }
    Ok(())
}
