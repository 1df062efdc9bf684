// Licensed under the Apache-2.0 license

//! Common types and constants for the SSI transfer engine.

use embedded_hal::spi::{ErrorKind, Mode, MODE_3};
use fugit::{HertzU32, MicrosDurationU32};

/// Transmit FIFO half empty or less.
pub const SSI_TXFF: u32 = 0x08;
/// Receive FIFO half full or more.
pub const SSI_RXFF: u32 = 0x04;
/// Receive timeout: data sat in the receive FIFO without reaching the trigger.
pub const SSI_RXTO: u32 = 0x02;
/// Receive overrun.
pub const SSI_RXOR: u32 = 0x01;

/// Depth of the transmit and receive FIFOs.
pub const SSI_FIFO_DEPTH: usize = 8;

pub const DEFAULT_BIT_RATE_HZ: u32 = 1_000_000;
pub const DEFAULT_TX_BATCH: usize = 4;
pub const DEFAULT_TIMEOUT_US: u32 = 100_000;
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;
/// A chip erase of the AT25F1024A can take several seconds.
pub const DEFAULT_BUSY_TIMEOUT_US: u32 = 10_000_000;
pub const DEFAULT_BUSY_POLL_INTERVAL_US: u32 = 100;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The receive FIFO overflowed; bytes were lost.
    Overrun,
    /// The wait budget ran out with the transfer still open.
    Timeout,
    /// A transfer is already in flight on this bus.
    Busy,
    /// Empty transfer, or larger than the engine can stage.
    InvalidLength,
    /// The chip select pin could not be driven.
    ChipSelect,
}

impl embedded_hal::spi::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Overrun => ErrorKind::Overrun,
            Error::ChipSelect => ErrorKind::ChipSelectFault,
            Error::Timeout | Error::Busy | Error::InvalidLength => ErrorKind::Other,
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct SsiConfig {
    pub bit_rate: HertzU32,
    pub mode: Mode,
    /// Bits per frame, 4 to 16.
    pub data_width: u8,
    /// Bytes pushed per transmit interrupt; matches the FIFO trigger level.
    pub tx_batch: usize,
    /// Idle time allowed while waiting for chip select to deassert,
    /// `None` to wait forever.
    pub timeout: Option<MicrosDurationU32>,
    pub poll_interval_us: u32,
    /// Budget for device-internal operations polled through a status
    /// register, `None` to poll forever.
    pub busy_timeout: Option<MicrosDurationU32>,
    pub busy_poll_interval_us: u32,
}

pub struct SsiConfigBuilder {
    bit_rate: HertzU32,
    mode: Mode,
    data_width: u8,
    tx_batch: usize,
    timeout: Option<MicrosDurationU32>,
    poll_interval_us: u32,
    busy_timeout: Option<MicrosDurationU32>,
    busy_poll_interval_us: u32,
}

impl Default for SsiConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SsiConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bit_rate: HertzU32::from_raw(DEFAULT_BIT_RATE_HZ),
            mode: MODE_3,
            data_width: 8,
            tx_batch: DEFAULT_TX_BATCH,
            timeout: Some(MicrosDurationU32::micros(DEFAULT_TIMEOUT_US)),
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            busy_timeout: Some(MicrosDurationU32::micros(DEFAULT_BUSY_TIMEOUT_US)),
            busy_poll_interval_us: DEFAULT_BUSY_POLL_INTERVAL_US,
        }
    }
    #[must_use]
    pub fn bit_rate(mut self, rate: HertzU32) -> Self {
        self.bit_rate = rate;
        self
    }
    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
    #[must_use]
    pub fn data_width(mut self, width: u8) -> Self {
        self.data_width = width;
        self
    }
    #[must_use]
    pub fn tx_batch(mut self, batch: usize) -> Self {
        self.tx_batch = batch;
        self
    }
    #[must_use]
    pub fn timeout(mut self, timeout: Option<MicrosDurationU32>) -> Self {
        self.timeout = timeout;
        self
    }
    #[must_use]
    pub fn poll_interval_us(mut self, interval: u32) -> Self {
        self.poll_interval_us = interval;
        self
    }
    #[must_use]
    pub fn busy_timeout(mut self, timeout: Option<MicrosDurationU32>) -> Self {
        self.busy_timeout = timeout;
        self
    }
    #[must_use]
    pub fn busy_poll_interval_us(mut self, interval: u32) -> Self {
        self.busy_poll_interval_us = interval;
        self
    }
    #[must_use]
    pub fn build(self) -> SsiConfig {
        SsiConfig {
            bit_rate: self.bit_rate,
            mode: self.mode,
            data_width: self.data_width.clamp(4, 16),
            tx_batch: self.tx_batch.clamp(1, SSI_FIFO_DEPTH),
            timeout: self.timeout,
            poll_interval_us: self.poll_interval_us.max(1),
            busy_timeout: self.busy_timeout,
            busy_poll_interval_us: self.busy_poll_interval_us.max(1),
        }
    }
}

impl Default for SsiConfig {
    fn default() -> Self {
        SsiConfigBuilder::new().build()
    }
}
