// Licensed under the Apache-2.0 license

//! Common types and constants for the I2C transaction engine.
//!
//! This module provides configuration, error handling, and fault decoding
//! shared by the state machine, the controller, and the device drivers.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, SevenBitAddress};
use fugit::{HertzU32, MicrosDurationU32};

/// Base 7-bit address of the AT24C08A EEPROM with A2 tied low.
pub const AT24C_BASE_ADDRESS: SevenBitAddress = 0x50;

/// Default ceiling on write-cycle ACK polls. An AT24C08A finishes its
/// internal write in 5 ms, about 25 polls at 100 kHz.
pub const DEFAULT_ACK_POLL_LIMIT: u32 = 1_000;

/// Default idle budget while waiting for a transfer to finish.
pub const DEFAULT_TIMEOUT_US: u32 = 100_000;

/// Default sleep between checks of the interrupt status while waiting.
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2cSpeed {
    Standard = 100_000,
    Fast = 400_000,
}

impl I2cSpeed {
    #[must_use]
    pub const fn rate(self) -> HertzU32 {
        HertzU32::from_raw(self as u32)
    }
}

/// Fault reported by the master after the last bus command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusFault {
    /// The slave did not acknowledge its address.
    AddressNak,
    /// The slave did not acknowledge a data byte.
    DataNak,
    /// Another master took the bus.
    ArbitrationLost,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The device did not acknowledge outside of write-cycle polling.
    NoAcknowledge(NoAcknowledgeSource),
    /// Arbitration was lost mid-transfer.
    ArbitrationLoss,
    /// The wait budget or the ACK-poll budget ran out.
    Timeout,
    /// A transfer is already in flight on this bus.
    Busy,
    /// Zero-length transfer, or larger than the engine can stage.
    InvalidLength,
    /// Operation sequence the word-addressed engine cannot express, or a
    /// pipeline deeper than the master's data path.
    Unsupported,
}

impl From<BusFault> for Error {
    fn from(fault: BusFault) -> Self {
        match fault {
            BusFault::AddressNak => Error::NoAcknowledge(NoAcknowledgeSource::Address),
            BusFault::DataNak => Error::NoAcknowledge(NoAcknowledgeSource::Data),
            BusFault::ArbitrationLost => Error::ArbitrationLoss,
        }
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NoAcknowledge(source) => ErrorKind::NoAcknowledge(*source),
            Error::ArbitrationLoss => ErrorKind::ArbitrationLoss,
            Error::Timeout | Error::Busy | Error::InvalidLength | Error::Unsupported => {
                ErrorKind::Other
            }
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct I2cConfig {
    pub speed: I2cSpeed,
    /// 7-bit base address of the target; high word-address bits are OR-ed in.
    pub device_address: SevenBitAddress,
    /// Bytes the controller holds between the data register and the wire.
    /// The finish command is issued this many bytes ahead of the last one.
    /// Transfers are refused if the port buffers fewer bytes than this.
    pub pipeline_depth: u8,
    /// Maximum write-cycle ACK polls, `None` to poll forever.
    pub ack_poll_limit: Option<u32>,
    /// Idle time allowed while waiting for completion, `None` to wait forever.
    pub timeout: Option<MicrosDurationU32>,
    pub poll_interval_us: u32,
}

pub struct I2cConfigBuilder {
    speed: I2cSpeed,
    device_address: SevenBitAddress,
    pipeline_depth: u8,
    ack_poll_limit: Option<u32>,
    timeout: Option<MicrosDurationU32>,
    poll_interval_us: u32,
}

impl Default for I2cConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl I2cConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: I2cSpeed::Standard,
            device_address: AT24C_BASE_ADDRESS,
            pipeline_depth: 1,
            ack_poll_limit: Some(DEFAULT_ACK_POLL_LIMIT),
            timeout: Some(MicrosDurationU32::micros(DEFAULT_TIMEOUT_US)),
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }
    #[must_use]
    pub fn speed(mut self, speed: I2cSpeed) -> Self {
        self.speed = speed;
        self
    }
    #[must_use]
    pub fn device_address(mut self, address: SevenBitAddress) -> Self {
        self.device_address = address & 0x7f;
        self
    }
    #[must_use]
    pub fn pipeline_depth(mut self, depth: u8) -> Self {
        self.pipeline_depth = depth;
        self
    }
    #[must_use]
    pub fn ack_poll_limit(mut self, limit: Option<u32>) -> Self {
        self.ack_poll_limit = limit;
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
    pub fn build(self) -> I2cConfig {
        I2cConfig {
            speed: self.speed,
            device_address: self.device_address,
            pipeline_depth: self.pipeline_depth.max(1),
            ack_poll_limit: self.ack_poll_limit,
            timeout: self.timeout,
            poll_interval_us: self.poll_interval_us.max(1),
        }
    }
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfigBuilder::new().build()
    }
}
