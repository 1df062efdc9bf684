// Licensed under the Apache-2.0 license

//! # I2C Bus Adapter Traits
//!
//! The transaction engine never touches registers. It drives the master
//! through two small traits:
//!
//! ```text
//! I2cHardwareCore (init, interrupt enable/clear/status)
//!     └── I2cMasterPort (slave address, data register, command, fault)
//! ```
//!
//! A concrete adapter must make a command effective before the interrupt it
//! causes can fire: writing the control register is the last thing
//! [`I2cMasterPort::control`] does.

use crate::i2c::common::{BusFault, I2cConfig};
use embedded_hal::i2c::SevenBitAddress;

/// Bus-level command issued to the master after the data register and slave
/// address are set up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MasterCommand {
    /// START, address, one byte, STOP.
    SingleSend,
    /// START, address, one byte received with NACK, STOP.
    SingleReceive,
    /// START, address, first byte; bus stays open.
    BurstSendStart,
    /// Next byte of an open send burst.
    BurstSendCont,
    /// Last byte of a send burst, then STOP.
    BurstSendFinish,
    /// START, address, first byte received with ACK.
    BurstReceiveStart,
    /// Next byte received with ACK.
    BurstReceiveCont,
    /// Last byte received with NACK, then STOP.
    BurstReceiveFinish,
    /// STOP after a fault in an open burst.
    ErrorStop,
}

/// Core interface every I2C master adapter provides.
pub trait I2cHardwareCore {
    /// Bring the master up with the given configuration.
    fn init(&mut self, config: &I2cConfig);

    /// Unmask the master interrupt.
    fn enable_interrupts(&mut self);

    /// Mask the master interrupt.
    fn disable_interrupts(&mut self);

    /// Acknowledge the master interrupt.
    fn clear_interrupts(&mut self);

    /// Masked interrupt status.
    ///
    /// Used by the driven wait loop when the bus IRQ is not routed to a
    /// handler; a simulated bus may advance its clock here.
    fn interrupt_pending(&mut self) -> bool;
}

/// I2C master operations used by the transaction state machine.
pub trait I2cMasterPort: I2cHardwareCore {
    /// Set the target address and direction for the next START.
    fn set_slave_address(&mut self, address: SevenBitAddress, receive: bool);

    /// Load the byte to transmit with the next send command.
    fn data_put(&mut self, byte: u8);

    /// Byte received by the last receive command.
    fn data_get(&mut self) -> u8;

    /// Issue a bus command.
    fn control(&mut self, command: MasterCommand);

    /// Fault left by the last command, if any.
    fn fault(&mut self) -> Option<BusFault>;

    /// Bytes the data path can buffer ahead of the wire. A master with a
    /// single data register holds one.
    fn data_depth(&self) -> u8 {
        1
    }
}
