// Licensed under the Apache-2.0 license

//! # SSI Bus Adapter Traits
//!
//! ```text
//! SsiHardwareCore (init, interrupt mask/clear/status)
//!     └── SsiFifo (non-blocking FIFO push/pop)
//! ```
//!
//! Interrupt bits use the [`SSI_TXFF`](crate::spi::common::SSI_TXFF) family
//! of masks. Enabling the transmit interrupt is what starts the clock, so an
//! adapter must have the transmit FIFO ready before it unmasks it.

use core::convert::Infallible;

use crate::spi::common::SsiConfig;

/// Core interface every SSI master adapter provides.
pub trait SsiHardwareCore {
    /// Configure clock rate, frame format and master mode, then enable.
    fn init(&mut self, config: &SsiConfig);

    fn enable_interrupts(&mut self, mask: u32);

    fn disable_interrupts(&mut self, mask: u32);

    /// Acknowledge latched interrupt sources (receive timeout, overrun).
    fn clear_interrupts(&mut self, mask: u32);

    /// Masked interrupt status.
    fn masked_interrupt_status(&mut self) -> u32;

    /// Any unmasked source asserted.
    ///
    /// Used by the driven wait loop; a simulated bus may advance its clock
    /// here.
    fn interrupt_pending(&mut self) -> bool {
        self.masked_interrupt_status() != 0
    }
}

/// Non-blocking FIFO access used by the transfer engine.
pub trait SsiFifo: SsiHardwareCore {
    /// Queue a frame, or `WouldBlock` if the transmit FIFO is full.
    fn write_fifo(&mut self, byte: u8) -> nb::Result<(), Infallible>;

    /// Take a received frame, or `WouldBlock` if the receive FIFO is empty.
    fn read_fifo(&mut self) -> nb::Result<u8, Infallible>;
}
