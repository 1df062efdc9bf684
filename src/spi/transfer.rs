// Licensed under the Apache-2.0 license

//! Interrupt-driven SSI transfer engine.
//!
//! Every frame clocked out clocks one frame in, so a transfer is staged as a
//! balanced pair of byte streams (see
//! [`TransferDescriptor::load_balanced`]). There are no protocol phases: two
//! FIFO events drain the two streams independently.
//!
//! - **Receive** (half full or timeout): empty the receive FIFO completely,
//!   keeping real bytes and discarding pad. Once every counter on both sides
//!   is zero the transfer is complete.
//! - **Transmit** (half empty): push up to `tx_batch` frames, payload before
//!   zero pad. When nothing is left the transmit interrupt is masked.
//!
//! Throughout a transfer the receive side trails the transmit side by exactly
//! the frames sitting in the FIFOs and the shift register.

use crate::descriptor::{TransferDescriptor, MAX_TRANSFER};
use crate::spi::common::{Error, SSI_RXFF, SSI_RXOR, SSI_RXTO, SSI_TXFF};
use crate::spi::traits::SsiFifo;

/// Interrupt sources owned by a running transfer.
pub const TRANSFER_INTERRUPTS: u32 = SSI_TXFF | SSI_RXFF | SSI_RXTO | SSI_RXOR;

pub struct SsiTransfer {
    desc: TransferDescriptor<MAX_TRANSFER>,
    tx_batch: usize,
    active: bool,
    outcome: Option<Result<(), Error>>,
}

impl SsiTransfer {
    #[must_use]
    pub const fn new(tx_batch: usize) -> Self {
        Self {
            desc: TransferDescriptor::new(),
            tx_batch,
            active: false,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TransferDescriptor<MAX_TRANSFER> {
        &self.desc
    }

    #[must_use]
    pub const fn outcome(&self) -> Option<Result<(), Error>> {
        self.outcome
    }

    /// Stage `out` for transmission and `in_len` bytes of reception.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while a transfer is active, [`Error::InvalidLength`]
    /// if nothing would be clocked or either side exceeds the staging
    /// capacity.
    pub fn begin(&mut self, out: &[u8], in_len: usize) -> Result<(), Error> {
        if self.active {
            return Err(Error::Busy);
        }
        if out.is_empty() && in_len == 0 {
            return Err(Error::InvalidLength);
        }
        self.desc
            .load_balanced(out, in_len)
            .map_err(|_| Error::InvalidLength)?;
        self.outcome = None;
        self.active = true;
        Ok(())
    }

    /// Handle one SSI interrupt.
    ///
    /// Returns `Some(result)` exactly once per transfer, when the last frame
    /// has been received or the transfer failed. The caller releases chip
    /// select at that point.
    pub fn service<P: SsiFifo>(&mut self, port: &mut P) -> Option<Result<(), Error>> {
        if !self.active {
            return None;
        }
        let status = port.masked_interrupt_status();
        port.clear_interrupts(status & (SSI_RXTO | SSI_RXOR));

        if status & SSI_RXOR != 0 {
            return Some(self.abort(port, Error::Overrun));
        }

        if status & (SSI_RXFF | SSI_RXTO) != 0 {
            while let Ok(byte) = port.read_fifo() {
                self.desc.store_in(byte);
            }
            if self.desc.is_drained() {
                port.disable_interrupts(TRANSFER_INTERRUPTS);
                return Some(self.finish(Ok(())));
            }
        }

        if status & SSI_TXFF != 0 {
            for _ in 0..self.tx_batch {
                let Some(byte) = self.desc.peek_out() else {
                    port.disable_interrupts(SSI_TXFF);
                    break;
                };
                if port.write_fifo(byte).is_err() {
                    break;
                }
                self.desc.advance_out();
            }
        }
        None
    }

    /// Stop the transfer and mask its interrupts. No-op when idle.
    pub fn abort<P: SsiFifo>(&mut self, port: &mut P, error: Error) -> Result<(), Error> {
        if !self.active {
            return Ok(());
        }
        port.disable_interrupts(TRANSFER_INTERRUPTS);
        self.finish(Err(error))
    }

    fn finish(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        self.active = false;
        self.outcome = Some(result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spi::common::SsiConfig;
    use core::convert::Infallible;
    use crate::spi::traits::SsiHardwareCore;
    use std::collections::VecDeque;
    use std::vec::Vec;

    /// FIFO pair whose raw status is set by the test.
    struct ScriptedFifo {
        tx: VecDeque<u8>,
        tx_capacity: usize,
        rx: VecDeque<u8>,
        raw: u32,
        mask: u32,
        cleared: u32,
        sent: Vec<u8>,
    }

    impl ScriptedFifo {
        fn new(raw: u32) -> Self {
            Self {
                tx: VecDeque::new(),
                tx_capacity: 8,
                rx: VecDeque::new(),
                raw,
                mask: TRANSFER_INTERRUPTS,
                cleared: 0,
                sent: Vec::new(),
            }
        }

        /// Shift everything queued for transmit out of the FIFO.
        fn drain_tx(&mut self) {
            self.tx.clear();
        }
    }

    impl SsiHardwareCore for ScriptedFifo {
        fn init(&mut self, _config: &SsiConfig) {}

        fn enable_interrupts(&mut self, mask: u32) {
            self.mask |= mask;
        }

        fn disable_interrupts(&mut self, mask: u32) {
            self.mask &= !mask;
        }

        fn clear_interrupts(&mut self, mask: u32) {
            self.cleared |= mask;
            self.raw &= !mask;
        }

        fn masked_interrupt_status(&mut self) -> u32 {
            self.raw & self.mask
        }
    }

    impl SsiFifo for ScriptedFifo {
        fn write_fifo(&mut self, byte: u8) -> nb::Result<(), Infallible> {
            if self.tx.len() >= self.tx_capacity {
                return Err(nb::Error::WouldBlock);
            }
            self.tx.push_back(byte);
            self.sent.push(byte);
            Ok(())
        }

        fn read_fifo(&mut self) -> nb::Result<u8, Infallible> {
            self.rx.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    #[test]
    fn test_transmit_event_pushes_at_most_one_batch() {
        let mut port = ScriptedFifo::new(SSI_TXFF);
        let mut transfer = SsiTransfer::new(4);
        let out: [u8; 10] = core::array::from_fn(|i| i as u8 + 1);
        transfer.begin(&out, 0).unwrap();

        assert_eq!(transfer.service(&mut port), None);
        assert_eq!(port.sent, [1, 2, 3, 4]);
        port.drain_tx();
        assert_eq!(transfer.service(&mut port), None);
        assert_eq!(port.sent, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(transfer.descriptor().pending_out(), 2);
        assert_ne!(port.mask & SSI_TXFF, 0);
    }

    #[test]
    fn test_payload_goes_out_before_pad() {
        let mut port = ScriptedFifo::new(SSI_TXFF);
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[0xaa, 0xbb], 5).unwrap();

        transfer.service(&mut port);
        assert_eq!(port.sent, [0xaa, 0xbb, 0x00, 0x00]);
        assert_ne!(port.mask & SSI_TXFF, 0);

        port.drain_tx();
        transfer.service(&mut port);
        assert_eq!(port.sent, [0xaa, 0xbb, 0x00, 0x00, 0x00]);
        assert_eq!(transfer.descriptor().pending_out(), 0);
        // Nothing left to send.
        assert_eq!(port.mask & SSI_TXFF, 0);
        assert_ne!(port.mask & SSI_RXFF, 0);
        assert!(transfer.is_active());
    }

    #[test]
    fn test_full_transmit_fifo_keeps_the_rest_pending() {
        let mut port = ScriptedFifo::new(SSI_TXFF);
        port.tx_capacity = 2;
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[1, 2, 3, 4, 5], 0).unwrap();

        transfer.service(&mut port);
        assert_eq!(port.sent, [1, 2]);
        assert_eq!(transfer.descriptor().pending_out(), 3);
        assert_ne!(port.mask & SSI_TXFF, 0);
    }

    #[test]
    fn test_receive_event_empties_the_fifo() {
        let mut port = ScriptedFifo::new(SSI_RXFF);
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[], 12).unwrap();
        port.rx.extend(10u8..17);

        assert_eq!(transfer.service(&mut port), None);
        assert!(port.rx.is_empty());
        assert_eq!(transfer.descriptor().received(), [10, 11, 12, 13, 14, 15, 16]);
        assert_eq!(transfer.descriptor().in_count(), 5);
    }

    #[test]
    fn test_receive_timeout_finishes_drained_transfer() {
        let mut port = ScriptedFifo::new(SSI_TXFF);
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[0x9f], 3).unwrap();

        transfer.service(&mut port);
        assert_eq!(port.sent, [0x9f, 0x00, 0x00]);
        assert_eq!(port.mask & SSI_TXFF, 0);

        port.raw = SSI_RXTO;
        port.rx.extend([0x00, 0x1f, 0x60]);
        assert_eq!(transfer.service(&mut port), Some(Ok(())));
        assert_eq!(port.cleared, SSI_RXTO);
        assert_eq!(port.mask, 0);
        assert!(!transfer.is_active());
        assert_eq!(transfer.outcome(), Some(Ok(())));
        assert_eq!(transfer.descriptor().received(), [0x00, 0x1f, 0x60]);
    }

    #[test]
    fn test_pad_frames_are_discarded_on_receive() {
        let mut port = ScriptedFifo::new(SSI_TXFF);
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[1, 2, 3], 1).unwrap();

        transfer.service(&mut port);
        port.raw = SSI_RXTO;
        port.rx.extend([0xee, 0x55, 0x66]);
        assert_eq!(transfer.service(&mut port), Some(Ok(())));
        assert_eq!(transfer.descriptor().received(), [0xee]);
    }

    #[test]
    fn test_overrun_aborts_once() {
        let mut port = ScriptedFifo::new(SSI_RXOR | SSI_RXFF);
        let mut transfer = SsiTransfer::new(4);
        transfer.begin(&[], 8).unwrap();
        port.rx.extend([1, 2]);

        assert_eq!(transfer.service(&mut port), Some(Err(Error::Overrun)));
        assert_eq!(port.cleared, SSI_RXOR);
        assert_eq!(port.mask, 0);
        assert!(!transfer.is_active());
        assert_eq!(transfer.service(&mut port), None);
        assert_eq!(transfer.outcome(), Some(Err(Error::Overrun)));
    }

    #[test]
    fn test_begin_guards() {
        let mut port = ScriptedFifo::new(0);
        let mut transfer = SsiTransfer::new(4);
        assert_eq!(transfer.begin(&[], 0), Err(Error::InvalidLength));
        assert_eq!(transfer.begin(&[], MAX_TRANSFER + 1), Err(Error::InvalidLength));
        transfer.begin(&[1], 0).unwrap();
        assert_eq!(transfer.begin(&[2], 0), Err(Error::Busy));
        assert_eq!(transfer.abort(&mut port, Error::Timeout), Err(Error::Timeout));
        assert_eq!(transfer.abort(&mut port, Error::Timeout), Ok(()));
        assert_eq!(transfer.service(&mut port), None);
    }
}
