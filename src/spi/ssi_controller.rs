// Licensed under the Apache-2.0 license

//! Non-blocking SSI master controller with a GPIO chip select.
//!
//! A transfer asserts chip select, then unmasks the FIFO interrupts, which
//! starts the clock. The interrupt handler deasserts chip select once every
//! frame has been clocked and received, and signals the shared
//! [`Completion`]. Waiting works the same way as for the I2C controller:
//! either on the `Completion` with the handler routed to the SSI vector, or
//! through [`wait`](SsiController::wait), which services the interrupt
//! status from the calling context.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::common::{Logger, NoOpLogger, PollBudget};
use crate::completion::Completion;
use crate::spi::common::{Error, SsiConfig};
use crate::spi::transfer::{SsiTransfer, TRANSFER_INTERRUPTS};
use crate::spi::traits::SsiFifo;

pub struct SsiController<'c, H: SsiFifo, CS: OutputPin, D: DelayNs, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: SsiConfig,
    pub logger: L,
    cs: CS,
    delay: D,
    done: &'c Completion,
    transfer: SsiTransfer,
}

impl<'c, H: SsiFifo, CS: OutputPin, D: DelayNs> SsiController<'c, H, CS, D, NoOpLogger> {
    pub fn new(hardware: H, cs: CS, config: SsiConfig, delay: D, done: &'c Completion) -> Self {
        Self::with_logger(hardware, cs, config, delay, done, NoOpLogger)
    }
}

impl<'c, H: SsiFifo, CS: OutputPin, D: DelayNs, L: Logger> SsiController<'c, H, CS, D, L> {
    pub fn with_logger(
        hardware: H,
        cs: CS,
        config: SsiConfig,
        delay: D,
        done: &'c Completion,
        logger: L,
    ) -> Self {
        Self {
            hardware,
            transfer: SsiTransfer::new(config.tx_batch),
            config,
            logger,
            cs,
            delay,
            done,
        }
    }

    /// Configure and enable the port, release chip select and throw away
    /// anything left in the receive FIFO.
    ///
    /// # Errors
    ///
    /// [`Error::ChipSelect`] if the chip select pin cannot be driven.
    pub fn init(&mut self) -> Result<(), Error> {
        self.cs.set_high().map_err(|_| Error::ChipSelect)?;
        self.hardware.disable_interrupts(TRANSFER_INTERRUPTS);
        self.hardware.init(&self.config);
        while self.hardware.read_fifo().is_ok() {}
        self.hardware.clear_interrupts(TRANSFER_INTERRUPTS);
        self.logger.debug("ssi: port initialized");
        Ok(())
    }

    /// A transfer is armed and has not finished.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.transfer.is_active()
    }

    pub fn chip_select(&mut self) -> &mut CS {
        &mut self.cs
    }

    /// Frames kept by the last transfer.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        self.transfer.descriptor().received()
    }

    #[must_use]
    pub fn transfer_state(&self) -> &SsiTransfer {
        &self.transfer
    }

    /// Clock `out` to the device and keep the first `in_len` frames coming
    /// back. The shorter side is padded.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another transfer is in flight,
    /// [`Error::InvalidLength`] for an empty or oversized transfer,
    /// [`Error::ChipSelect`] if chip select cannot be asserted.
    pub fn start_transfer(&mut self, out: &[u8], in_len: usize) -> Result<(), Error> {
        self.done.arm().map_err(|_| Error::Busy)?;
        if let Err(err) = self.transfer.begin(out, in_len) {
            if err != Error::Busy {
                self.done.reset();
            }
            return Err(err);
        }
        if self.cs.set_low().is_err() {
            let _ = self.transfer.abort(&mut self.hardware, Error::ChipSelect);
            self.done.reset();
            return Err(Error::ChipSelect);
        }
        self.hardware.enable_interrupts(TRANSFER_INTERRUPTS);
        Ok(())
    }

    /// SSI interrupt handler body.
    pub fn handle_interrupt(&mut self) {
        if let Some(result) = self.transfer.service(&mut self.hardware) {
            let released = self.cs.set_high().is_ok();
            if result.is_err() || !released {
                self.logger.error("ssi: transfer failed");
            }
            self.done.signal(result.is_ok() && released);
        }
    }

    /// Collect the outcome of a finished transfer. `None` while in flight.
    pub fn finish(&mut self) -> Option<Result<(), Error>> {
        let ok = self.done.poll()?;
        self.done.reset();
        Some(match self.transfer.outcome() {
            Some(Ok(())) if !ok => Err(Error::ChipSelect),
            Some(result) => result,
            None => Err(Error::Timeout),
        })
    }

    /// Stop the in-flight transfer and release chip select.
    pub fn cancel(&mut self) {
        if !self.transfer.is_active() {
            return;
        }
        let _ = self.transfer.abort(&mut self.hardware, Error::Timeout);
        let _ = self.cs.set_high();
        self.done.signal(false);
        self.done.reset();
        self.logger.error("ssi: transfer cancelled, chip select released");
    }

    /// Drive the in-flight transfer to completion from the calling context.
    ///
    /// # Errors
    ///
    /// The transfer's own error, or [`Error::Timeout`] if the idle budget
    /// ran out; the transfer is cancelled in that case.
    pub fn wait(&mut self) -> Result<(), Error> {
        let mut budget = PollBudget::new(self.config.timeout, self.config.poll_interval_us);
        loop {
            if let Some(result) = self.finish() {
                return result;
            }
            if self.hardware.interrupt_pending() {
                self.handle_interrupt();
                continue;
            }
            if !budget.idle(&mut self.delay) {
                self.cancel();
                return Err(Error::Timeout);
            }
        }
    }

    /// Full-duplex transfer: send `out`, fill `input` with the first frames
    /// received.
    ///
    /// # Errors
    ///
    /// See [`start_transfer`](Self::start_transfer) and [`wait`](Self::wait).
    pub fn transfer(&mut self, out: &[u8], input: &mut [u8]) -> Result<(), Error> {
        self.start_transfer(out, input.len())?;
        self.wait()?;
        let received = self.received();
        let dst = input.get_mut(..received.len()).ok_or(Error::InvalidLength)?;
        dst.copy_from_slice(received);
        Ok(())
    }

    /// Sleep between status polls of a device-internal operation.
    pub(crate) fn poll_delay(&mut self) -> &mut D {
        &mut self.delay
    }
}
