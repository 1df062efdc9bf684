// Licensed under the Apache-2.0 license

//! Non-blocking I2C master controller for word-addressed devices.
//!
//! The controller owns the hardware adapter and the transaction state
//! machine, and reports completion through a shared [`Completion`]. It can be
//! used two ways:
//!
//! - **Interrupt routed.** The controller sits in a static cell shared with
//!   the master's interrupt handler, which calls
//!   [`handle_interrupt`](I2cController::handle_interrupt). The mainline
//!   starts a transfer, waits on the `Completion` without holding the cell,
//!   then collects the result with [`finish`](I2cController::finish).
//! - **Driven.** [`wait`](I2cController::wait) watches the masked interrupt
//!   status and runs the handler from the calling context.
//!
//! ```rust,ignore
//! static DONE: Completion = Completion::new();
//! static BUS: Mutex<RefCell<Option<I2cController<'static, Lm3sI2cMaster, Delay>>>> =
//!     Mutex::new(RefCell::new(None));
//!
//! #[interrupt]
//! fn I2C0() {
//!     interrupt::free(|cs| {
//!         if let Some(bus) = BUS.borrow(cs).borrow_mut().as_mut() {
//!             bus.handle_interrupt();
//!         }
//!     });
//! }
//! ```

use crate::common::{Logger, NoOpLogger, PollBudget};
use crate::completion::Completion;
use crate::i2c::common::{Error, I2cConfig};
use crate::i2c::state_machine::{I2cState, I2cTransaction};
use crate::i2c::traits::I2cMasterPort;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Operation, SevenBitAddress};

pub struct I2cController<'c, H: I2cMasterPort, D: DelayNs, L: Logger = NoOpLogger> {
    pub hardware: H,
    pub config: I2cConfig,
    pub logger: L,
    delay: D,
    done: &'c Completion,
    transaction: I2cTransaction,
}

impl<'c, H: I2cMasterPort, D: DelayNs> I2cController<'c, H, D, NoOpLogger> {
    pub fn new(hardware: H, config: I2cConfig, delay: D, done: &'c Completion) -> Self {
        Self::with_logger(hardware, config, delay, done, NoOpLogger)
    }
}

impl<'c, H: I2cMasterPort, D: DelayNs, L: Logger> I2cController<'c, H, D, L> {
    pub fn with_logger(
        hardware: H,
        config: I2cConfig,
        delay: D,
        done: &'c Completion,
        logger: L,
    ) -> Self {
        Self {
            hardware,
            transaction: I2cTransaction::new(config.pipeline_depth, config.ack_poll_limit),
            config,
            logger,
            delay,
            done,
        }
    }

    /// Bring the master up and unmask its interrupt.
    pub fn init(&mut self) {
        self.hardware.init(&self.config);
        self.hardware.clear_interrupts();
        self.hardware.enable_interrupts();
        self.logger.debug("i2c: master initialized");
    }

    #[must_use]
    pub fn state(&self) -> I2cState {
        self.transaction.state()
    }

    /// Write-cycle polls issued by the current or last write.
    #[must_use]
    pub fn ack_polls(&self) -> u32 {
        self.transaction.ack_polls()
    }

    /// Bytes collected by the last read.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        self.transaction.descriptor().received()
    }

    /// Start a burst write of `data` at word address `word`, followed by
    /// write-cycle polling. Returns as soon as the first command is issued.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another transfer is in flight,
    /// [`Error::InvalidLength`] for an empty or oversized payload.
    pub fn start_write(
        &mut self,
        address: SevenBitAddress,
        word: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.done.arm().map_err(|_| Error::Busy)?;
        match self
            .transaction
            .begin_write(&mut self.hardware, address, word, data)
        {
            Ok(()) => Ok(()),
            Err(err) => self.disarm(err),
        }
    }

    /// Start a read of `len` bytes from word address `word`.
    ///
    /// # Errors
    ///
    /// [`Error::Busy`] while another transfer is in flight,
    /// [`Error::InvalidLength`] for a zero or oversized length.
    pub fn start_read(
        &mut self,
        address: SevenBitAddress,
        word: u8,
        len: usize,
    ) -> Result<(), Error> {
        self.done.arm().map_err(|_| Error::Busy)?;
        match self
            .transaction
            .begin_read(&mut self.hardware, address, word, len)
        {
            Ok(()) => Ok(()),
            Err(err) => self.disarm(err),
        }
    }

    fn disarm(&mut self, err: Error) -> Result<(), Error> {
        // Busy from the state machine means the completion was out of step;
        // leave it armed so the in-flight transfer can still signal.
        if err != Error::Busy {
            self.done.reset();
        }
        Err(err)
    }

    /// Master interrupt handler body.
    pub fn handle_interrupt(&mut self) {
        self.hardware.clear_interrupts();
        if let Some(result) = self.transaction.service(&mut self.hardware) {
            if result.is_err() {
                self.logger.error("i2c: transfer failed");
            }
            self.done.signal(result.is_ok());
        }
    }

    /// Collect the outcome of a finished transfer and release the
    /// completion for the next one. `None` while still in flight.
    pub fn finish(&mut self) -> Option<Result<(), Error>> {
        self.done.poll()?;
        self.done.reset();
        Some(self.transaction.outcome().unwrap_or(Err(Error::Timeout)))
    }

    /// Tear down the in-flight transfer, releasing the bus.
    pub fn cancel(&mut self) {
        if self.transaction.is_idle() {
            return;
        }
        let _ = self.transaction.abort(&mut self.hardware, Error::Timeout);
        self.done.signal(false);
        self.done.reset();
        self.logger.error("i2c: transfer cancelled, bus released");
    }

    /// Drive the in-flight transfer to completion from the calling context.
    ///
    /// # Errors
    ///
    /// The transfer's own error, or [`Error::Timeout`] if the configured
    /// idle budget ran out; the transfer is cancelled in that case.
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

    /// Write and wait for the device to finish its internal write cycle.
    ///
    /// # Errors
    ///
    /// See [`start_write`](Self::start_write) and [`wait`](Self::wait).
    pub fn write_blocking(
        &mut self,
        address: SevenBitAddress,
        word: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.start_write(address, word, data)?;
        self.wait()
    }

    /// Read `buffer.len()` bytes starting at word address `word`.
    ///
    /// # Errors
    ///
    /// See [`start_read`](Self::start_read) and [`wait`](Self::wait).
    pub fn read_blocking(
        &mut self,
        address: SevenBitAddress,
        word: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.start_read(address, word, buffer.len())?;
        self.wait()?;
        let received = self.received();
        let dst = buffer.get_mut(..received.len()).ok_or(Error::InvalidLength)?;
        dst.copy_from_slice(received);
        Ok(())
    }
}

impl<H: I2cMasterPort, D: DelayNs, L: Logger> embedded_hal::i2c::ErrorType
    for I2cController<'_, H, D, L>
{
    type Error = Error;
}

/// Generic access for drivers written against `embedded-hal`.
///
/// Only the word-addressed shapes map onto the engine: a write whose first
/// byte is the word address, and a one-byte write followed by a read. Every
/// write ends with write-cycle polling.
impl<H: I2cMasterPort, D: DelayNs, L: Logger> embedded_hal::i2c::I2c
    for I2cController<'_, H, D, L>
{
    fn read(&mut self, _addr: SevenBitAddress, _buffer: &mut [u8]) -> Result<(), Self::Error> {
        Err(Error::Unsupported)
    }

    fn write(&mut self, addr: SevenBitAddress, bytes: &[u8]) -> Result<(), Self::Error> {
        match bytes.split_first() {
            Some((word, data)) if !data.is_empty() => self.write_blocking(addr, *word, data),
            _ => Err(Error::Unsupported),
        }
    }

    fn write_read(
        &mut self,
        addr: SevenBitAddress,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Self::Error> {
        match bytes {
            [word] => self.read_blocking(addr, *word, buffer),
            _ => Err(Error::Unsupported),
        }
    }

    fn transaction(
        &mut self,
        addr: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        match operations {
            [Operation::Write(bytes)] => {
                let bytes: &[u8] = bytes;
                embedded_hal::i2c::I2c::write(self, addr, bytes)
            }
            [Operation::Write(bytes), Operation::Read(buffer)] => {
                let bytes: &[u8] = bytes;
                embedded_hal::i2c::I2c::write_read(self, addr, bytes, buffer)
            }
            _ => Err(Error::Unsupported),
        }
    }
}
