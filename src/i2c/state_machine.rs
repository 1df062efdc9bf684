// Licensed under the Apache-2.0 license

//! Interrupt-driven I2C master transaction state machine.
//!
//! One [`I2cTransaction`] tracks a single in-flight write or read against a
//! word-addressed device such as an AT24C08A EEPROM. The mainline arms it
//! with [`begin_write`](I2cTransaction::begin_write) or
//! [`begin_read`](I2cTransaction::begin_read); after that only
//! [`service`](I2cTransaction::service), called once per master interrupt,
//! moves it forward.
//!
//! ## Lookahead
//!
//! The master shifts a byte out of (or into) its data register while the
//! next command is being prepared, so the command that ends a burst has to be
//! issued `pipeline_depth` bytes before the burst actually ends. With the
//! single data register of the Stellaris master that means:
//!
//! - a write switches to `WriteFinal` when one payload byte is left,
//! - a read switches to `ReadFinal` when two bytes are still outstanding.
//!
//! Getting either threshold wrong corrupts or duplicates the last byte. A
//! depth above one needs a port whose data path buffers that many bytes
//! (see [`I2cMasterPort::data_depth`]); otherwise the transfer is refused.
//!
//! ## Write-cycle polling
//!
//! After the final byte of a write the EEPROM goes deaf while it programs
//! its array. The machine keeps issuing single-byte reads (`SendAck`) and
//! inspecting the result (`WaitAck`) until the device acknowledges again.
//! A NAK in `WaitAck` takes the explicit `WaitAck -> SendAck` edge; any other
//! fault aborts the transaction.

use crate::descriptor::TransferDescriptor;
use crate::i2c::common::{BusFault, Error};
use crate::i2c::traits::{I2cMasterPort, MasterCommand};
use embedded_hal::i2c::SevenBitAddress;

/// Largest single I2C transaction the engine stages.
pub const I2C_MAX_TRANSFER: usize = 256;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum I2cState {
    Idle,
    WriteNext,
    WriteFinal,
    WaitAck,
    SendAck,
    ReadOne,
    ReadFirst,
    ReadNext,
    ReadFinal,
    ReadWait,
}

impl I2cState {
    /// States in which a send or receive burst is holding the bus open.
    const fn burst_open(self) -> bool {
        matches!(
            self,
            I2cState::WriteNext | I2cState::WriteFinal | I2cState::ReadNext | I2cState::ReadFinal
        )
    }
}

pub struct I2cTransaction {
    state: I2cState,
    desc: TransferDescriptor<I2C_MAX_TRANSFER>,
    address: SevenBitAddress,
    depth: usize,
    ack_polls: u32,
    ack_poll_limit: Option<u32>,
    outcome: Option<Result<(), Error>>,
}

impl I2cTransaction {
    #[must_use]
    pub const fn new(pipeline_depth: u8, ack_poll_limit: Option<u32>) -> Self {
        let depth = if pipeline_depth == 0 { 1 } else { pipeline_depth as usize };
        Self {
            state: I2cState::Idle,
            desc: TransferDescriptor::new(),
            address: 0,
            depth,
            ack_polls: 0,
            ack_poll_limit,
            outcome: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> I2cState {
        self.state
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state == I2cState::Idle
    }

    /// Write-cycle polls issued by the current or last write.
    #[must_use]
    pub const fn ack_polls(&self) -> u32 {
        self.ack_polls
    }

    #[must_use]
    pub const fn descriptor(&self) -> &TransferDescriptor<I2C_MAX_TRANSFER> {
        &self.desc
    }

    /// Result of the last finished transaction.
    #[must_use]
    pub const fn outcome(&self) -> Option<Result<(), Error>> {
        self.outcome
    }

    /// Arm a burst write of `data` starting at word address `word`.
    ///
    /// The word address goes out as the first byte of the burst; the rest is
    /// sent by the interrupt handler, followed by write-cycle polling.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if a transaction is in flight.
    /// - [`Error::InvalidLength`] if `data` is empty or too large.
    /// - [`Error::Unsupported`] if the port cannot buffer the pipeline depth.
    pub fn begin_write<P: I2cMasterPort>(
        &mut self,
        port: &mut P,
        address: SevenBitAddress,
        word: u8,
        data: &[u8],
    ) -> Result<(), Error> {
        self.prepare(port, address)?;
        if data.is_empty() {
            return Err(Error::InvalidLength);
        }
        self.desc.load(data, 0).map_err(|_| Error::InvalidLength)?;

        self.state = if data.len() <= self.depth {
            I2cState::WriteFinal
        } else {
            I2cState::WriteNext
        };

        port.set_slave_address(address, false);
        port.data_put(word);
        port.control(MasterCommand::BurstSendStart);
        Ok(())
    }

    /// Arm a read of `len` bytes starting at word address `word`.
    ///
    /// A single-byte dummy write positions the device's address counter;
    /// the receive chain runs from the interrupt handler.
    ///
    /// # Errors
    ///
    /// - [`Error::Busy`] if a transaction is in flight.
    /// - [`Error::InvalidLength`] if `len` is zero or too large.
    /// - [`Error::Unsupported`] if the port cannot buffer the pipeline depth.
    pub fn begin_read<P: I2cMasterPort>(
        &mut self,
        port: &mut P,
        address: SevenBitAddress,
        word: u8,
        len: usize,
    ) -> Result<(), Error> {
        self.prepare(port, address)?;
        if len == 0 {
            return Err(Error::InvalidLength);
        }
        self.desc.load(&[], len).map_err(|_| Error::InvalidLength)?;

        self.state = if len == 1 {
            I2cState::ReadOne
        } else {
            I2cState::ReadFirst
        };

        port.set_slave_address(address, false);
        port.data_put(word);
        port.control(MasterCommand::SingleSend);
        Ok(())
    }

    fn prepare<P: I2cMasterPort>(
        &mut self,
        port: &P,
        address: SevenBitAddress,
    ) -> Result<(), Error> {
        if self.state != I2cState::Idle {
            return Err(Error::Busy);
        }
        if self.depth > usize::from(port.data_depth().max(1)) {
            return Err(Error::Unsupported);
        }
        self.address = address;
        self.ack_polls = 0;
        self.outcome = None;
        Ok(())
    }

    /// Advance the machine by one master interrupt.
    ///
    /// Returns `Some(result)` exactly once per transaction, on the interrupt
    /// that finishes it.
    pub fn service<P: I2cMasterPort>(&mut self, port: &mut P) -> Option<Result<(), Error>> {
        match self.state {
            I2cState::Idle => return None,
            // A NAK is the expected answer while the device is programming.
            I2cState::WaitAck => {}
            _ => {
                if let Some(fault) = port.fault() {
                    return Some(self.abort(port, fault.into()));
                }
            }
        }

        match self.state {
            I2cState::Idle => None,
            I2cState::WriteNext => {
                if let Some(byte) = self.desc.next_out() {
                    port.data_put(byte);
                }
                port.control(MasterCommand::BurstSendCont);
                if self.desc.out_count() <= self.depth {
                    self.state = I2cState::WriteFinal;
                }
                None
            }
            I2cState::WriteFinal => {
                while let Some(byte) = self.desc.next_out() {
                    port.data_put(byte);
                }
                port.control(MasterCommand::BurstSendFinish);
                self.state = I2cState::SendAck;
                None
            }
            I2cState::WaitAck => match port.fault() {
                None => {
                    let _ = port.data_get();
                    Some(self.finish(Ok(())))
                }
                Some(BusFault::ArbitrationLost) => Some(self.abort(port, Error::ArbitrationLoss)),
                Some(BusFault::AddressNak | BusFault::DataNak) => self.send_ack_poll(port),
            },
            I2cState::SendAck => self.send_ack_poll(port),
            I2cState::ReadOne => {
                port.set_slave_address(self.address, true);
                port.control(MasterCommand::SingleReceive);
                self.state = I2cState::ReadWait;
                None
            }
            I2cState::ReadFirst => {
                port.set_slave_address(self.address, true);
                port.control(MasterCommand::BurstReceiveStart);
                self.state = self.next_read_state();
                None
            }
            I2cState::ReadNext => {
                self.desc.store_in(port.data_get());
                port.control(MasterCommand::BurstReceiveCont);
                self.state = self.next_read_state();
                None
            }
            I2cState::ReadFinal => {
                self.desc.store_in(port.data_get());
                port.control(MasterCommand::BurstReceiveFinish);
                self.state = I2cState::ReadWait;
                None
            }
            I2cState::ReadWait => {
                while self.desc.in_count() > 0 {
                    self.desc.store_in(port.data_get());
                }
                Some(self.finish(Ok(())))
            }
        }
    }

    /// Stay in the burst until only the pipelined bytes plus the one the
    /// finish command fetches remain.
    fn next_read_state(&self) -> I2cState {
        if self.desc.in_count() <= self.depth + 1 {
            I2cState::ReadFinal
        } else {
            I2cState::ReadNext
        }
    }

    fn send_ack_poll<P: I2cMasterPort>(&mut self, port: &mut P) -> Option<Result<(), Error>> {
        if let Some(limit) = self.ack_poll_limit {
            if self.ack_polls >= limit {
                return Some(self.abort(port, Error::Timeout));
            }
        }
        self.ack_polls += 1;
        port.set_slave_address(self.address, true);
        port.control(MasterCommand::SingleReceive);
        self.state = I2cState::WaitAck;
        None
    }

    /// Tear the transaction down and record `error` as its outcome.
    ///
    /// Releases the bus with an error STOP if a burst is still open. Calling
    /// this on an idle machine is a no-op that returns `Ok(())`.
    pub fn abort<P: I2cMasterPort>(&mut self, port: &mut P, error: Error) -> Result<(), Error> {
        if self.state == I2cState::Idle {
            return Ok(());
        }
        if self.state.burst_open() {
            port.control(MasterCommand::ErrorStop);
        }
        self.finish(Err(error))
    }

    fn finish(&mut self, result: Result<(), Error>) -> Result<(), Error> {
        self.state = I2cState::Idle;
        self.outcome = Some(result);
        result
    }
}
