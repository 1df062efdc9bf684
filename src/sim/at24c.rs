// Licensed under the Apache-2.0 license

//! I2C master with an AT24C08A EEPROM attached.
//!
//! Every command completes instantly and raises the master interrupt. The
//! EEPROM answers to four consecutive addresses (block select), latches its
//! word address on write, wraps page writes, and refuses its address for a
//! configurable number of polls after each write cycle.
//!
//! The data path holds one byte by default, like a single data register: a
//! second put overwrites and a second get repeats. A deeper data path queues
//! bytes instead, and a receive finish fetches that many bytes at once.

use std::collections::VecDeque;

use crate::i2c::common::{BusFault, I2cConfig};
use crate::i2c::traits::{I2cHardwareCore, I2cMasterPort, MasterCommand};
use embedded_hal::i2c::SevenBitAddress;
use std::vec::Vec;

pub const EEPROM_SIZE: usize = 1024;

pub struct SimAt24cBus {
    base: SevenBitAddress,
    memory: [u8; EEPROM_SIZE],
    page_size: usize,
    pointer: usize,
    /// Bytes written in the current send burst, the word address included.
    burst_written: usize,
    write_cycle_naks: u32,
    busy_remaining: u32,
    stalled: bool,
    enabled: bool,
    pending: bool,
    slave: (SevenBitAddress, bool),
    data_depth: usize,
    tx: VecDeque<u8>,
    rx: VecDeque<u8>,
    last_rx: u8,
    fault: Option<BusFault>,
    commands: Vec<MasterCommand>,
    addresses: Vec<(SevenBitAddress, bool)>,
}

impl SimAt24cBus {
    pub fn new(base: SevenBitAddress) -> Self {
        Self {
            base,
            memory: [0xff; EEPROM_SIZE],
            page_size: 16,
            pointer: 0,
            burst_written: 0,
            write_cycle_naks: 0,
            busy_remaining: 0,
            stalled: false,
            enabled: false,
            pending: false,
            slave: (0, false),
            data_depth: 1,
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            last_rx: 0xff,
            fault: None,
            commands: Vec::new(),
            addresses: Vec::new(),
        }
    }

    /// Page size used for write wrap-around. Tests of the raw engine raise it
    /// so a single transaction can cover a long payload.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size;
    }

    /// Address phases NAKed after each completed write.
    pub fn set_busy_naks(&mut self, naks: u32) {
        self.write_cycle_naks = naks;
    }

    /// Bytes the data path buffers in each direction.
    pub fn set_data_depth(&mut self, depth: u8) {
        self.data_depth = usize::from(depth.max(1));
    }

    /// Swallow commands without raising the interrupt.
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    pub fn peek(&self, offset: usize) -> u8 {
        self.memory[offset]
    }

    pub fn commands(&self) -> &[MasterCommand] {
        &self.commands
    }

    /// Slave addresses programmed before each command.
    pub fn addresses(&self) -> &[(SevenBitAddress, bool)] {
        &self.addresses
    }

    fn selects(&self, address: SevenBitAddress) -> Option<usize> {
        if address & 0x7c == self.base {
            Some(usize::from(address & 0x03))
        } else {
            None
        }
    }

    /// Address phase; the EEPROM stays silent while it programs.
    fn address_phase(&mut self, receive: bool) -> Result<usize, BusFault> {
        let (address, direction) = self.slave;
        assert_eq!(direction, receive, "direction does not match command");
        let block = self.selects(address).ok_or(BusFault::AddressNak)?;
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return Err(BusFault::AddressNak);
        }
        Ok(block)
    }

    fn latch_word(&mut self, block: usize) {
        let word = self.tx.pop_front().unwrap_or(0);
        self.pointer = (block << 8) | usize::from(word);
        self.burst_written = 1;
    }

    fn store(&mut self) {
        let Some(byte) = self.tx.pop_front() else {
            return;
        };
        let page = self.pointer - self.pointer % self.page_size;
        let offset = (self.pointer + 1) % self.page_size;
        self.memory[self.pointer % EEPROM_SIZE] = byte;
        self.pointer = page + offset;
        self.burst_written += 1;
    }

    fn fetch(&mut self) {
        if self.rx.len() >= self.data_depth {
            self.rx.pop_front();
        }
        self.rx.push_back(self.memory[self.pointer]);
        self.pointer = (self.pointer + 1) % EEPROM_SIZE;
    }

    fn stop_after_send(&mut self) {
        if self.burst_written > 1 {
            self.busy_remaining = self.write_cycle_naks;
        }
        self.burst_written = 0;
    }

    fn execute(&mut self, command: MasterCommand) -> Result<(), BusFault> {
        match command {
            MasterCommand::SingleSend => {
                let block = self.address_phase(false)?;
                self.latch_word(block);
                self.stop_after_send();
            }
            MasterCommand::BurstSendStart => {
                let block = self.address_phase(false)?;
                self.latch_word(block);
            }
            MasterCommand::BurstSendCont => self.store(),
            MasterCommand::BurstSendFinish => {
                while !self.tx.is_empty() {
                    self.store();
                }
                self.stop_after_send();
            }
            MasterCommand::SingleReceive | MasterCommand::BurstReceiveStart => {
                self.address_phase(true)?;
                self.rx.clear();
                self.fetch();
            }
            MasterCommand::BurstReceiveCont => self.fetch(),
            MasterCommand::BurstReceiveFinish => {
                for _ in 0..self.data_depth {
                    self.fetch();
                }
            }
            MasterCommand::ErrorStop => {
                self.burst_written = 0;
                self.tx.clear();
            }
        }
        Ok(())
    }
}

impl I2cHardwareCore for SimAt24cBus {
    fn init(&mut self, _config: &I2cConfig) {}

    fn enable_interrupts(&mut self) {
        self.enabled = true;
    }

    fn disable_interrupts(&mut self) {
        self.enabled = false;
    }

    fn clear_interrupts(&mut self) {
        self.pending = false;
    }

    fn interrupt_pending(&mut self) -> bool {
        self.enabled && self.pending
    }
}

impl I2cMasterPort for SimAt24cBus {
    fn set_slave_address(&mut self, address: SevenBitAddress, receive: bool) {
        self.slave = (address, receive);
    }

    fn data_put(&mut self, byte: u8) {
        if self.tx.len() >= self.data_depth {
            self.tx.pop_front();
        }
        self.tx.push_back(byte);
    }

    fn data_get(&mut self) -> u8 {
        if let Some(byte) = self.rx.pop_front() {
            self.last_rx = byte;
        }
        self.last_rx
    }

    fn control(&mut self, command: MasterCommand) {
        self.commands.push(command);
        self.addresses.push(self.slave);
        if self.stalled {
            return;
        }
        self.fault = self.execute(command).err();
        self.pending = command != MasterCommand::ErrorStop;
    }

    fn fault(&mut self) -> Option<BusFault> {
        self.fault
    }

    fn data_depth(&self) -> u8 {
        self.data_depth as u8
    }
}
