// Licensed under the Apache-2.0 license

//! SSI master with an AT25F1024A serial flash attached.
//!
//! The master models the 8-frame transmit and receive FIFOs with their
//! half-full/half-empty triggers, a receive timeout and receive overrun. One
//! frame is clocked each time the driven wait loop asks whether an interrupt
//! is pending, so FIFO levels evolve the way they would between interrupts
//! on silicon. The flash model sits behind the chip select pin, which is a
//! separate object sharing the model.

use core::cell::RefCell;
use core::convert::Infallible;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use crate::spi::common::{SsiConfig, SSI_FIFO_DEPTH, SSI_RXFF, SSI_RXOR, SSI_RXTO, SSI_TXFF};
use crate::spi::flash::{
    AT25F_CAPACITY, AT25F_PAGE_SIZE, AT25F_SECTOR_SIZE, CMD_CHIP_ERASE, CMD_PROGRAM, CMD_RDID,
    CMD_RDSR, CMD_READ, CMD_SECTOR_ERASE, CMD_WRDI, CMD_WREN, CMD_WRSR, STATUS_BUSY, STATUS_WEL,
};
use crate::spi::traits::{SsiFifo, SsiHardwareCore};

pub struct At25fModel {
    memory: Vec<u8>,
    id: [u8; 2],
    selected: bool,
    frame: Vec<u8>,
    write_enabled: bool,
    protect: u8,
    busy_remaining: u32,
    busy_polls: u32,
    commands: Vec<u8>,
}

impl At25fModel {
    pub fn new() -> Self {
        Self {
            memory: std::vec![0xff; AT25F_CAPACITY],
            id: [0x1f, 0x60],
            selected: false,
            frame: Vec::new(),
            write_enabled: false,
            protect: 0,
            busy_remaining: 0,
            busy_polls: 0,
            commands: Vec::new(),
        }
    }

    pub fn set_id(&mut self, id: [u8; 2]) {
        self.id = id;
    }

    /// Status reads answered with the busy bit set after each program or
    /// erase.
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_write_enabled(&self) -> bool {
        self.write_enabled
    }

    /// Opcode of every frame, in order.
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    fn status(&self) -> u8 {
        let mut status = self.protect;
        if self.write_enabled {
            status |= STATUS_WEL;
        }
        if self.busy_remaining > 0 {
            status |= STATUS_BUSY;
        }
        status
    }

    fn address(&self) -> usize {
        let a = |i: usize| usize::from(self.frame[i]);
        ((a(1) << 16) | (a(2) << 8) | a(3)) % AT25F_CAPACITY
    }

    fn select(&mut self) {
        self.selected = true;
        self.frame.clear();
    }

    fn deselect(&mut self) {
        if !self.selected {
            return;
        }
        self.selected = false;
        let Some(&command) = self.frame.first() else {
            return;
        };
        self.commands.push(command);
        if self.busy_remaining > 0 {
            return;
        }
        match command {
            CMD_WREN => self.write_enabled = true,
            CMD_WRDI => self.write_enabled = false,
            CMD_WRSR if self.write_enabled && self.frame.len() >= 2 => {
                self.protect = self.frame[1] & 0x8c;
                self.write_enabled = false;
            }
            CMD_PROGRAM if self.write_enabled && self.frame.len() > 4 => {
                let start = self.address();
                let page = start - start % AT25F_PAGE_SIZE;
                for (i, byte) in self.frame[4..].iter().enumerate() {
                    let at = page + (start + i) % AT25F_PAGE_SIZE;
                    self.memory[at] &= *byte;
                }
                self.start_internal_cycle();
            }
            CMD_SECTOR_ERASE if self.write_enabled && self.frame.len() >= 4 => {
                let start = self.address() - self.address() % AT25F_SECTOR_SIZE;
                self.memory[start..start + AT25F_SECTOR_SIZE].fill(0xff);
                self.start_internal_cycle();
            }
            CMD_CHIP_ERASE if self.write_enabled => {
                self.memory.fill(0xff);
                self.start_internal_cycle();
            }
            _ => {}
        }
    }

    fn start_internal_cycle(&mut self) {
        self.write_enabled = false;
        self.busy_remaining = self.busy_polls;
    }

    /// Shift one frame in and the reply out.
    fn exchange(&mut self, byte: u8) -> u8 {
        if !self.selected {
            return 0xff;
        }
        let pos = self.frame.len();
        self.frame.push(byte);
        let Some(&command) = self.frame.first() else {
            return 0xff;
        };
        if pos == 0 {
            return 0xff;
        }
        match command {
            CMD_RDSR => {
                let status = self.status();
                self.busy_remaining = self.busy_remaining.saturating_sub(1);
                status
            }
            _ if self.busy_remaining > 0 => 0xff,
            CMD_RDID => self.id.get(pos - 1).copied().unwrap_or(0xff),
            CMD_READ if pos >= 4 => self.memory[(self.address() + pos - 4) % AT25F_CAPACITY],
            _ => 0xff,
        }
    }
}

/// SSI master side of the simulated bus.
pub struct SimAt25fBus {
    flash: Rc<RefCell<At25fModel>>,
    tx: VecDeque<u8>,
    rx: VecDeque<u8>,
    mask: u32,
    latched: u32,
    config: Option<SsiConfig>,
    stalled: bool,
    clocked: usize,
    max_in_flight: usize,
}

/// Chip select line of the simulated flash, active low.
pub struct SimChipSelect {
    flash: Rc<RefCell<At25fModel>>,
    high: bool,
}

/// Wire a flash model to a fresh master and chip select pin.
pub fn attach(model: At25fModel) -> (SimAt25fBus, SimChipSelect) {
    let flash = Rc::new(RefCell::new(model));
    (
        SimAt25fBus {
            flash: Rc::clone(&flash),
            tx: VecDeque::new(),
            rx: VecDeque::new(),
            mask: 0,
            latched: 0,
            config: None,
            stalled: false,
            clocked: 0,
            max_in_flight: 0,
        },
        SimChipSelect { flash, high: true },
    )
}

impl SimAt25fBus {
    pub fn flash(&self) -> std::cell::RefMut<'_, At25fModel> {
        self.flash.borrow_mut()
    }

    pub fn config(&self) -> Option<SsiConfig> {
        self.config
    }

    /// Frames clocked since the last call.
    pub fn take_clocked(&mut self) -> usize {
        core::mem::take(&mut self.clocked)
    }

    /// Frames sitting in either FIFO.
    pub fn in_flight(&self) -> usize {
        self.tx.len() + self.rx.len()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub fn interrupt_mask(&self) -> u32 {
        self.mask
    }

    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    /// Leave stale frames in the receive FIFO.
    pub fn preload_rx(&mut self, frames: &[u8]) {
        self.rx.extend(frames);
    }

    /// Clock up to `frames` frames without servicing any interrupt.
    pub fn clock(&mut self, frames: usize) {
        for _ in 0..frames {
            self.clock_one();
        }
    }

    fn clock_one(&mut self) {
        let Some(byte) = self.tx.pop_front() else {
            if !self.rx.is_empty() {
                self.latched |= SSI_RXTO;
            }
            return;
        };
        assert!(
            self.flash.borrow().is_selected(),
            "clocking with chip select deasserted"
        );
        let reply = self.flash.borrow_mut().exchange(byte);
        self.clocked += 1;
        if self.rx.len() >= SSI_FIFO_DEPTH {
            self.latched |= SSI_RXOR;
        } else {
            self.rx.push_back(reply);
        }
    }

    fn raw_status(&self) -> u32 {
        let mut status = self.latched;
        if self.tx.len() <= SSI_FIFO_DEPTH / 2 {
            status |= SSI_TXFF;
        }
        if self.rx.len() >= SSI_FIFO_DEPTH / 2 {
            status |= SSI_RXFF;
        }
        status
    }
}

impl SsiHardwareCore for SimAt25fBus {
    fn init(&mut self, config: &SsiConfig) {
        self.config = Some(*config);
    }

    fn enable_interrupts(&mut self, mask: u32) {
        self.mask |= mask;
    }

    fn disable_interrupts(&mut self, mask: u32) {
        self.mask &= !mask;
    }

    fn clear_interrupts(&mut self, mask: u32) {
        self.latched &= !(mask & (SSI_RXTO | SSI_RXOR));
    }

    fn masked_interrupt_status(&mut self) -> u32 {
        self.raw_status() & self.mask
    }

    fn interrupt_pending(&mut self) -> bool {
        if !self.stalled {
            self.clock_one();
        }
        self.masked_interrupt_status() != 0
    }
}

impl SsiFifo for SimAt25fBus {
    fn write_fifo(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.tx.len() >= SSI_FIFO_DEPTH {
            return Err(nb::Error::WouldBlock);
        }
        self.tx.push_back(byte);
        self.max_in_flight = self.max_in_flight.max(self.in_flight());
        Ok(())
    }

    fn read_fifo(&mut self) -> nb::Result<u8, Infallible> {
        self.rx.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

impl embedded_hal::digital::ErrorType for SimChipSelect {
    type Error = Infallible;
}

impl embedded_hal::digital::OutputPin for SimChipSelect {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.high {
            self.flash.borrow_mut().select();
        }
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if !self.high {
            self.flash.borrow_mut().deselect();
        }
        self.high = true;
        Ok(())
    }
}

impl embedded_hal::digital::StatefulOutputPin for SimChipSelect {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}
