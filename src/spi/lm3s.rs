// Licensed under the Apache-2.0 license

//! Register-level adapter for the Stellaris LM3S SSI port in master mode.

use core::convert::Infallible;

use embedded_hal::spi::{Phase, Polarity};
use fugit::HertzU32;

use crate::mmio::RegisterBlock;
use crate::spi::common::{SsiConfig, SSI_RXOR, SSI_RXTO};
use crate::spi::traits::{SsiFifo, SsiHardwareCore};

/// SSI0 block.
pub const SSI0_BASE: usize = 0x4000_8000;

const CR0: usize = 0x00;
const CR1: usize = 0x04;
const DR: usize = 0x08;
const SR: usize = 0x0c;
const CPSR: usize = 0x10;
const IM: usize = 0x14;
const MIS: usize = 0x1c;
const ICR: usize = 0x20;

const CR0_SPO: u32 = 0x40;
const CR0_SPH: u32 = 0x80;
const CR1_SSE: u32 = 0x02;

const SR_TNF: u32 = 0x02;
const SR_RNE: u32 = 0x04;

const MAX_PRESCALE: u32 = 254;
const MAX_SCR: u32 = 255;

/// Even prescaler and serial clock rate giving the fastest bit rate not
/// above `rate`.
#[must_use]
pub const fn clock_dividers(sysclk: HertzU32, rate: HertzU32) -> (u32, u32) {
    let max_divide = if rate.raw() == 0 {
        u32::MAX
    } else {
        sysclk.raw() / rate.raw()
    };
    let mut prescale = 0;
    let mut scr;
    loop {
        prescale += 2;
        scr = (max_divide / prescale).saturating_sub(1);
        if scr <= MAX_SCR || prescale >= MAX_PRESCALE {
            break;
        }
    }
    if scr > MAX_SCR {
        scr = MAX_SCR;
    }
    (prescale, scr)
}

pub struct Lm3sSsi {
    regs: RegisterBlock,
    sysclk: HertzU32,
}

impl Lm3sSsi {
    /// # Safety
    ///
    /// `base` must be an LM3S SSI block whose clock is enabled and whose
    /// pins are muxed, owned exclusively by the returned adapter.
    #[must_use]
    pub const unsafe fn new(base: usize, sysclk: HertzU32) -> Self {
        Self {
            regs: RegisterBlock::new(base),
            sysclk,
        }
    }
}

impl SsiHardwareCore for Lm3sSsi {
    fn init(&mut self, config: &SsiConfig) {
        self.regs.write(CR1, 0);
        let (prescale, scr) = clock_dividers(self.sysclk, config.bit_rate);
        self.regs.write(CPSR, prescale);

        let mut cr0 = (scr << 8) | u32::from(config.data_width.saturating_sub(1) & 0x0f);
        if config.mode.polarity == Polarity::IdleHigh {
            cr0 |= CR0_SPO;
        }
        if config.mode.phase == Phase::CaptureOnSecondTransition {
            cr0 |= CR0_SPH;
        }
        self.regs.write(CR0, cr0);
        self.regs.write(CR1, CR1_SSE);
    }

    fn enable_interrupts(&mut self, mask: u32) {
        self.regs.modify(IM, |v| v | mask);
    }

    fn disable_interrupts(&mut self, mask: u32) {
        self.regs.modify(IM, |v| v & !mask);
    }

    fn clear_interrupts(&mut self, mask: u32) {
        // Only the latched sources have clear bits.
        self.regs.write(ICR, mask & (SSI_RXTO | SSI_RXOR));
    }

    fn masked_interrupt_status(&mut self) -> u32 {
        self.regs.read(MIS)
    }
}

impl SsiFifo for Lm3sSsi {
    fn write_fifo(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.regs.read(SR) & SR_TNF == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.regs.write(DR, u32::from(byte));
        Ok(())
    }

    fn read_fifo(&mut self) -> nb::Result<u8, Infallible> {
        if self.regs.read(SR) & SR_RNE == 0 {
            return Err(nb::Error::WouldBlock);
        }
        Ok((self.regs.read(DR) & 0xff) as u8)
    }
}
