// Licensed under the Apache-2.0 license

//! Polled LM3S UART transmitter used as a console.

use core::convert::Infallible;

use fugit::HertzU32;

use crate::mmio::RegisterBlock;

pub const UART0_BASE: usize = 0x4000_c000;

const DR: usize = 0x00;
const FR: usize = 0x18;
const IBRD: usize = 0x24;
const FBRD: usize = 0x28;
const LCRH: usize = 0x2c;
const CTL: usize = 0x30;

const FR_BUSY: u32 = 0x08;
const FR_TXFF: u32 = 0x20;
const LCRH_FEN: u32 = 0x10;
const LCRH_WLEN_8: u32 = 0x60;
const CTL_UARTEN: u32 = 0x001;
const CTL_TXE: u32 = 0x100;
const CTL_RXE: u32 = 0x200;

/// Integer and 6-bit fractional baud divisors, rounded to nearest.
#[must_use]
pub const fn baud_divisors(sysclk: HertzU32, baud: u32) -> (u32, u32) {
    if baud == 0 {
        return (0, 0);
    }
    let div = (sysclk.raw() * 8 / baud).div_ceil(2);
    (div / 64, div % 64)
}

pub struct Lm3sUart {
    regs: RegisterBlock,
}

impl Lm3sUart {
    /// # Safety
    ///
    /// `base` must be an LM3S UART block with its clock enabled, owned
    /// exclusively by the returned value.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: RegisterBlock::new(base),
        }
    }

    /// 8N1 with FIFOs enabled.
    pub fn init(&mut self, sysclk: HertzU32, baud: u32) {
        self.regs.write(CTL, 0);
        let (integer, fraction) = baud_divisors(sysclk, baud);
        self.regs.write(IBRD, integer);
        self.regs.write(FBRD, fraction);
        self.regs.write(LCRH, LCRH_WLEN_8 | LCRH_FEN);
        self.regs.write(CTL, CTL_UARTEN | CTL_TXE | CTL_RXE);
    }

    fn put(&mut self, byte: u8) {
        while self.regs.read(FR) & FR_TXFF != 0 {
            core::hint::spin_loop();
        }
        self.regs.write(DR, u32::from(byte));
    }
}

impl embedded_io::ErrorType for Lm3sUart {
    type Error = Infallible;
}

impl embedded_io::Write for Lm3sUart {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for byte in buf {
            self.put(*byte);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        while self.regs.read(FR) & FR_BUSY != 0 {
            core::hint::spin_loop();
        }
        Ok(())
    }
}
