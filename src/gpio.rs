// Licensed under the Apache-2.0 license

//! LM3S GPIO port pins.
//!
//! Output pins use the masked data window: the address bits [9:2] select
//! which pins a data access touches, so driving one pin never disturbs the
//! rest of the port.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use crate::mmio::RegisterBlock;

pub const GPIO_PORTA_BASE: usize = 0x4000_4000;
pub const GPIO_PORTB_BASE: usize = 0x4000_5000;

const DIR: usize = 0x400;
const AFSEL: usize = 0x420;
const ODR: usize = 0x50c;
const PUR: usize = 0x510;
const DEN: usize = 0x51c;

/// Register offset of the masked data window for `mask`.
const fn data_offset(mask: u8) -> usize {
    (mask as usize) << 2
}

/// Pin configuration for a whole port.
pub struct Lm3sGpioPort {
    regs: RegisterBlock,
}

impl Lm3sGpioPort {
    /// # Safety
    ///
    /// `base` must be an LM3S GPIO port with its clock enabled. Pins handed
    /// out by this port must not be configured elsewhere.
    #[must_use]
    pub const unsafe fn new(base: usize) -> Self {
        Self {
            regs: RegisterBlock::new(base),
        }
    }

    /// Hand the pins in `mask` to their peripheral function.
    pub fn set_alternate(&mut self, mask: u8) {
        let mask = u32::from(mask);
        self.regs.modify(AFSEL, |v| v | mask);
        self.regs.modify(DEN, |v| v | mask);
    }

    /// Hand the pins in `mask` to the I2C block as open-drain with weak
    /// pull-ups.
    pub fn set_i2c(&mut self, mask: u8) {
        let bits = u32::from(mask);
        self.regs.modify(ODR, |v| v | bits);
        self.regs.modify(PUR, |v| v | bits);
        self.set_alternate(mask);
    }

    /// Configure pin number `pin` as a push-pull output driven high, and
    /// return it.
    #[must_use]
    pub fn output_high(&mut self, pin: u8) -> Lm3sGpioPin {
        let mask = 1u8 << (pin & 0x07);
        let mut out = Lm3sGpioPin {
            regs: self.regs,
            mask,
        };
        out.drive(true);
        let bits = u32::from(mask);
        self.regs.modify(AFSEL, |v| v & !bits);
        self.regs.modify(DIR, |v| v | bits);
        self.regs.modify(DEN, |v| v | bits);
        out
    }
}

/// A single output pin, typically a chip select.
pub struct Lm3sGpioPin {
    regs: RegisterBlock,
    mask: u8,
}

impl Lm3sGpioPin {
    fn drive(&mut self, high: bool) {
        let value = if high { u32::from(self.mask) } else { 0 };
        self.regs.write(data_offset(self.mask), value);
    }
}

impl ErrorType for Lm3sGpioPin {
    type Error = Infallible;
}

impl OutputPin for Lm3sGpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true);
        Ok(())
    }
}

impl StatefulOutputPin for Lm3sGpioPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.regs.read(data_offset(self.mask)) & u32::from(self.mask) != 0)
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}
