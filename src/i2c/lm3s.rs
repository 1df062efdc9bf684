// Licensed under the Apache-2.0 license

//! Register-level adapter for the Stellaris LM3S I2C master.

use crate::i2c::common::{BusFault, I2cConfig};
use crate::i2c::traits::{I2cHardwareCore, I2cMasterPort, MasterCommand};
use crate::mmio::RegisterBlock;
use embedded_hal::i2c::SevenBitAddress;
use fugit::HertzU32;

/// I2C0 master block.
pub const I2C0_MASTER_BASE: usize = 0x4002_0000;

const MSA: usize = 0x00;
const MCS: usize = 0x04;
const MDR: usize = 0x08;
const MTPR: usize = 0x0c;
const MIMR: usize = 0x10;
const MMIS: usize = 0x18;
const MICR: usize = 0x1c;
const MCR: usize = 0x20;

const MCR_MFE: u32 = 0x10;
const MIMR_IM: u32 = 0x1;
const MMIS_MIS: u32 = 0x1;
const MICR_IC: u32 = 0x1;

// MCS read side
const MCS_BUSY: u32 = 0x01;
const MCS_ERROR: u32 = 0x02;
const MCS_ADRACK: u32 = 0x04;
const MCS_ARBLST: u32 = 0x10;

// MCS write side
const MCS_RUN: u32 = 0x01;
const MCS_START: u32 = 0x02;
const MCS_STOP: u32 = 0x04;
const MCS_ACK: u32 = 0x08;

impl MasterCommand {
    const fn mcs(self) -> u32 {
        match self {
            MasterCommand::SingleSend | MasterCommand::SingleReceive => {
                MCS_START | MCS_RUN | MCS_STOP
            }
            MasterCommand::BurstSendStart => MCS_START | MCS_RUN,
            MasterCommand::BurstSendCont => MCS_RUN,
            MasterCommand::BurstSendFinish | MasterCommand::BurstReceiveFinish => {
                MCS_RUN | MCS_STOP
            }
            MasterCommand::BurstReceiveStart => MCS_ACK | MCS_START | MCS_RUN,
            MasterCommand::BurstReceiveCont => MCS_ACK | MCS_RUN,
            MasterCommand::ErrorStop => MCS_STOP,
        }
    }
}

/// SCL timer period for the requested bus speed: twenty system clocks per
/// timer tick, rounded up so the bus never runs faster than asked.
#[must_use]
pub const fn timer_period(sysclk: HertzU32, scl: HertzU32) -> u32 {
    let clk = sysclk.raw();
    let per_tick = 20 * scl.raw();
    let ticks = (clk + per_tick - 1) / per_tick;
    if ticks == 0 {
        0
    } else {
        ticks - 1
    }
}

pub struct Lm3sI2cMaster {
    regs: RegisterBlock,
    sysclk: HertzU32,
}

impl Lm3sI2cMaster {
    /// # Safety
    ///
    /// `base` must be an LM3S I2C master block whose clock is enabled, owned
    /// exclusively by the returned adapter.
    #[must_use]
    pub const unsafe fn new(base: usize, sysclk: HertzU32) -> Self {
        Self {
            regs: RegisterBlock::new(base),
            sysclk,
        }
    }
}

impl I2cHardwareCore for Lm3sI2cMaster {
    fn init(&mut self, config: &I2cConfig) {
        self.regs.modify(MCR, |v| v | MCR_MFE);
        self.regs
            .write(MTPR, timer_period(self.sysclk, config.speed.rate()));
    }

    fn enable_interrupts(&mut self) {
        self.regs.write(MIMR, MIMR_IM);
    }

    fn disable_interrupts(&mut self) {
        self.regs.write(MIMR, 0);
    }

    fn clear_interrupts(&mut self) {
        self.regs.write(MICR, MICR_IC);
    }

    fn interrupt_pending(&mut self) -> bool {
        self.regs.read(MMIS) & MMIS_MIS != 0
    }
}

impl I2cMasterPort for Lm3sI2cMaster {
    fn set_slave_address(&mut self, address: SevenBitAddress, receive: bool) {
        self.regs
            .write(MSA, (u32::from(address & 0x7f) << 1) | u32::from(receive));
    }

    fn data_put(&mut self, byte: u8) {
        self.regs.write(MDR, u32::from(byte));
    }

    fn data_get(&mut self) -> u8 {
        (self.regs.read(MDR) & 0xff) as u8
    }

    fn control(&mut self, command: MasterCommand) {
        self.regs.write(MCS, command.mcs());
    }

    fn fault(&mut self) -> Option<BusFault> {
        let status = self.regs.read(MCS);
        // Error bits are stale until the controller goes idle.
        if status & MCS_BUSY != 0 || status & MCS_ERROR == 0 {
            None
        } else if status & MCS_ARBLST != 0 {
            Some(BusFault::ArbitrationLost)
        } else if status & MCS_ADRACK != 0 {
            Some(BusFault::AddressNak)
        } else {
            Some(BusFault::DataNak)
        }
    }
}
