// Licensed under the Apache-2.0 license

#![no_std]
#![no_main]

use core::ptr::{read_volatile, write_volatile};

use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;
use embedded_io::Write;
use fugit::HertzU32;
use panic_halt as _;

use stellaris_xfer::common::{cycles_for_ns, WriteLogger};
use stellaris_xfer::completion::Completion;
use stellaris_xfer::gpio::{Lm3sGpioPort, GPIO_PORTA_BASE, GPIO_PORTB_BASE};
use stellaris_xfer::i2c::common::I2cConfig;
use stellaris_xfer::i2c::eeprom::At24c08;
use stellaris_xfer::i2c::i2c_controller::I2cController;
use stellaris_xfer::i2c::lm3s::{Lm3sI2cMaster, I2C0_MASTER_BASE};
use stellaris_xfer::spi::common::SsiConfig;
use stellaris_xfer::spi::flash::{At25f1024, At25fError};
use stellaris_xfer::spi::lm3s::{Lm3sSsi, SSI0_BASE};
use stellaris_xfer::spi::ssi_controller::SsiController;
use stellaris_xfer::uart::{Lm3sUart, UART0_BASE};

/// Main oscillator, used directly as the system clock.
const SYSCLK: HertzU32 = HertzU32::MHz(6);

const RCGC1: usize = 0x400f_e104;
const RCGC2: usize = 0x400f_e108;
const RCGC1_UART0: u32 = 1 << 0;
const RCGC1_SSI0: u32 = 1 << 4;
const RCGC1_I2C0: u32 = 1 << 12;
const RCGC2_GPIOA: u32 = 1 << 0;
const RCGC2_GPIOB: u32 = 1 << 1;

// PA0/PA1 UART0, PA2 SSI clock, PA3 flash chip select, PA4/PA5 SSI data.
const UART_PINS: u8 = 0x03;
const SSI_PINS: u8 = 0x34;
const FLASH_CS_PIN: u8 = 3;
// PB2 SCL, PB3 SDA.
const I2C_PINS: u8 = 0x0c;

static EEPROM_DONE: Completion = Completion::new();
static FLASH_DONE: Completion = Completion::new();

fn enable_clocks() {
    unsafe {
        let rcgc1 = read_volatile(RCGC1 as *const u32);
        write_volatile(RCGC1 as *mut u32, rcgc1 | RCGC1_UART0 | RCGC1_SSI0 | RCGC1_I2C0);
        let rcgc2 = read_volatile(RCGC2 as *const u32);
        write_volatile(RCGC2 as *mut u32, rcgc2 | RCGC2_GPIOA | RCGC2_GPIOB);
    }
    // A few cycles pass before a newly clocked block answers.
    for _ in 0..16 {
        cortex_m::asm::nop();
    }
}

/// Busy-wait delay counted in core clock cycles.
#[derive(Clone, Copy)]
struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        cortex_m::asm::delay(cycles_for_ns(SYSCLK, ns));
    }
}

fn test_eeprom(uart: &mut Lm3sUart) {
    writeln!(uart, "\r\nEEPROM (AT24C08A over I2C)\r").unwrap();
    let hardware = unsafe { Lm3sI2cMaster::new(I2C0_MASTER_BASE, SYSCLK) };
    let mut bus = I2cController::with_logger(
        hardware,
        I2cConfig::default(),
        CycleDelay,
        &EEPROM_DONE,
        WriteLogger::new(uart),
    );
    bus.init();
    let mut rom = At24c08::new(bus);

    let data: [u8; 16] = core::array::from_fn(|i| i as u8);
    let mut back = [0u8; 16];
    let result = rom.write(0, &data).and_then(|()| rom.read(0, &mut back));
    let console = rom.bus().logger.sink();
    match result {
        Ok(()) if back == data => writeln!(console, "Success.\r").unwrap(),
        Ok(()) => writeln!(console, "Data error.\r").unwrap(),
        Err(e) => writeln!(console, "Transfer failed: {e:?}\r").unwrap(),
    }
}

fn test_flash(uart: &mut Lm3sUart, port_a: &mut Lm3sGpioPort) {
    writeln!(uart, "\r\nSerial flash (AT25F1024A over SSI)\r").unwrap();
    let cs = port_a.output_high(FLASH_CS_PIN);
    port_a.set_alternate(SSI_PINS);
    let hardware = unsafe { Lm3sSsi::new(SSI0_BASE, SYSCLK) };
    let mut ssi = SsiController::with_logger(
        hardware,
        cs,
        SsiConfig::default(),
        CycleDelay,
        &FLASH_DONE,
        WriteLogger::new(uart),
    );
    if ssi.init().is_err() {
        writeln!(ssi.logger.sink(), "SSI init failed\r").unwrap();
        return;
    }
    let mut flash = At25f1024::new(ssi);

    let data: [u8; 256] = core::array::from_fn(|i| i as u8);
    let mut back = [0u8; 256];
    let result = flash
        .verify_id()
        .and_then(|()| flash.erase_chip())
        .and_then(|()| flash.write(0, &data))
        .and_then(|()| flash.read(0, &mut back));
    let console = flash.ssi().logger.sink();
    match result {
        Ok(()) if back == data => writeln!(console, "Success.\r").unwrap(),
        Ok(()) => writeln!(console, "Read error.\r").unwrap(),
        Err(At25fError::BadDeviceId(id)) => {
            writeln!(console, "Bad device ID. ({id:#06x})\r").unwrap()
        }
        Err(e) => writeln!(console, "Transfer failed: {e:?}\r").unwrap(),
    }
}

#[entry]
fn main() -> ! {
    enable_clocks();

    let mut port_a = unsafe { Lm3sGpioPort::new(GPIO_PORTA_BASE) };
    let mut port_b = unsafe { Lm3sGpioPort::new(GPIO_PORTB_BASE) };
    port_a.set_alternate(UART_PINS);
    port_b.set_i2c(I2C_PINS);

    let mut uart = unsafe { Lm3sUart::new(UART0_BASE) };
    uart.init(SYSCLK, 115_200);

    writeln!(uart, "\r\nstellaris-xfer demo\r").unwrap();

    // Both engines run driven: the wait loops poll the raw interrupt status
    // and call the handlers themselves, so no vector needs to be routed.
    test_eeprom(&mut uart);
    test_flash(&mut uart, &mut port_a);

    loop {
        cortex_m::asm::wfi();
    }
}
