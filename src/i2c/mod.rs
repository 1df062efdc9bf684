// Licensed under the Apache-2.0 license

//! Stellaris LM3S I2C master driver module.
//!
//! This module provides the interrupt-driven transaction engine for
//! word-addressed I2C devices, the register-level adapter for the LM3S
//! master, and the AT24C08A EEPROM driver built on top of them.

pub mod common;
pub mod eeprom;
pub mod i2c_controller;
pub mod lm3s;
pub mod state_machine;
pub mod traits;
