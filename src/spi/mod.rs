// Licensed under the Apache-2.0 license

//! Stellaris LM3S SSI master driver module.
//!
//! The interrupt-driven full-duplex transfer engine, its controller with a
//! GPIO chip select, the register-level adapter, and the AT25F1024A serial
//! flash driver with an `embedded-storage` adapter on top.

pub mod block_device_adapter;
pub mod common;
pub mod flash;
pub mod lm3s;
pub mod norflash;
pub mod ssi_controller;
pub mod traits;
pub mod transfer;
