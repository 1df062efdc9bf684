// Licensed under the Apache-2.0 license

//! Host-side bus simulators used by the unit tests.
//!
//! Each simulator implements the same adapter traits as the register-level
//! drivers, with a device model attached to the far end of the bus.

pub mod at24c;
pub mod at25f;
pub mod mmio;
