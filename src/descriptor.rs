// Licensed under the Apache-2.0 license

//! Transfer descriptor shared by the I2C and SSI engines.
//!
//! The descriptor is staged by the mainline right before a transfer is
//! armed and is then consumed exclusively by the interrupt handler. It owns
//! its buffers so a controller holding it can live in a `static` next to the
//! interrupt handler.
//!
//! On a bidirectional shift-register bus every clocked byte moves in both
//! directions, so [`TransferDescriptor::load_balanced`] pads the shorter side:
//! zero bytes on transmit, discarded reads on receive.

use heapless::Vec;

/// Largest payload the engines stage in one transfer: a 256-byte flash page
/// plus its four command/address bytes.
pub const MAX_TRANSFER: usize = 260;

/// The payload does not fit into the descriptor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CapacityExceeded;

/// How a received byte was accounted for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Received {
    /// Stored into the receive buffer.
    Data,
    /// Discarded as padding.
    Pad,
    /// Nothing was expected; the byte is dropped.
    Unexpected,
}

#[derive(Debug)]
pub struct TransferDescriptor<const N: usize = MAX_TRANSFER> {
    out: Vec<u8, N>,
    out_pos: usize,
    out_pad: usize,
    input: Vec<u8, N>,
    in_count: usize,
    in_pad: usize,
}

impl<const N: usize> Default for TransferDescriptor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TransferDescriptor<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            out: Vec::new(),
            out_pos: 0,
            out_pad: 0,
            input: Vec::new(),
            in_count: 0,
            in_pad: 0,
        }
    }

    /// Stage `out` for transmission and expect `in_len` bytes back, without
    /// any padding. Used by addressed buses where direction is sequenced by
    /// the protocol.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] if either side is larger than `N`.
    pub fn load(&mut self, out: &[u8], in_len: usize) -> Result<(), CapacityExceeded> {
        if in_len > N {
            return Err(CapacityExceeded);
        }
        self.clear();
        self.out.extend_from_slice(out).map_err(|()| CapacityExceeded)?;
        self.in_count = in_len;
        Ok(())
    }

    /// Stage a full-duplex transfer and pad the shorter direction so that
    /// the number of bytes clocked out equals the number clocked in.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityExceeded`] if either side is larger than `N`.
    pub fn load_balanced(&mut self, out: &[u8], in_len: usize) -> Result<(), CapacityExceeded> {
        self.load(out, in_len)?;
        if in_len > out.len() {
            self.out_pad = in_len - out.len();
            self.in_pad = 0;
        } else {
            self.out_pad = 0;
            self.in_pad = out.len() - in_len;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.out.clear();
        self.out_pos = 0;
        self.out_pad = 0;
        self.input.clear();
        self.in_count = 0;
        self.in_pad = 0;
    }

    /// Real payload bytes still to transmit.
    #[must_use]
    pub fn out_count(&self) -> usize {
        self.out.len().saturating_sub(self.out_pos)
    }

    #[must_use]
    pub const fn out_pad(&self) -> usize {
        self.out_pad
    }

    /// Real bytes still to receive.
    #[must_use]
    pub const fn in_count(&self) -> usize {
        self.in_count
    }

    #[must_use]
    pub const fn in_pad(&self) -> usize {
        self.in_pad
    }

    /// Bytes (payload and padding) not yet handed to the transmitter.
    #[must_use]
    pub fn pending_out(&self) -> usize {
        self.out_count() + self.out_pad
    }

    /// Bytes (payload and padding) not yet taken from the receiver.
    #[must_use]
    pub fn pending_in(&self) -> usize {
        self.in_count + self.in_pad
    }

    /// All four counters are zero.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending_out() == 0 && self.pending_in() == 0
    }

    /// Take the next real payload byte.
    pub fn next_out(&mut self) -> Option<u8> {
        let byte = self.out.get(self.out_pos).copied()?;
        self.out_pos += 1;
        Some(byte)
    }

    /// The byte the transmitter should send next: payload first, then zero
    /// padding. Does not consume it; call [`advance_out`](Self::advance_out)
    /// once the hardware accepted the byte.
    #[must_use]
    pub fn peek_out(&self) -> Option<u8> {
        match self.out.get(self.out_pos) {
            Some(byte) => Some(*byte),
            None if self.out_pad > 0 => Some(0),
            None => None,
        }
    }

    pub fn advance_out(&mut self) {
        if self.out_pos < self.out.len() {
            self.out_pos += 1;
        } else {
            self.out_pad = self.out_pad.saturating_sub(1);
        }
    }

    /// Account for one byte taken from the receiver.
    pub fn store_in(&mut self, byte: u8) -> Received {
        if self.in_count > 0 {
            if self.input.push(byte).is_err() {
                return Received::Unexpected;
            }
            self.in_count -= 1;
            Received::Data
        } else if self.in_pad > 0 {
            self.in_pad -= 1;
            Received::Pad
        } else {
            Received::Unexpected
        }
    }

    /// Real bytes received so far, in bus order.
    #[must_use]
    pub fn received(&self) -> &[u8] {
        &self.input
    }
}
