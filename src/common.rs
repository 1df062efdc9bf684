// Licensed under the Apache-2.0 license

//! Shared plumbing used by both bus engines.
//!
//! Provides the logging seam handed to controllers and the poll budget used
//! by every blocking wait in the crate.

use embedded_hal::delay::DelayNs;
use fugit::{HertzU32, MicrosDurationU32};

/// Minimal logging sink.
///
/// Controllers take a logger as a type parameter defaulting to [`NoOpLogger`]
/// so that firmware without a console pays nothing for it.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Logger that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Logger writing one line per message to any `embedded_io` byte sink,
/// typically a UART.
pub struct WriteLogger<W: embedded_io::Write> {
    sink: W,
}

impl<W: embedded_io::Write> WriteLogger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// The underlying sink, for output that is not a log line.
    pub fn sink(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Give back the underlying sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    fn line(&mut self, level: &[u8], msg: &str) {
        // Best effort.
        let _ = self.sink.write_all(level);
        let _ = self.sink.write_all(msg.as_bytes());
        let _ = self.sink.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for WriteLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.line(b"[debug] ", msg);
    }

    fn error(&mut self, msg: &str) {
        self.line(b"[error] ", msg);
    }
}

/// Time budget for a polling loop.
///
/// `None` waits forever. Any configured limit turns a stalled bus into a
/// reported timeout.
#[derive(Clone, Copy, Debug)]
pub struct PollBudget {
    limit_us: Option<u32>,
    interval_us: u32,
    elapsed_us: u32,
}

impl PollBudget {
    #[must_use]
    pub fn new(limit: Option<MicrosDurationU32>, interval_us: u32) -> Self {
        Self {
            limit_us: limit.map(|d| d.ticks()),
            interval_us: interval_us.max(1),
            elapsed_us: 0,
        }
    }

    /// Sleep one poll interval and charge it to the budget.
    ///
    /// Returns `false` once the budget is spent.
    pub fn idle<D: DelayNs>(&mut self, delay: &mut D) -> bool {
        if self.is_exhausted() {
            return false;
        }
        delay.delay_us(self.interval_us);
        self.elapsed_us = self.elapsed_us.saturating_add(self.interval_us);
        !self.is_exhausted()
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        match self.limit_us {
            Some(limit) => self.elapsed_us >= limit,
            None => false,
        }
    }

    #[must_use]
    pub const fn elapsed_us(&self) -> u32 {
        self.elapsed_us
    }
}

/// System clock cycles covering `ns` nanoseconds, rounded up and saturated.
///
/// Cycle-counting delays use this so that poll intervals and timeouts keep
/// their wall-clock meaning at any core clock.
#[must_use]
pub const fn cycles_for_ns(sysclk: HertzU32, ns: u32) -> u32 {
    let cycles = (ns as u64 * sysclk.raw() as u64).div_ceil(1_000_000_000);
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}
