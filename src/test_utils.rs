//! Recording fakes for the panel's collaborators
extern crate std;

use core::cell::Cell;
use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin};
use std::rc::Rc;
use std::vec::Vec;

use crate::traits::{CommandTransport, TemperatureSensor, VblankSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

/// Records every packet, counts flushes and answers reads from a table
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub packets: Vec<Vec<u8>>,
    pub flushes: usize,
    pub resets: usize,
    pub fail_writes: bool,
    pub fail_reads: bool,
    pub read_responses: Vec<(u8, Vec<u8>)>,
}

impl FakeTransport {
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.packets.clone()
    }

    pub fn clear(&mut self) {
        self.packets.clear();
        self.flushes = 0;
    }

    pub fn contains(&self, packet: &[u8]) -> bool {
        self.position(packet).is_some()
    }

    pub fn position(&self, packet: &[u8]) -> Option<usize> {
        self.packets.iter().position(|p| p.as_slice() == packet)
    }

    pub fn count(&self, packet: &[u8]) -> usize {
        self.packets.iter().filter(|p| p.as_slice() == packet).count()
    }

    /// Any packet addressed to `register`
    pub fn touched(&self, register: u8) -> bool {
        self.packets.iter().any(|p| p.first() == Some(&register))
    }

    pub fn respond(&mut self, register: u8, bytes: &[u8]) {
        self.read_responses.push((register, bytes.to_vec()));
    }
}

impl CommandTransport for FakeTransport {
    type Error = FakeError;

    fn write(&mut self, packet: &[u8]) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(FakeError);
        }
        self.packets.push(packet.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.fail_writes {
            return Err(FakeError);
        }
        self.flushes += 1;
        Ok(())
    }

    fn read(&mut self, register: u8, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_reads {
            return Err(FakeError);
        }
        let Some((_, bytes)) = self.read_responses.iter().find(|(r, _)| *r == register) else {
            return Ok(0);
        };
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(n)
    }

    fn reset<D: DelayNs>(&mut self, delay: &mut D) -> Result<(), Self::Error> {
        self.resets += 1;
        delay.delay_ms(5);
        Ok(())
    }
}

/// Shared fake monotonic clock, in microseconds
pub type Clock = Rc<Cell<u64>>;

/// Vblank source ticking at a fixed period on a shared clock
#[derive(Debug)]
pub struct FakeVblank {
    pub clock: Clock,
    pub period_us: u64,
    pub waits: usize,
    pub unavailable: bool,
}

impl FakeVblank {
    pub fn new(clock: Clock, period_us: u64) -> Self {
        FakeVblank {
            clock,
            period_us,
            waits: 0,
            unavailable: false,
        }
    }
}

impl VblankSource for FakeVblank {
    type Error = FakeError;

    fn wait_for_next_vblank(&mut self) -> Result<(), Self::Error> {
        if self.unavailable {
            return Err(FakeError);
        }
        self.waits += 1;
        self.clock.set(self.clock.get() + self.period_us);
        Ok(())
    }

    fn now_us(&mut self) -> u64 {
        self.clock.get()
    }
}

/// Delay that only advances the shared clock
#[derive(Debug)]
pub struct FakeDelay {
    pub clock: Clock,
    pub total_us: u64,
}

impl FakeDelay {
    pub fn new(clock: Clock) -> Self {
        FakeDelay { clock, total_us: 0 }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        let us = u64::from(ns).div_ceil(1000);
        self.total_us += us;
        self.clock.set(self.clock.get() + us);
    }
}

/// TE line flipping its level on every read
#[derive(Debug, Default)]
pub struct AlternatingPin {
    high: bool,
}

impl ErrorType for AlternatingPin {
    type Error = Infallible;
}

impl InputPin for AlternatingPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.high = !self.high;
        Ok(self.high)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Sensor returning a settable reading
#[derive(Debug)]
pub struct FakeSensor {
    pub reading: Rc<Cell<Option<i32>>>,
    pub reads: Rc<Cell<usize>>,
}

impl FakeSensor {
    pub fn new(millidegrees: i32) -> Self {
        FakeSensor {
            reading: Rc::new(Cell::new(Some(millidegrees))),
            reads: Rc::new(Cell::new(0)),
        }
    }
}

impl TemperatureSensor for FakeSensor {
    type Error = FakeError;

    fn read_millidegrees(&mut self) -> Result<i32, Self::Error> {
        self.reads.set(self.reads.get() + 1);
        self.reading.get().ok_or(FakeError)
    }
}
