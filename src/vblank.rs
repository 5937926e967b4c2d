//! Vblank sources and the vsync aligned waits built on them

use embedded_hal::{delay::DelayNs, digital::InputPin};
use log::{debug, warn};

use crate::mode::period_us;
use crate::traits::VblankSource;

/// TE width in low power mode, microseconds
pub const TE_USEC_LP: u32 = 693;
/// TE width at 120Hz, microseconds
pub const TE_USEC_120HZ: u32 = 273;
/// TE width at 60Hz in normal speed, microseconds
pub const TE_USEC_60HZ_NS: u32 = 546;
/// TE width at 60Hz in high speed, microseconds
pub const TE_USEC_60HZ_HS: u32 = 8500;

/// Allowed deviation of a measured TE period, microseconds
pub const TE_PERIOD_TOLERANCE_US: u64 = 2000;
/// Measurements before giving up on a changeable TE
pub const CHANGEABLE_TE_ATTEMPTS: usize = 5;

/// TE pulse width at `vrefresh`
pub fn te_width_us(vrefresh: u32, low_speed: bool) -> u32 {
    match vrefresh {
        30 => TE_USEC_LP,
        120 => TE_USEC_120HZ,
        _ if low_speed => TE_USEC_60HZ_NS,
        _ => TE_USEC_60HZ_HS,
    }
}

/// True when `vrefresh` is the highest rate of the speed class
pub fn is_peak_vrefresh(vrefresh: u32, low_speed: bool) -> bool {
    (low_speed && vrefresh == 60) || (!low_speed && vrefresh == 120)
}

/// Waits until the TE pulse after the next vblank has passed
///
/// Without a vblank signal a whole frame plus TE width is slept instead.
pub fn wait_for_vsync_done<V, D>(vblank: &mut V, delay: &mut D, vrefresh: u32, low_speed: bool)
where
    V: VblankSource,
    D: DelayNs,
{
    let te_us = te_width_us(vrefresh, low_speed);
    debug!("wait for vsync done @ {vrefresh}Hz");
    match vblank.wait_for_next_vblank() {
        Ok(()) => delay.delay_us(te_us),
        Err(e) => {
            debug!("no vblank ({e:?}), sleeping one frame");
            delay.delay_us(period_us(vrefresh) + te_us);
        }
    }
    // 1ms tolerance
    delay.delay_ms(1);
}

/// Waits for a stable changeable TE
///
/// Two consecutive vblanks are timed until their distance matches the frame
/// period. Gives up after [CHANGEABLE_TE_ATTEMPTS] with a warning.
pub fn wait_for_vsync_done_changeable<V, D>(
    vblank: &mut V,
    delay: &mut D,
    vrefresh: u32,
    low_speed: bool,
) where
    V: VblankSource,
    D: DelayNs,
{
    let period = u64::from(period_us(vrefresh));
    let mut settled = false;
    for _ in 0..CHANGEABLE_TE_ATTEMPTS {
        if vblank.wait_for_next_vblank().is_err() {
            delay.delay_us(period_us(vrefresh));
        }
        let start = vblank.now_us();
        if vblank.wait_for_next_vblank().is_err() {
            delay.delay_us(period_us(vrefresh));
        }
        let delta = vblank.now_us().saturating_sub(start);
        if delta.abs_diff(period) < TE_PERIOD_TOLERANCE_US {
            settled = true;
            break;
        }
    }
    if !settled {
        warn!("timeout of waiting for changeable TE @ {vrefresh}Hz");
    }
    delay.delay_us(te_width_us(vrefresh, low_speed));
}

/// Waits one vblank, or a fixed 8.35ms without a vblank signal
pub fn wait_one_vblank<V: VblankSource, D: DelayNs>(vblank: &mut V, delay: &mut D) {
    if vblank.wait_for_next_vblank().is_err() {
        delay.delay_us(8350);
    }
}

/// Error of [TePinVblank]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeError<E> {
    /// Reading the TE pin failed
    Pin(E),
    /// No rising edge within the timeout
    Timeout,
}

/// Vblank source polling the panel's TE line
///
/// A vblank is the rising edge of TE, the pin is polled every `poll_us`.
/// Timestamps come from `clock`, a free running microsecond counter such as a
/// hardware timer. It has to keep counting while nobody waits on TE.
pub struct TePinVblank<TE, D, C> {
    te: TE,
    delay: D,
    clock: C,
    poll_us: u32,
    timeout_us: u32,
}

impl<TE, D, C> TePinVblank<TE, D, C>
where
    TE: InputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    /// Creates a new `TePinVblank`
    ///
    /// If no timeout is given, 50ms (longer than a 30Hz frame) is used.
    pub fn new(te: TE, delay: D, clock: C, poll_us: u32, timeout_us: Option<u32>) -> Self {
        TePinVblank {
            te,
            delay,
            clock,
            poll_us: poll_us.max(1),
            timeout_us: timeout_us.unwrap_or(50_000),
        }
    }

    /// Gives pin, delay and clock back
    pub fn release(self) -> (TE, D, C) {
        (self.te, self.delay, self.clock)
    }
}

impl<TE, D, C> VblankSource for TePinVblank<TE, D, C>
where
    TE: InputPin,
    D: DelayNs,
    C: FnMut() -> u64,
{
    type Error = TeError<TE::Error>;

    fn wait_for_next_vblank(&mut self) -> Result<(), Self::Error> {
        let mut waited = 0u32;
        let mut seen_low = false;
        loop {
            let high = self.te.is_high().map_err(TeError::Pin)?;
            if high && seen_low {
                return Ok(());
            }
            seen_low |= !high;
            if waited >= self.timeout_us {
                return Err(TeError::Timeout);
            }
            self.delay.delay_us(self.poll_us);
            waited = waited.saturating_add(self.poll_us);
        }
    }

    fn now_us(&mut self) -> u64 {
        (self.clock)()
    }
}
