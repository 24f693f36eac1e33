//! Host OS implementations.

use std::thread;
use std::time::Duration;

use crate::traits::DelayNs;

/// Blocking delay backed by `std::thread::sleep`.
///
/// ```rust
/// use rs_tilewall::hal::StdDelay;
/// use rs_tilewall::traits::DelayNs;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// StdDelay.delay_ms(5);
/// assert!(start.elapsed().as_millis() >= 5);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_us(&mut self, us: u32) {
        thread::sleep(Duration::from_micros(u64::from(us)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
