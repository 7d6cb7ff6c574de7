//! Wall-clock source

/// Source of wall-clock time for log timestamps
///
/// Backed by an RTC on target. Before the clock has been set, implementors
/// return whatever the RTC counts from (usually the epoch); the log line is
/// still written.
pub trait WallClock {
    /// Seconds since the Unix epoch, UTC
    fn unix_secs(&mut self) -> u64;
}

impl<T: WallClock + ?Sized> WallClock for &mut T {
    fn unix_secs(&mut self) -> u64 {
        (**self).unix_secs()
    }
}
