//! Durable event journal
//!
//! Append-only text log of lifecycle and error events, one timestamped line
//! per event. Every append is flushed before it returns: the device is
//! usually power-cycled rather than shut down, and the last event before a
//! crash is the one that matters. Volume is at most a few lines per minute.

use core::fmt::{self, Write as _};

use embedded_io_async::{Error as _, Write};
use hal_abstractions::WallClock;
use heapless::String;

use crate::error::LogError;
use crate::text::Truncating;
use crate::time::CivilDateTime;

/// Longest line written, including the timestamp prefix and newline
pub const LINE_CAPACITY: usize = 640;

/// Timestamped append-only log over a byte sink
///
/// The sink is held for the lifetime of the log; opening the backing file
/// in append mode is the board's job.
pub struct EventLog<W, C> {
    sink: W,
    clock: C,
    utc_offset_secs: i32,
}

impl<W: Write, C: WallClock> EventLog<W, C> {
    pub fn open(sink: W, clock: C, utc_offset_secs: i32) -> Self {
        Self {
            sink,
            clock,
            utc_offset_secs,
        }
    }

    /// Append one event and flush it to the sink
    pub async fn append(&mut self, message: &str) -> Result<(), LogError> {
        self.append_fmt(format_args!("{}", message)).await
    }

    /// Append one formatted event and flush it to the sink
    ///
    /// Over-long messages are truncated to fit a single line.
    pub async fn append_fmt(&mut self, args: fmt::Arguments<'_>) -> Result<(), LogError> {
        let line = self.render(args);
        info!("{}", line.as_str());

        self.sink
            .write_all(line.as_bytes())
            .await
            .map_err(|e| LogError::Write(e.kind()))?;
        self.sink
            .write_all(b"\n")
            .await
            .map_err(|e| LogError::Write(e.kind()))?;
        self.sink
            .flush()
            .await
            .map_err(|e| LogError::Flush(e.kind()))
    }

    /// Append an event, reporting sink failures on the console only
    ///
    /// The journal is diagnostics; losing it must not stop telemetry.
    pub async fn record(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.append_fmt(args).await {
            error!("Event log unavailable: {}", e);
        }
    }

    fn render(&mut self, args: fmt::Arguments<'_>) -> String<{ LINE_CAPACITY - 1 }> {
        let local = self.clock.unix_secs() as i64 + i64::from(self.utc_offset_secs);
        let mut line = String::new();
        let mut writer = Truncating::new(&mut line);
        // Truncating never reports an error
        let _ = write!(writer, "{} ", CivilDateTime::from_unix(local));
        let _ = writer.write_fmt(args);
        if writer.was_truncated() {
            warn!("Event log line truncated");
        }
        line
    }

    /// Release the sink and clock
    pub fn into_parts(self) -> (W, C) {
        (self.sink, self.clock)
    }
}
