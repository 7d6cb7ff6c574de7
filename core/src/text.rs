//! Fixed-capacity text helpers

use core::fmt;

use heapless::String;

/// Append as much of `src` as fits into `dst`
///
/// Stops at a character boundary. Returns `false` if anything was dropped.
pub(crate) fn push_truncated<const N: usize>(dst: &mut String<N>, src: &str) -> bool {
    if dst.push_str(src).is_ok() {
        return true;
    }
    for ch in src.chars() {
        if dst.push(ch).is_err() {
            return false;
        }
    }
    true
}

/// Copy `src` into a new fixed-capacity string, truncating if needed
pub(crate) fn truncated<const N: usize>(src: &str) -> String<N> {
    let mut out = String::new();
    push_truncated(&mut out, src);
    out
}

/// `fmt::Write` adapter that never fails, silently truncating on overflow
pub(crate) struct Truncating<'a, const N: usize> {
    buf: &'a mut String<N>,
    truncated: bool,
}

impl<'a, const N: usize> Truncating<'a, N> {
    pub(crate) fn new(buf: &'a mut String<N>) -> Self {
        Self {
            buf,
            truncated: false,
        }
    }

    pub(crate) fn was_truncated(&self) -> bool {
        self.truncated
    }
}

impl<const N: usize> fmt::Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if !self.truncated && !push_truncated(self.buf, s) {
            self.truncated = true;
        }
        Ok(())
    }
}
