//! HTTP(S) request/response primitive
//!
//! The telemetry core only ever issues POST requests with small JSON bodies
//! and inspects the response as text, so the abstraction is kept
//! narrow. TLS, DNS and connection reuse are the implementor's business.

use core::fmt;
use core::future::Future;

use heapless::String;

/// Maximum response body kept by the transport, in bytes
pub const RESPONSE_BODY_CAPACITY: usize = 512;

/// Maximum length of a transport failure reason
pub const REASON_CAPACITY: usize = 64;

/// Maximum body kept alongside a transport failure, in bytes
///
/// Only the head of a broken response is useful for diagnostics.
pub const PARTIAL_BODY_CAPACITY: usize = 128;

/// One request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

impl<'a> Header<'a> {
    pub const fn new(name: &'a str, value: &'a str) -> Self {
        Self { name, value }
    }
}

/// A response received from the server
///
/// `body` is the raw text as delivered by the transport, which may still
/// contain transfer framing (see the core crate's response sanitizer).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HttpResponse {
    pub status: u16,
    pub body: String<RESPONSE_BODY_CAPACITY>,
}

/// Transport-level failure
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HttpError {
    /// Nothing came back (DNS, connect, TLS or timeout failure)
    NoResponse,
    /// The request failed after part of a response was read
    Partial {
        reason: String<REASON_CAPACITY>,
        body: String<PARTIAL_BODY_CAPACITY>,
    },
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no response"),
            Self::Partial { reason, body } => write!(f, "{} / {}", reason, body),
        }
    }
}

impl core::error::Error for HttpError {}

/// HTTP client used for authentication and publishing
pub trait HttpClient {
    /// Issue one POST request
    ///
    /// Each call is a single attempt; implementors must not retry.
    fn post(
        &mut self,
        url: &str,
        headers: &[Header<'_>],
        body: &[u8],
    ) -> impl Future<Output = Result<HttpResponse, HttpError>>;
}

impl<T: HttpClient + ?Sized> HttpClient for &mut T {
    fn post(
        &mut self,
        url: &str,
        headers: &[Header<'_>],
        body: &[u8],
    ) -> impl Future<Output = Result<HttpResponse, HttpError>> {
        (**self).post(url, headers, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stays_small() {
        assert!(core::mem::size_of::<HttpError>() < RESPONSE_BODY_CAPACITY / 2);
    }

    #[test]
    fn test_display() {
        let err = HttpError::Partial {
            reason: String::try_from("ECONNRESET").unwrap(),
            body: String::try_from("55{").unwrap(),
        };
        assert_eq!(format!("{}", err), "ECONNRESET / 55{");
        assert_eq!(format!("{}", HttpError::NoResponse), "no response");
    }
}
