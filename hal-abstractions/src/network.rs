//! Network link primitive
//!
//! Models a WiFi station interface: a join request is issued once and the
//! driver's link status is then polled until it settles.

use core::fmt;
use core::future::Future;

/// Link status as reported by the network driver
///
/// Numeric codes follow the common station-interface convention: negative
/// values are terminal failures, 0..=2 are in progress, 3 is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Interface idle, no join in progress
    Idle,
    /// Associating with the access point
    Joining,
    /// Associated, waiting for an address
    NoIp,
    /// Associated and addressed
    Up,
    /// Join failed for an unspecified reason
    Failed,
    /// Network name not found
    NoNetwork,
    /// Passphrase rejected
    BadAuth,
}

impl LinkStatus {
    /// Map a raw driver status code to a `LinkStatus`
    ///
    /// Unknown negative codes map to `Failed`, unknown positive ones to
    /// `Joining`.
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Joining,
            2 => Self::NoIp,
            3 => Self::Up,
            -2 => Self::NoNetwork,
            -3 => Self::BadAuth,
            c if c < 0 => Self::Failed,
            _ => Self::Joining,
        }
    }

    /// Raw status code
    pub const fn code(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Joining => 1,
            Self::NoIp => 2,
            Self::Up => 3,
            Self::Failed => -1,
            Self::NoNetwork => -2,
            Self::BadAuth => -3,
        }
    }

    /// True once the link has either come up or failed terminally
    pub const fn is_settled(self) -> bool {
        let code = self.code();
        code < 0 || code >= 3
    }

    /// True when the link is associated and addressed
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Joining => "joining",
            Self::NoIp => "no ip",
            Self::Up => "up",
            Self::Failed => "failed",
            Self::NoNetwork => "no network",
            Self::BadAuth => "bad auth",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

/// Connect/status primitive of the network stack
///
/// # Example Implementation
/// ```ignore
/// impl NetworkLink for Cyw43Link {
///     type Error = cyw43::ControlError;
///     async fn join(&mut self, name: &str, pass: &str) -> Result<(), Self::Error> {
///         self.control.join_wpa2(name, pass).await
///     }
///     fn status(&mut self) -> LinkStatus {
///         LinkStatus::from_code(self.raw_status())
///     }
/// }
/// ```
pub trait NetworkLink {
    /// Driver error raised when the join request cannot even be issued
    type Error: fmt::Debug;

    /// Start joining the named network
    ///
    /// Returns once the request has been handed to the driver; completion is
    /// observed through [`NetworkLink::status`].
    fn join(
        &mut self,
        network_name: &str,
        passphrase: &str,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Current link status
    fn status(&mut self) -> LinkStatus;
}

impl<T: NetworkLink + ?Sized> NetworkLink for &mut T {
    type Error = T::Error;

    fn join(
        &mut self,
        network_name: &str,
        passphrase: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> {
        (**self).join(network_name, passphrase)
    }

    fn status(&mut self) -> LinkStatus {
        (**self).status()
    }
}
