//! Network link establishment
//!
//! The link is brought up once at startup with a bounded number of status
//! polls. There is no reconnection: if the link drops later, publishes fail
//! and the telemetry loop logs them.

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{LinkStatus, NetworkLink};

use crate::error::ConnectivityError;

/// Link lifecycle as seen by the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// Network name and passphrase
#[derive(Clone, Copy)]
pub struct NetworkCredentials<'a> {
    pub network_name: &'a str,
    pub passphrase: &'a str,
}

/// Owns the network link and its connection state
pub struct ConnectivityManager<L> {
    link: L,
    state: ConnectionState,
}

impl<L: NetworkLink> ConnectivityManager<L> {
    pub fn new(link: L) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True when the link was established and the driver still reports it up
    pub fn is_ready(&mut self) -> bool {
        self.state == ConnectionState::Connected && self.link.status().is_up()
    }

    /// Join the network and wait for the link to settle
    ///
    /// Polls the link status up to `max_attempts` times, sleeping
    /// `attempt_interval_ms` after each unsettled poll, then checks once
    /// more. Ends in `Connected` only if the link reports up.
    pub async fn connect<D: DelayNs>(
        &mut self,
        credentials: NetworkCredentials<'_>,
        max_attempts: u32,
        attempt_interval_ms: u32,
        delay: &mut D,
    ) -> Result<(), ConnectivityError> {
        self.state = ConnectionState::Connecting;
        info!("Joining network '{}'", credentials.network_name);

        if self
            .link
            .join(credentials.network_name, credentials.passphrase)
            .await
            .is_err()
        {
            error!("Network driver refused the join request");
            self.state = ConnectionState::Failed;
            return Err(ConnectivityError::Join);
        }

        let mut remaining = max_attempts;
        while remaining > 0 {
            if self.link.status().is_settled() {
                break;
            }
            remaining -= 1;
            debug!("waiting for connection...");
            delay.delay_ms(attempt_interval_ms).await;
        }

        let status = self.link.status();
        if status.is_up() {
            info!("Network link up");
            self.state = ConnectionState::Connected;
            return Ok(());
        }

        self.state = ConnectionState::Failed;
        error!("Network link failed: {}", status);
        Err(failure(status, max_attempts))
    }

    /// Release the underlying link
    pub fn release(self) -> L {
        self.link
    }
}

fn failure(status: LinkStatus, attempts: u32) -> ConnectivityError {
    if status.is_settled() {
        ConnectivityError::Rejected(status)
    } else {
        ConnectivityError::Timeout {
            attempts,
            last: status,
        }
    }
}
