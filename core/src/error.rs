//! Error types for the telemetry core
//!
//! One enum per failure domain. Only [`StartupError`] ever escalates to the
//! caller as fatal; everything else is logged and the loop carries on.

use core::fmt;

use embedded_hal::i2c::ErrorKind as BusErrorKind;
use embedded_io_async::ErrorKind as IoErrorKind;
use hal_abstractions::{HttpError, LinkStatus, PARTIAL_BODY_CAPACITY, REASON_CAPACITY};
use heapless::String;

use crate::storage::Entry;

/// Register bus failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Transport failure reported by the I2C driver (e.g. no acknowledge)
    Transport(BusErrorKind),
    /// Read request larger than a single transfer allows
    Oversized { requested: usize },
}

impl BusError {
    pub(crate) fn transport<E: embedded_hal::i2c::Error>(err: E) -> Self {
        Self::Transport(err.kind())
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(kind) => write!(f, "bus transport error: {}", kind),
            Self::Oversized { requested } => {
                write!(f, "bus read of {} bytes exceeds transfer limit", requested)
            }
        }
    }
}

impl core::error::Error for BusError {}

/// Network link could not be established
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectivityError {
    /// The driver refused the join request
    Join,
    /// The link settled in a failure state
    Rejected(LinkStatus),
    /// The link did not settle within the attempt budget
    Timeout { attempts: u32, last: LinkStatus },
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join => write!(f, "join request failed"),
            Self::Rejected(status) => write!(f, "link failed: {}", status),
            Self::Timeout { attempts, last } => {
                write!(f, "link not up after {} attempts, last status {}", attempts, last)
            }
        }
    }
}

impl core::error::Error for ConnectivityError {}

/// Authentication request failed at the transport level
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthError {
    Transport(HttpError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "auth request failed: {}", err),
        }
    }
}

impl core::error::Error for AuthError {}

/// Why a publish attempt did not succeed
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PublishError {
    /// The transport returned nothing at all
    NoResponse,
    /// The transport failed after part of a response arrived
    Degraded {
        reason: String<REASON_CAPACITY>,
        body: String<PARTIAL_BODY_CAPACITY>,
    },
    /// A response arrived without the created status marker
    MissingStatus,
    /// The reading could not be serialized
    Encode,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => write!(f, "no response"),
            Self::Degraded { reason, body } => {
                write!(f, "degraded response: {} / {}", reason, body)
            }
            Self::MissingStatus => write!(f, "response without created status"),
            Self::Encode => write!(f, "reading could not be encoded"),
        }
    }
}

impl core::error::Error for PublishError {}

/// Event log sink failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogError {
    Write(IoErrorKind),
    Flush(IoErrorKind),
}

impl fmt::Display for LogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write(kind) => write!(f, "log write failed: {:?}", kind),
            Self::Flush(kind) => write!(f, "log flush failed: {:?}", kind),
        }
    }
}

impl core::error::Error for LogError {}

#[cfg(feature = "defmt")]
impl defmt::Format for LogError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", defmt::Display2Format(self))
    }
}

/// Invalid provisioning data or settings
///
/// Line numbers are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Line is neither blank, a comment, nor `key = value`
    MissingSeparator { line: usize },
    UnknownKey { line: usize },
    InvalidValue { line: usize },
    /// Value does not fit the field's capacity
    TooLong { line: usize },
    /// Required field is empty
    Empty(&'static str),
    /// Numeric field must be non-zero
    Zero(&'static str),
    /// Stored credentials could not be used
    Stored(StorageError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSeparator { line } => write!(f, "line {}: expected key = value", line),
            Self::UnknownKey { line } => write!(f, "line {}: unknown key", line),
            Self::InvalidValue { line } => write!(f, "line {}: invalid value", line),
            Self::TooLong { line } => write!(f, "line {}: value too long", line),
            Self::Empty(field) => write!(f, "{} must not be empty", field),
            Self::Zero(field) => write!(f, "{} must be non-zero", field),
            Self::Stored(e) => write!(f, "stored credentials: {}", e),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<StorageError> for ConfigError {
    fn from(e: StorageError) -> Self {
        Self::Stored(e)
    }
}

/// Persistent credential block failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Block is erased or corrupt
    Checksum { stored: u32, computed: u32 },
    /// Value does not fit the entry
    TooLong(Entry),
    /// Entry is not valid UTF-8
    Encoding(Entry),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checksum { stored, computed } => write!(
                f,
                "checksum mismatch (stored 0x{:08x}, computed 0x{:08x})",
                stored, computed
            ),
            Self::TooLong(entry) => write!(f, "{} too long", entry.name()),
            Self::Encoding(entry) => write!(f, "{} is not valid text", entry.name()),
        }
    }
}

impl core::error::Error for StorageError {}

/// Fatal failure during startup; the caller is expected to halt
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupError {
    Config(ConfigError),
    Connectivity(ConnectivityError),
    Auth(AuthError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {}", e),
            Self::Connectivity(e) => write!(f, "connectivity: {}", e),
            Self::Auth(e) => write!(f, "authentication: {}", e),
        }
    }
}

impl core::error::Error for StartupError {}

impl From<ConfigError> for StartupError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ConnectivityError> for StartupError {
    fn from(e: ConnectivityError) -> Self {
        Self::Connectivity(e)
    }
}

impl From<AuthError> for StartupError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}
