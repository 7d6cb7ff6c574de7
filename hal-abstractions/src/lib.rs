//! Hardware abstraction traits for noisemeter firmware
//!
//! This crate defines the collaborator traits the telemetry core is written
//! against. Board support packages implement them on top of their WiFi
//! driver, HTTP(S) stack and RTC. The register bus and the liveness LED
//! are covered by `embedded-hal` directly and have no trait here.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod http;
pub mod network;

pub use clock::WallClock;
pub use http::{
    Header, HttpClient, HttpError, HttpResponse, PARTIAL_BODY_CAPACITY, REASON_CAPACITY,
    RESPONSE_BODY_CAPACITY,
};
pub use network::{LinkStatus, NetworkLink};
