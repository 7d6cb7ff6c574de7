//! Cloud telemetry session
//!
//! Talks to the telemetry service over [`HttpClient`]: one token request at
//! startup, then one publish per reporting cycle. Every call is a single
//! attempt; cadence and retry policy belong to the caller.
//!
//! # Response framing
//!
//! The device's HTTP stack occasionally hands back bodies that still carry
//! chunked transfer framing, e.g. `55{"status_code":201}0` or CR/LF noise
//! around the JSON. [`sanitize_response`] strips the known artifacts before
//! the body is inspected. The set of artifacts is empirical; bodies framed
//! differently pass through unchanged and simply fail the status check.

use alloc::string::String as AllocString;

use hal_abstractions::{Header, HttpClient, HttpError, RESPONSE_BODY_CAPACITY};
use heapless::String;
use serde::Deserialize;

use crate::config::{Config, URL_CAPACITY};
use crate::error::{AuthError, PublishError};
use crate::reading::Reading;
use crate::text::truncated;

/// Header carrying the account API key on the token request
pub const API_KEY_HEADER: &str = "x-ubidots-apikey";

/// Header carrying the bearer token on publish requests
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Marker the service puts in the body when a value was stored
pub const CREATED_MARKER: &str = "\"status_code\":201";

/// Context logged when a publish got no response at all
pub const EMPTY_CONTEXT: &str = "[EMPTY]";

pub const TOKEN_CAPACITY: usize = 128;

const CONTENT_TYPE_JSON: Header<'static> = Header::new("Content-Type", "application/json");

/// Sanitized response text
pub type ResponseText = String<RESPONSE_BODY_CAPACITY>;

/// Bearer token for publish requests
///
/// May be empty if the service answered without one; publishes then go out
/// unauthenticated and are rejected by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credential {
    token: String<TOKEN_CAPACITY>,
}

impl Credential {
    pub fn new(token: String<TOKEN_CAPACITY>) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }
}

/// Result of the token request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub credential: Credential,
    /// Body exactly as received, for the diagnostics log
    pub raw_text: ResponseText,
}

#[derive(Deserialize)]
struct TokenBody {
    #[serde(default)]
    token: String<TOKEN_CAPACITY>,
}

/// Outcome of one publish attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    pub success: bool,
    /// Sanitized response body; empty when no usable response arrived
    pub raw_text: ResponseText,
    pub error: Option<PublishError>,
}

impl PublishOutcome {
    fn failed(error: PublishError, raw_text: ResponseText) -> Self {
        Self {
            success: false,
            raw_text,
            error: Some(error),
        }
    }

    /// Text to log as the outcome of this attempt
    pub fn context(&self) -> &str {
        match self.error {
            Some(PublishError::NoResponse) => EMPTY_CONTEXT,
            _ => &self.raw_text,
        }
    }
}

/// Strip transfer framing artifacts from a response body
///
/// Removes `\n0\r` chunk terminators and all remaining CR/LF, then drops the
/// `55` chunk-size prefix before `{` and the trailing `0` after `}`.
pub fn sanitize_response(raw: &str) -> ResponseText {
    let cleaned: AllocString = raw
        .replace("\n0\r", "")
        .replace(|c: char| c == '\n' || c == '\r', "")
        .replace("55{", "{")
        .replace("}0", "}");
    truncated(&cleaned)
}

/// True if a sanitized body carries the created marker
pub fn is_created(body: &str) -> bool {
    body.contains(CREATED_MARKER)
}

/// Telemetry endpoints bound to an HTTP client
pub struct CloudSession<H> {
    http: H,
    auth_url: String<URL_CAPACITY>,
    publish_url: String<URL_CAPACITY>,
}

impl<H: HttpClient> CloudSession<H> {
    pub fn new(http: H, config: &Config) -> Self {
        Self {
            http,
            auth_url: config.auth_url.clone(),
            publish_url: config.publish_url.clone(),
        }
    }

    /// Exchange the API key for a bearer token
    ///
    /// Only a transport failure is an error. A body without a usable `token`
    /// field yields an empty credential.
    pub async fn authenticate(&mut self, api_key: &str) -> Result<Authorization, AuthError> {
        let headers = [Header::new(API_KEY_HEADER, api_key), CONTENT_TYPE_JSON];
        let response = self
            .http
            .post(&self.auth_url, &headers, &[])
            .await
            .map_err(AuthError::Transport)?;

        debug!("Auth response status {}", response.status);

        let body = sanitize_response(&response.body);
        let token = match serde_json::from_str::<TokenBody>(&body) {
            Ok(parsed) => parsed.token,
            Err(_) => {
                warn!("Auth response is not a token document");
                String::new()
            }
        };

        Ok(Authorization {
            credential: Credential::new(token),
            raw_text: response.body,
        })
    }

    /// Send one reading and classify the response
    pub async fn publish(&mut self, credential: &Credential, reading: &Reading) -> PublishOutcome {
        let body = match serde_json::to_vec(reading) {
            Ok(body) => body,
            Err(_) => return PublishOutcome::failed(PublishError::Encode, String::new()),
        };
        let headers = [
            Header::new(AUTH_TOKEN_HEADER, credential.token()),
            CONTENT_TYPE_JSON,
        ];

        match self.http.post(&self.publish_url, &headers, &body).await {
            Ok(response) => {
                let text = sanitize_response(&response.body);
                if is_created(&text) {
                    PublishOutcome {
                        success: true,
                        raw_text: text,
                        error: None,
                    }
                } else {
                    debug!("Publish answered {} without created marker", response.status);
                    PublishOutcome::failed(PublishError::MissingStatus, text)
                }
            }
            Err(HttpError::NoResponse) => {
                warn!("request error (no other info)");
                PublishOutcome::failed(PublishError::NoResponse, String::new())
            }
            Err(HttpError::Partial { reason, body }) => {
                warn!("non-fatal request error: {} / {}", reason, body);
                PublishOutcome::failed(PublishError::Degraded { reason, body }, String::new())
            }
        }
    }

    /// Release the underlying HTTP client
    pub fn release(self) -> H {
        self.http
    }
}
