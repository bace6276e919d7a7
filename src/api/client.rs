// tolino-cloud - Tolino Cloud Library Client
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! HTTP client for the cloud
//!
//! This module wraps `reqwest::Client` with what every cloud call needs:
//! - One cookie jar shared by all requests of a session, so the partner
//!   site's login cookie reaches the OAuth authorize endpoint
//! - A second client on the same jar that does not follow redirects, used
//!   to read the `Location` header of the authorize step
//! - The browser-like default headers the service expects from its web reader
//! - Helpers for the `t_auth_token` / `hardware_id` / `m_id` header triple
//!   and for reading service error messages out of response bodies
//!
//! No retry, backoff or request timeout is applied unless the caller
//! configures one via [`ClientConfig`].

use crate::api::hardware::HardwareIdentity;
use crate::error::{CloudError, Failure, Result};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::redirect::Policy;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// OAuth client id of the partner web reader
pub const WEB_READER_CLIENT_ID: &str = "4c20de744aa8b83b79b692524c7ec6ae";

/// Default User-Agent, a desktop browser as the web reader would send
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:115.0) Gecko/20100101 Firefox/115.0";

/// Header carrying the OAuth access token
pub const HEADER_AUTH_TOKEN: &str = "t_auth_token";

/// Header carrying the hardware id
pub const HEADER_HARDWARE_ID: &str = "hardware_id";

/// Header carrying the partner (reseller) id
pub const HEADER_PARTNER_ID: &str = "m_id";

/// Configuration for CloudClient
/// Provides a builder pattern for client customization
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Per-request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    pub user_agent: String,
    /// OAuth client id sent to the authorize, token and revoke endpoints
    pub client_id: String,
    /// Hardware id presented to the device and content endpoints
    pub hardware: HardwareIdentity,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            client_id: WEB_READER_CLIENT_ID.to_string(),
            hardware: HardwareIdentity::shared().clone(),
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn client_id<S: Into<String>>(mut self, client_id: S) -> Self {
        self.config.client_id = client_id.into();
        self
    }

    pub fn hardware(mut self, hardware: HardwareIdentity) -> Self {
        self.config.hardware = hardware;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

/// Cookie-carrying HTTP client shared by all steps of one session
#[derive(Debug)]
pub struct CloudClient {
    /// Client following redirects (all calls except the authorize step)
    http: Client,
    /// Client returning 3xx responses as-is
    no_redirect: Client,
    /// Cookie jar behind both clients
    cookies: Arc<Jar>,
    config: ClientConfig,
}

impl CloudClient {
    /// Create a new CloudClient
    ///
    /// # Errors
    /// Returns error if the user agent is not a valid header value or the
    /// HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.client_id.is_empty() {
            return Err(CloudError::configuration("OAuth client id must not be empty"));
        }

        let cookies = Arc::new(Jar::default());
        let http = Self::base_builder(&config, &cookies)?.build()?;
        let no_redirect = Self::base_builder(&config, &cookies)?
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            http,
            no_redirect,
            cookies,
            config,
        })
    }

    fn base_builder(config: &ClientConfig, cookies: &Arc<Jar>) -> Result<ClientBuilder> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| CloudError::configuration(format!("Invalid user agent: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));

        let mut builder = Client::builder()
            .default_headers(headers)
            .cookie_provider(Arc::clone(cookies));

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(builder)
    }

    /// Client that follows redirects
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Client that hands back redirect responses untouched
    pub fn no_redirect(&self) -> &Client {
        &self.no_redirect
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hardware id string this client presents
    pub fn hardware_id(&self) -> &str {
        self.config.hardware.as_str()
    }

    /// Check whether the jar holds a cookie `name` that would be sent to `url`
    pub fn has_cookie(&self, url: &str, name: &str) -> Result<bool> {
        let url = Url::parse(url)
            .map_err(|e| CloudError::configuration(format!("Invalid URL {}: {}", url, e)))?;

        let header = match self.cookies.cookies(&url) {
            Some(header) => header,
            None => return Ok(false),
        };

        Ok(header
            .to_str()
            .unwrap_or_default()
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .any(|(cookie_name, _)| cookie_name == name))
    }
}

/// Build the `t_auth_token` / `hardware_id` / `m_id` headers of an authenticated call
pub fn auth_headers(access_token: &str, hardware_id: Option<&str>, partner_id: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(HEADER_AUTH_TOKEN, header_value(HEADER_AUTH_TOKEN, access_token)?);
    if let Some(hardware_id) = hardware_id {
        headers.insert(HEADER_HARDWARE_ID, header_value(HEADER_HARDWARE_ID, hardware_id)?);
    }
    headers.insert(HEADER_PARTNER_ID, header_value(HEADER_PARTNER_ID, partner_id)?);
    Ok(headers)
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| CloudError::invalid_input(format!("{} is not a valid header value", name)))
}

/// Status and body of a fully read response
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Read the whole body; transport failures propagate unchanged
    pub async fn read(response: Response) -> Result<Self> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(Self { status, body })
    }

    /// The service signals success with exactly 200
    pub fn is_ok(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Decode the body, reporting shape problems as a Malformed failure
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, Failure> {
        serde_json::from_slice(&self.body).map_err(|e| Failure::malformed(e.to_string()))
    }

    /// Failure describing a rejected call, with the service's message if it sent one
    pub fn rejection(&self) -> Failure {
        Failure::status(self.status.as_u16(), service_message(&self.body))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "ResponseInfo")]
    response_info: ResponseInfo,
}

#[derive(Deserialize)]
struct ResponseInfo {
    message: String,
}

/// Extract `ResponseInfo.message` from an error body
pub(crate) fn service_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.response_info.message)
}

/// A JSON scalar the service sends either as a number or as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Integer value, parsing numeric strings and accepting whole floats
    pub fn to_i64(&self, field: &str) -> std::result::Result<i64, Failure> {
        let not_integer = || Failure::malformed(format!("{} is not an integer: {:?}", field, self));
        match self {
            Scalar::Int(value) => Ok(*value),
            Scalar::Float(value) => whole_to_i64(*value).ok_or_else(not_integer),
            Scalar::Text(text) => {
                let text = text.trim();
                text.parse()
                    .ok()
                    .or_else(|| text.parse::<f64>().ok().and_then(whole_to_i64))
                    .ok_or_else(not_integer)
            }
        }
    }

    /// String value, rendering numbers in decimal
    pub fn into_string(self) -> String {
        match self {
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) => match whole_to_i64(value) {
                Some(whole) => whole.to_string(),
                None => value.to_string(),
            },
            Scalar::Text(text) => text,
        }
    }
}

// i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
fn whole_to_i64(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.is_finite() && value.fract() == 0.0 && in_range).then(|| value as i64)
}

// ===== TESTS =====
