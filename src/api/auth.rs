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


//! Session authentication against a partner
//!
//! The web reader obtains its tokens in three steps, all on one cookie jar:
//!
//! 1. **Site login** - POST the credentials form to the partner shop. The
//!    shop answers with a page either way; only the presence of its login
//!    cookie tells success from failure.
//! 2. **Authorize** - GET the OAuth authorize endpoint with the login cookie.
//!    The service answers with a redirect to the reader URL carrying `code`
//!    in its query string. Redirects are not followed.
//! 3. **Token exchange** - POST the code to the token endpoint and receive
//!    `access_token`, `refresh_token` and `expires_in`.
//!
//! ```text
//! Unauthenticated -> SiteCookieObtained -> AuthorizationCodeObtained -> Authenticated
//!                                                                           |
//!                                                                  logout   v
//!                                                                        Revoked
//! ```
//!
//! A failed step leaves the state at the last step that completed and
//! stores no tokens.

use crate::api::client::{auth_headers, ClientConfig, CloudClient, RawResponse, Scalar};
use crate::api::devices::DeviceManager;
use crate::api::inventory::CatalogClient;
use crate::api::partner::{PartnerConfig, PartnerRegistry};
use crate::api::transfer::ContentTransferClient;
use crate::error::{CloudError, Failure, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, LOCATION};
use serde::Deserialize;
use std::fmt;
use url::Url;

/// OAuth scope requested by the web reader
pub const OAUTH_SCOPE: &str = "ebook_library";

/// Handshake progress of a [`SessionAuthenticator`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    SiteCookieObtained,
    AuthorizationCodeObtained,
    Authenticated,
    /// Refresh token revoked by logout; terminal
    Revoked,
}

/// OAuth tokens of an authenticated session
#[derive(Clone)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    expires_at: DateTime<Utc>,
}

impl Session {
    /// Build a session from a token grant
    ///
    /// `expires_in` must be positive and small enough to yield a valid expiry time.
    fn new(access_token: String, refresh_token: String, expires_in: i64) -> std::result::Result<Self, Failure> {
        if expires_in <= 0 {
            return Err(Failure::malformed(format!("expires_in must be positive, got {}", expires_in)));
        }
        let expires_at = Duration::try_seconds(expires_in)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| Failure::malformed(format!("expires_in out of range: {}", expires_in)))?;

        Ok(Self {
            access_token,
            refresh_token,
            expires_in,
            expires_at,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Token lifetime in seconds as granted by the token endpoint
    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }

    /// When the access token expires
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Token endpoint response
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Scalar,
}

/// Logs in to one partner and owns the resulting session
///
/// # Example
/// ```rust,no_run
/// use tolino_cloud::api::{ClientConfig, PartnerRegistry, SessionAuthenticator};
/// use tolino_cloud::api::partner::HUGENDUBEL;
///
/// # async fn example() -> tolino_cloud::error::Result<()> {
/// let registry = PartnerRegistry::builtin();
/// let mut auth = SessionAuthenticator::for_partner(&registry, HUGENDUBEL, ClientConfig::default())?;
/// auth.login("reader@example.com", "secret").await?;
///
/// for entry in auth.catalog().inventory().await? {
///     println!("{} - {}", entry.id, entry.title);
/// }
///
/// auth.logout().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionAuthenticator {
    client: CloudClient,
    partner: PartnerConfig,
    state: AuthState,
    session: Option<Session>,
}

impl SessionAuthenticator {
    /// Create an authenticator for an explicit partner configuration
    pub fn new(partner: PartnerConfig, config: ClientConfig) -> Result<Self> {
        Ok(Self {
            client: CloudClient::new(config)?,
            partner,
            state: AuthState::Unauthenticated,
            session: None,
        })
    }

    /// Create an authenticator for a registered partner
    ///
    /// # Errors
    /// `Configuration` if `partner_id` is not in the registry
    pub fn for_partner(registry: &PartnerRegistry, partner_id: u32, config: ClientConfig) -> Result<Self> {
        let partner = registry.get(partner_id)?.clone();
        Self::new(partner, config)
    }

    pub fn partner(&self) -> &PartnerConfig {
        &self.partner
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated
    }

    /// The current session
    ///
    /// # Errors
    /// `NotAuthenticated` unless the handshake completed and no logout happened
    pub fn session(&self) -> Result<&Session> {
        match (&self.state, &self.session) {
            (AuthState::Authenticated, Some(session)) if !session.access_token.is_empty() => Ok(session),
            _ => Err(CloudError::NotAuthenticated),
        }
    }

    /// Hardware id presented by this session
    pub fn hardware_id(&self) -> &str {
        self.client.hardware_id()
    }

    pub(crate) fn client(&self) -> &CloudClient {
        &self.client
    }

    /// Headers for an authenticated call; `hardware_id` is included on request
    pub(crate) fn auth_headers(&self, with_hardware_id: bool) -> Result<HeaderMap> {
        let session = self.session()?;
        let hardware_id = with_hardware_id.then(|| self.hardware_id());
        auth_headers(session.access_token(), hardware_id, &self.partner.m_id())
    }

    /// Device operations on this session
    pub fn devices(&self) -> DeviceManager<'_> {
        DeviceManager::new(self)
    }

    /// Inventory operations on this session
    pub fn catalog(&self) -> CatalogClient<'_> {
        CatalogClient::new(self)
    }

    /// Upload, delete and download operations on this session
    pub fn transfer(&self) -> ContentTransferClient<'_> {
        ContentTransferClient::new(self)
    }

    /// Run the full login handshake
    ///
    /// # Errors
    /// - `Authentication` - the partner site did not set its login cookie
    /// - `Authorization` - no authorization code in the authorize redirect
    /// - `TokenExchange` - token endpoint rejected the code or omitted a token field
    /// - `InvalidState` - the session is already authenticated or was revoked
    /// - `Transport` - network failure in any step
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        match self.state {
            AuthState::Authenticated => {
                return Err(CloudError::invalid_state("session is already authenticated"))
            }
            AuthState::Revoked => return Err(CloudError::invalid_state("session was revoked")),
            _ => {}
        }

        self.state = AuthState::Unauthenticated;
        self.session = None;
        // Fresh cookie jar: only this attempt's site login may satisfy the cookie check.
        self.client = CloudClient::new(self.client.config().clone())?;

        self.site_login(username, password).await?;
        self.state = AuthState::SiteCookieObtained;

        let code = self.request_authorization_code().await?;
        self.state = AuthState::AuthorizationCodeObtained;

        let session = self.exchange_code(&code).await?;
        self.session = Some(session);
        self.state = AuthState::Authenticated;

        tracing::info!(partner = self.partner.id, "logged in");
        Ok(())
    }

    /// Step 1: log in to the partner site to obtain its session cookie
    async fn site_login(&self, username: &str, password: &str) -> Result<()> {
        tracing::debug!(partner = self.partner.id, "posting site login form");

        let form = [
            ("form_send", "1"),
            ("form[login]", username),
            ("form[password]", password),
        ];
        let response = self
            .client
            .http()
            .post(&self.partner.login_url)
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !self.client.has_cookie(&self.partner.login_url, &self.partner.login_cookie)? {
            tracing::warn!(partner = self.partner.id, status = status.as_u16(), "site login rejected");
            return Err(CloudError::Authentication {
                partner: self.partner.name.clone(),
            });
        }

        Ok(())
    }

    /// Step 2: request an authorization code from the authorize endpoint
    async fn request_authorization_code(&self) -> Result<String> {
        tracing::debug!(partner = self.partner.id, "requesting authorization code");

        let query = [
            ("client_id", self.client.config().client_id.as_str()),
            ("response_type", "code"),
            ("scope", OAUTH_SCOPE),
            ("redirect_uri", self.partner.reader_url.as_str()),
        ];
        let response = self
            .client
            .no_redirect()
            .get(&self.partner.auth_url)
            .query(&query)
            .send()
            .await?;

        let base = response.url().clone();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                CloudError::Authorization(Failure::malformed(format!(
                    "no Location header in authorize response (HTTP {})",
                    response.status().as_u16()
                )))
            })?;

        parse_authorization_code(&base, location)
    }

    /// Step 3: exchange the authorization code for tokens
    async fn exchange_code(&self, code: &str) -> Result<Session> {
        tracing::debug!(partner = self.partner.id, "exchanging authorization code");

        let form = [
            ("client_id", self.client.config().client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("scope", OAUTH_SCOPE),
            ("redirect_uri", self.partner.reader_url.as_str()),
        ];
        let response = self
            .client
            .no_redirect()
            .post(&self.partner.token_url)
            .form(&form)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        let tokens: TokenResponse = match raw.json() {
            Ok(tokens) => tokens,
            Err(_) if !raw.is_ok() => return Err(CloudError::TokenExchange(raw.rejection())),
            Err(failure) => return Err(CloudError::TokenExchange(failure)),
        };

        if tokens.access_token.is_empty() {
            return Err(CloudError::TokenExchange(Failure::malformed("empty access_token")));
        }
        let expires_in = tokens
            .expires_in
            .to_i64("expires_in")
            .map_err(CloudError::TokenExchange)?;

        Session::new(tokens.access_token, tokens.refresh_token, expires_in).map_err(CloudError::TokenExchange)
    }

    /// Revoke the refresh token and end the session
    ///
    /// # Errors
    /// - `Revocation` - the revoke endpoint answered with anything but 200
    /// - `InvalidState` - the session is not authenticated
    pub async fn logout(&mut self) -> Result<()> {
        let refresh_token = match (&self.state, &self.session) {
            (AuthState::Authenticated, Some(session)) => session.refresh_token.clone(),
            _ => return Err(CloudError::invalid_state("logout requires an authenticated session")),
        };

        let form = [
            ("client_id", self.client.config().client_id.as_str()),
            ("token_type", "refresh_token"),
            ("token", refresh_token.as_str()),
        ];
        let response = self
            .client
            .http()
            .post(&self.partner.revoke_url)
            .form(&form)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            tracing::warn!(partner = self.partner.id, status = raw.status.as_u16(), "token revocation rejected");
            return Err(CloudError::Revocation(raw.rejection()));
        }

        self.session = None;
        self.state = AuthState::Revoked;
        tracing::info!(partner = self.partner.id, "logged out");
        Ok(())
    }
}

/// Extract the `code` query parameter from an authorize redirect
///
/// `location` may be relative; it is resolved against `base`.
pub fn parse_authorization_code(base: &Url, location: &str) -> Result<String> {
    let url = base.join(location).map_err(|e| {
        CloudError::Authorization(Failure::malformed(format!("invalid Location header: {}", e)))
    })?;

    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" if code.is_none() => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    match (code, error) {
        (Some(code), _) if !code.is_empty() => Ok(code),
        (_, Some(error)) => Err(CloudError::Authorization(Failure::malformed(format!(
            "authorize endpoint returned error {}",
            error
        )))),
        _ => Err(CloudError::Authorization(Failure::malformed(
            "no code in authorize redirect",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::partner::HUGENDUBEL;

    fn base() -> Url {
        Url::parse("https://www.hugendubel.de/oauth2/authorize").unwrap()
    }

    #[test]
    fn test_parse_code_from_absolute_location() {
        let location = "https://webreader.hugendubel.de/library/library.html?code=AbC123&state=x#!/library";
        assert_eq!(parse_authorization_code(&base(), location).unwrap(), "AbC123");
    }

    #[test]
    fn test_parse_code_from_relative_location() {
        let location = "/library/index.html?code=r3l";
        assert_eq!(parse_authorization_code(&base(), location).unwrap(), "r3l");
    }

    #[test]
    fn test_parse_code_missing() {
        let err = parse_authorization_code(&base(), "https://webreader.hugendubel.de/library/").unwrap_err();
        assert!(matches!(err, CloudError::Authorization(Failure::Malformed(_))));
    }

    #[test]
    fn test_parse_code_error_parameter() {
        let location = "https://webreader.hugendubel.de/?error=access_denied";
        let err = parse_authorization_code(&base(), location).unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_new_authenticator_is_unauthenticated() {
        let registry = PartnerRegistry::builtin();
        let auth = SessionAuthenticator::for_partner(&registry, HUGENDUBEL, ClientConfig::default()).unwrap();
        assert_eq!(auth.state(), AuthState::Unauthenticated);
        assert!(!auth.is_authenticated());
        assert!(matches!(auth.session(), Err(CloudError::NotAuthenticated)));
        assert!(matches!(auth.auth_headers(true), Err(CloudError::NotAuthenticated)));
    }

    #[test]
    fn test_unknown_partner_fails_immediately() {
        let registry = PartnerRegistry::builtin();
        let result = SessionAuthenticator::for_partner(&registry, 4711, ClientConfig::default());
        assert!(matches!(result, Err(CloudError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_logout_requires_authentication() {
        let mut auth = SessionAuthenticator::new(PartnerConfig::hugendubel(), ClientConfig::default()).unwrap();
        assert!(matches!(auth.logout().await, Err(CloudError::InvalidState(_))));
        assert_eq!(auth.state(), AuthState::Unauthenticated);
    }

    #[test]
    fn test_session_rejects_unusable_lifetimes() {
        for expires_in in [0, -5, 9_000_000_000_000, i64::MAX] {
            let result = Session::new("access".to_string(), "refresh".to_string(), expires_in);
            assert!(matches!(result, Err(Failure::Malformed(_))), "expires_in {}", expires_in);
        }
    }

    #[test]
    fn test_session_expiry_and_masking() {
        let session = Session::new("access".to_string(), "refresh".to_string(), 3600).unwrap();
        assert!(!session.is_expired());
        assert!(session.expires_at() > Utc::now());

        let mut expired = session.clone();
        expired.expires_at = Utc::now() - Duration::seconds(1);
        assert!(expired.is_expired());

        let debug = format!("{:?}", session);
        assert!(!debug.contains("access\""));
        assert!(!debug.contains("refresh\""));
        assert!(debug.contains("3600"));
    }
}
