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


//! Shared fixtures for the mocked cloud tests

#![allow(dead_code)]

use httpmock::prelude::*;
use tolino_cloud::api::client::WEB_READER_CLIENT_ID;
use tolino_cloud::{ClientConfig, PartnerConfig, SessionAuthenticator};

pub const USER: &str = "reader@example.com";
pub const PASSWORD: &str = "secret";
pub const AUTH_CODE: &str = "CODE42";
pub const ACCESS_TOKEN: &str = "ACCESS-1";
pub const REFRESH_TOKEN: &str = "REFRESH-1";

/// Partner whose every endpoint points at `server`
pub fn partner_for(server: &MockServer) -> PartnerConfig {
    PartnerConfig {
        id: 13,
        name: "Mock Books".to_string(),
        login_cookie: "shop[login]".to_string(),
        signup_url: server.url("/signup"),
        profile_url: server.url("/profile"),
        login_url: server.url("/login"),
        auth_url: server.url("/oauth2/authorize"),
        token_url: server.url("/oauth2/token"),
        revoke_url: server.url("/oauth2/revoke"),
        reader_url: server.url("/reader"),
        register_url: server.url("/registerhw"),
        devices_url: server.url("/devices/list"),
        unregister_url: server.url("/devices/delete"),
        upload_url: server.url("/upload"),
        delete_url: server.url("/deletecontent"),
        inventory_url: server.url("/inventory"),
        downloadinfo_url: server.url("/downloadinfo/{}/{}/type/external-download"),
    }
}

/// Mock the site login, authorize and token endpoints for a successful handshake
pub async fn mock_login(server: &MockServer) {
    mock_site_and_authorize(server).await;
    mock_token(
        server,
        serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "refresh_token": REFRESH_TOKEN,
            "expires_in": "3600",
            "token_type": "Bearer"
        }),
    )
    .await;
}

/// Mock a site login that sets the login cookie and an authorize step that issues `AUTH_CODE`
///
/// The authorize mock only matches when the site cookie is sent along.
pub async fn mock_site_and_authorize(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/login")
                .body_contains("form_send=1")
                .body_contains(format!("form%5Bpassword%5D={}", PASSWORD).as_str());
            then.status(200)
                .header("Set-Cookie", "shop[login]=session-abc; Path=/")
                .body("<html>welcome</html>");
        })
        .await;

    let location = format!("{}?code={}", server.url("/reader"), AUTH_CODE);
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/oauth2/authorize")
                .query_param("client_id", WEB_READER_CLIENT_ID)
                .query_param("response_type", "code")
                .query_param("scope", "ebook_library")
                .header_exists("cookie");
            then.status(302).header("Location", location.as_str());
        })
        .await;
}

/// Mock the token endpoint answering the code exchange with `body`
pub async fn mock_token(server: &MockServer, body: serde_json::Value) {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/oauth2/token")
                .body_contains(format!("code={}", AUTH_CODE).as_str())
                .body_contains("grant_type=authorization_code");
            then.status(200).json_body(body);
        })
        .await;
}

/// Authenticator logged in against `server`
pub async fn logged_in(server: &MockServer) -> SessionAuthenticator {
    mock_login(server).await;
    let mut auth = SessionAuthenticator::new(partner_for(server), ClientConfig::default())
        .expect("authenticator");
    auth.login(USER, PASSWORD).await.expect("login");
    auth
}
