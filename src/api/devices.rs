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


//! Reading-device registration and listing
//!
//! # Endpoints
//! - `POST <register_url>` with `{initAppRequest: {...}}` registers this
//!   hardware id with the account
//! - `POST <unregister_url>` with `{deleteDevicesRequest: {...}}` removes a
//!   device from the account
//! - `POST <devices_url>` with `{deviceListRequest: {...}}` lists every
//!   device registered to the account

use crate::api::auth::SessionAuthenticator;
use crate::api::client::{RawResponse, Scalar};
use crate::error::{CloudError, Failure, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

/// Hardware and client type the web reader registers as
pub const HTML5_CLIENT_TYPE: &str = "HTML5_1";

/// Generic hardware name sent on registration
pub const GENERIC_HARDWARE_NAME: &str = "other";

/// Which device an unregister call removes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// The hardware id this session presents
    ThisDevice,
    /// Another device of the account, by device id
    Id(String),
}

impl From<&str> for DeviceTarget {
    fn from(id: &str) -> Self {
        DeviceTarget::Id(id.to_string())
    }
}

impl From<String> for DeviceTarget {
    fn from(id: String) -> Self {
        DeviceTarget::Id(id)
    }
}

/// A reading device registered to the account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: String,
    pub name: String,
    /// Human-readable device type, or the raw code if it is not a known one
    pub device_type: String,
    /// Reseller id the device was registered through
    pub partner: u32,
    /// Registration time (epoch milliseconds)
    pub registered: i64,
    /// Last usage time (epoch milliseconds)
    pub last_usage: i64,
}

impl Device {
    pub fn registered_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.registered)
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_usage)
    }
}

/// Map a raw device type code to its display label
///
/// Unknown codes are returned unchanged.
pub fn device_type_label(raw: &str) -> &str {
    match raw {
        "unknown_imx50_rdp_1" => "tolino shine",
        "tolino_vison" => "tolino vision",
        "HTML5_1" => "web browser",
        other => other,
    }
}

#[derive(Deserialize)]
struct DeviceListEnvelope {
    #[serde(rename = "deviceListResponse")]
    response: DeviceListBody,
}

#[derive(Deserialize)]
struct DeviceListBody {
    devices: Vec<RawDevice>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDevice {
    device_id: Scalar,
    device_name: String,
    device_type: String,
    reseller_id: Scalar,
    device_registered: Scalar,
    device_last_usage: Scalar,
}

impl RawDevice {
    fn into_device(self) -> std::result::Result<Device, Failure> {
        let partner = self.reseller_id.to_i64("resellerId")?;
        let partner = u32::try_from(partner)
            .map_err(|_| Failure::malformed(format!("resellerId out of range: {}", partner)))?;

        Ok(Device {
            id: self.device_id.into_string(),
            name: self.device_name,
            device_type: device_type_label(&self.device_type).to_string(),
            partner,
            registered: self.device_registered.to_i64("deviceRegistered")?,
            last_usage: self.device_last_usage.to_i64("deviceLastUsage")?,
        })
    }
}

/// Device operations on an authenticated session
#[derive(Debug, Clone, Copy)]
pub struct DeviceManager<'a> {
    auth: &'a SessionAuthenticator,
}

impl<'a> DeviceManager<'a> {
    pub fn new(auth: &'a SessionAuthenticator) -> Self {
        Self { auth }
    }

    /// Register this hardware id as a reading device of the account
    ///
    /// # Errors
    /// - `DeviceRegistration` - the service answered with anything but 200
    /// - `NotAuthenticated` - no usable session
    pub async fn register(&self) -> Result<()> {
        let headers = self.auth.auth_headers(true)?;
        let hardware_id = self.auth.hardware_id();
        let body = json!({
            "initAppRequest": {
                "hardware_id": hardware_id,
                "hardware_type": HTML5_CLIENT_TYPE,
                "client_type": HTML5_CLIENT_TYPE,
                "hardware_name": GENERIC_HARDWARE_NAME,
            }
        });

        let response = self
            .auth
            .client()
            .http()
            .post(&self.auth.partner().register_url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            tracing::warn!(status = raw.status.as_u16(), "hardware registration rejected");
            return Err(CloudError::DeviceRegistration(raw.rejection()));
        }

        tracing::info!(hardware_id, "device registered");
        Ok(())
    }

    /// Remove a device from the account
    ///
    /// # Errors
    /// - `DeviceUnregistration` - carrying the service's message when it sent one
    /// - `NotAuthenticated` - no usable session
    pub async fn unregister(&self, target: DeviceTarget) -> Result<()> {
        let device_id = match target {
            DeviceTarget::ThisDevice => self.auth.hardware_id().to_string(),
            DeviceTarget::Id(id) => id,
        };

        let session = self.auth.session()?;
        let partner = self.auth.partner().id;
        let headers = self.auth.auth_headers(false)?;
        let body = json!({
            "deleteDevicesRequest": {
                "accounts": [{
                    "auth_token": session.access_token(),
                    "reseller_id": partner,
                }],
                "devices": [{
                    "device_id": device_id,
                    "reseller_id": partner,
                }],
            }
        });

        let response = self
            .auth
            .client()
            .http()
            .post(&self.auth.partner().unregister_url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            let failure = raw.rejection();
            tracing::warn!(device_id = %device_id, status = raw.status.as_u16(), "unregister rejected");
            return Err(CloudError::DeviceUnregistration { device_id, failure });
        }

        tracing::info!(device_id = %device_id, "device unregistered");
        Ok(())
    }

    /// Remove this hardware id from the account
    pub async fn unregister_self(&self) -> Result<()> {
        self.unregister(DeviceTarget::ThisDevice).await
    }

    /// List every device registered to the account
    ///
    /// # Errors
    /// - `DeviceList` - non-200 status or a device record with missing or
    ///   non-numeric fields
    /// - `NotAuthenticated` - no usable session
    pub async fn devices(&self) -> Result<Vec<Device>> {
        let session = self.auth.session()?;
        let headers = self.auth.auth_headers(false)?;
        let body = json!({
            "deviceListRequest": {
                "accounts": [{
                    "auth_token": session.access_token(),
                    "reseller_id": self.auth.partner().id,
                }]
            }
        });

        let response = self
            .auth
            .client()
            .http()
            .post(&self.auth.partner().devices_url)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            return Err(CloudError::DeviceList(raw.rejection()));
        }

        let envelope: DeviceListEnvelope = raw.json().map_err(CloudError::DeviceList)?;
        let devices = envelope
            .response
            .devices
            .into_iter()
            .map(RawDevice::into_device)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(CloudError::DeviceList)?;

        tracing::debug!(count = devices.len(), "device list retrieved");
        Ok(devices)
    }
}
