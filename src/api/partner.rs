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


//! Partner (reseller) endpoint configuration
//!
//! Each storefront integrated with the cloud has its own login site, OAuth
//! endpoints and REST surface. A partner is addressed by its numeric reseller
//! id, which is also sent as the `m_id` header on every authenticated call.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reseller id of Hugendubel.de
pub const HUGENDUBEL: u32 = 13;

/// Cookie the Hugendubel.de shop sets after a successful login
const HUGENDUBEL_LOGIN_COOKIE: &str = "shop[login]";

/// Endpoint set of one partner
///
/// `downloadinfo_url` is a template with two `{}` placeholders; both receive
/// the base64-encoded deliverable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerConfig {
    /// Reseller id (`m_id` / `reseller_id` on the wire)
    pub id: u32,
    /// Human-readable partner name
    pub name: String,
    /// Name of the cookie the partner site sets on successful login
    pub login_cookie: String,
    pub signup_url: String,
    pub profile_url: String,
    pub login_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub revoke_url: String,
    /// Web reader page, used as the OAuth redirect target
    pub reader_url: String,
    pub register_url: String,
    pub devices_url: String,
    pub unregister_url: String,
    pub upload_url: String,
    pub delete_url: String,
    pub inventory_url: String,
    pub downloadinfo_url: String,
}

impl PartnerConfig {
    /// Hugendubel.de, the partner shipped with the library
    pub fn hugendubel() -> Self {
        Self {
            id: HUGENDUBEL,
            name: "Hugendubel.de".to_string(),
            login_cookie: HUGENDUBEL_LOGIN_COOKIE.to_string(),
            signup_url: "https://www.hugendubel.de/go/my_my/my_newRegistration/".to_string(),
            profile_url: "https://www.hugendubel.de/go/my_my/my_data/".to_string(),
            login_url: "https://www.hugendubel.de/go/my_dry/my_login/lfa/login/receiver_object/my_login/".to_string(),
            auth_url: "https://www.hugendubel.de/oauth2/authorize".to_string(),
            token_url: "https://api.hugendubel.de/rest/oauth2/token".to_string(),
            revoke_url: "https://api.hugendubel.de/rest/oauth2/revoke".to_string(),
            reader_url: "https://webreader.hugendubel.de/library/library.html#!/library".to_string(),
            register_url: "https://bosh.pageplace.de/bosh/rest/registerhw".to_string(),
            devices_url: "https://bosh.pageplace.de/bosh/rest/handshake/devices/list".to_string(),
            unregister_url: "https://bosh.pageplace.de/bosh/rest/handshake/devices/delete".to_string(),
            upload_url: "https://bosh.pageplace.de/bosh/rest/upload".to_string(),
            delete_url: "https://bosh.pageplace.de/bosh/rest/deletecontent".to_string(),
            inventory_url: "https://bosh.pageplace.de/bosh/rest/inventory/delta".to_string(),
            downloadinfo_url: "https://bosh.pageplace.de/bosh/rest//cloud/downloadinfo/{}/{}/type/external-download".to_string(),
        }
    }

    /// Partner id as sent in the `m_id` header
    pub fn m_id(&self) -> String {
        self.id.to_string()
    }

    /// Fill both placeholders of the download-info template with `encoded_id`
    pub fn download_info_url(&self, encoded_id: &str) -> String {
        self.downloadinfo_url.replacen("{}", encoded_id, 2)
    }
}

/// Read-only table of known partners keyed by reseller id
#[derive(Debug, Clone, Default)]
pub struct PartnerRegistry {
    partners: BTreeMap<u32, PartnerConfig>,
}

impl PartnerRegistry {
    /// Registry with no partners
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the partners shipped with the library
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(PartnerConfig::hugendubel());
        registry
    }

    /// Add or replace a partner
    pub fn register(&mut self, partner: PartnerConfig) {
        self.partners.insert(partner.id, partner);
    }

    /// Add partners from a JSON array of partner records
    pub fn extend_from_json(&mut self, json: &str) -> Result<()> {
        let partners: Vec<PartnerConfig> = serde_json::from_str(json)
            .map_err(|e| CloudError::configuration(format!("invalid partner table: {}", e)))?;
        if let Some(bad) = partners
            .iter()
            .find(|p| p.downloadinfo_url.matches("{}").count() != 2)
        {
            return Err(CloudError::configuration(format!(
                "partner {}: downloadinfo_url needs two {{}} placeholders",
                bad.id
            )));
        }
        for partner in partners {
            self.register(partner);
        }
        Ok(())
    }

    /// Look up a partner by reseller id
    pub fn get(&self, id: u32) -> Result<&PartnerConfig> {
        self.partners
            .get(&id)
            .ok_or_else(|| CloudError::configuration(format!("unknown partner id {}", id)))
    }

    /// Human-readable name of a partner
    pub fn name(&self, id: u32) -> Result<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    /// All partners ordered by id
    pub fn partners(&self) -> impl Iterator<Item = &PartnerConfig> {
        self.partners.values()
    }
}
