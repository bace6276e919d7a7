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


//! Content inventory of the account
//!
//! # Endpoint
//! `GET <inventory_url>?strip=true`
//!
//! ```json
//! {"PublicationInventory": {
//!     "edata": [ ...self-uploaded documents... ],
//!     "ebook": [ ...purchased books... ]
//! }}
//! ```
//!
//! Every item is a vendor metadata record:
//!
//! ```json
//! {"resellerId": "13",
//!  "epubMetaData": {
//!     "identifier": "...", "title": "...", "subtitle": "...",
//!     "author": [{"name": "..."}], "type": "EBOOK", "issued": "1388534400000",
//!     "deliverable": [{"contentFormat": "application/epub+zip", "purchased": "1416000000000"}]
//! }}
//! ```
//!
//! Parsing is all-or-nothing: one malformed record fails the whole call.

use crate::api::auth::SessionAuthenticator;
use crate::api::client::{RawResponse, Scalar};
use crate::error::{CloudError, Failure, Result};
use serde::Deserialize;
use serde_json::Value;

/// One publication in the account's inventory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Reseller id the publication belongs to
    pub partner: u32,
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// Author names in the order the service lists them
    pub authors: Vec<String>,
    /// MIME type of the first deliverable
    pub mime: String,
    /// Lower-cased content type (e.g. `ebook`)
    pub content_type: String,
    /// Issue date (epoch milliseconds)
    pub issued: i64,
    /// Purchase or upload date of the first deliverable (epoch milliseconds)
    pub purchased: i64,
}

#[derive(Deserialize)]
struct InventoryEnvelope {
    #[serde(rename = "PublicationInventory")]
    inventory: PublicationInventory,
}

#[derive(Deserialize)]
struct PublicationInventory {
    /// Self-uploaded documents
    edata: Vec<Value>,
    /// Purchased books
    ebook: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPublication {
    reseller_id: Scalar,
    epub_meta_data: EpubMetaData,
}

#[derive(Deserialize)]
struct EpubMetaData {
    identifier: Scalar,
    title: String,
    #[serde(default)]
    subtitle: Option<String>,
    author: Vec<Author>,
    deliverable: Vec<Deliverable>,
    #[serde(rename = "type")]
    kind: String,
    issued: Scalar,
}

#[derive(Deserialize)]
struct Author {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Deliverable {
    content_format: String,
    purchased: Scalar,
}

/// Parse one vendor metadata record into a catalog entry
pub fn parse_publication(record: &Value) -> std::result::Result<CatalogEntry, Failure> {
    let raw = RawPublication::deserialize(record).map_err(|e| Failure::malformed(e.to_string()))?;
    let meta = raw.epub_meta_data;

    let first = meta
        .deliverable
        .first()
        .ok_or_else(|| Failure::malformed("publication has no deliverable"))?;

    let partner = raw.reseller_id.to_i64("resellerId")?;
    let partner = u32::try_from(partner)
        .map_err(|_| Failure::malformed(format!("resellerId out of range: {}", partner)))?;

    Ok(CatalogEntry {
        partner,
        id: meta.identifier.into_string(),
        title: meta.title,
        subtitle: meta.subtitle,
        authors: meta.author.into_iter().map(|a| a.name).collect(),
        mime: first.content_format.clone(),
        content_type: meta.kind.to_lowercase(),
        issued: meta.issued.to_i64("issued")?,
        purchased: first.purchased.to_i64("purchased")?,
    })
}

/// Parse an inventory response body, self-uploaded entries first
fn parse_inventory(raw: &RawResponse) -> std::result::Result<Vec<CatalogEntry>, Failure> {
    let envelope: InventoryEnvelope = raw.json()?;
    let PublicationInventory { edata, ebook } = envelope.inventory;

    let sections = [("edata", &edata), ("ebook", &ebook)];
    let mut entries = Vec::with_capacity(edata.len() + ebook.len());
    for (section, records) in sections {
        for (index, record) in records.iter().enumerate() {
            let entry = parse_publication(record).map_err(|failure| {
                Failure::malformed(format!("{}[{}]: {}", section, index, failure))
            })?;
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Inventory operations on an authenticated session
#[derive(Debug, Clone, Copy)]
pub struct CatalogClient<'a> {
    auth: &'a SessionAuthenticator,
}

impl<'a> CatalogClient<'a> {
    pub fn new(auth: &'a SessionAuthenticator) -> Self {
        Self { auth }
    }

    /// Fetch self-uploaded and purchased content, in that order
    ///
    /// # Errors
    /// - `CatalogParse` - non-200 status, or any record that cannot be parsed
    ///   (no partial result is returned)
    /// - `NotAuthenticated` - no usable session
    pub async fn inventory(&self) -> Result<Vec<CatalogEntry>> {
        let headers = self.auth.auth_headers(true)?;
        let response = self
            .auth
            .client()
            .http()
            .get(&self.auth.partner().inventory_url)
            .query(&[("strip", "true")])
            .headers(headers)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            return Err(CloudError::CatalogParse(raw.rejection()));
        }

        let entries = parse_inventory(&raw).map_err(CloudError::CatalogParse)?;
        tracing::debug!(count = entries.len(), "inventory retrieved");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use serde_json::json;

    fn record(id: &str) -> Value {
        json!({
            "resellerId": "13",
            "epubMetaData": {
                "identifier": id,
                "title": format!("Title {}", id),
                "subtitle": "Sub",
                "author": [{"name": "Ann"}, {"name": "Bob"}],
                "type": "EBOOK",
                "issued": "1388534400000",
                "deliverable": [
                    {"contentFormat": "application/epub+zip", "purchased": "1416000000000"},
                    {"contentFormat": "application/pdf", "purchased": "1"}
                ]
            }
        })
    }

    fn response(body: Value) -> RawResponse {
        RawResponse {
            status: StatusCode::OK,
            body: serde_json::to_vec(&body).unwrap(),
        }
    }

    #[test]
    fn test_parse_publication_maps_fields() {
        let entry = parse_publication(&record("B1")).unwrap();
        assert_eq!(
            entry,
            CatalogEntry {
                partner: 13,
                id: "B1".to_string(),
                title: "Title B1".to_string(),
                subtitle: Some("Sub".to_string()),
                authors: vec!["Ann".to_string(), "Bob".to_string()],
                mime: "application/epub+zip".to_string(),
                content_type: "ebook".to_string(),
                issued: 1_388_534_400_000,
                purchased: 1_416_000_000_000,
            }
        );
    }

    #[test]
    fn test_parse_publication_without_deliverable() {
        let mut bad = record("B1");
        bad["epubMetaData"]["deliverable"] = json!([]);
        assert!(matches!(parse_publication(&bad), Err(Failure::Malformed(_))));
    }

    #[test]
    fn test_inventory_order_is_uploads_then_purchases() {
        let body = json!({"PublicationInventory": {
            "edata": [record("U1"), record("U2")],
            "ebook": [record("P1"), record("P2"), record("P3")]
        }});

        let ids: Vec<String> = parse_inventory(&response(body))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["U1", "U2", "P1", "P2", "P3"]);
    }

    #[test]
    fn test_inventory_single_bad_record_fails_all() {
        let mut bad = record("P2");
        bad["epubMetaData"]["issued"] = json!("not-a-date");
        let body = json!({"PublicationInventory": {
            "edata": [record("U1")],
            "ebook": [record("P1"), bad]
        }});

        let failure = parse_inventory(&response(body)).unwrap_err();
        assert!(failure.to_string().contains("ebook[1]"));
    }

    #[test]
    fn test_inventory_missing_section() {
        let body = json!({"PublicationInventory": {"ebook": []}});
        assert!(parse_inventory(&response(body)).is_err());
    }
}
