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


//! Client library for the tolino cloud
//!
//! ```no_run
//! use tolino_cloud::{ClientConfig, PartnerRegistry, SessionAuthenticator};
//!
//! # async fn run() -> tolino_cloud::Result<()> {
//! let registry = PartnerRegistry::builtin();
//! let mut auth = SessionAuthenticator::for_partner(&registry, 13, ClientConfig::default())?;
//! auth.login("reader@example.com", "secret").await?;
//!
//! for entry in auth.catalog().inventory().await? {
//!     println!("{} - {}", entry.id, entry.title);
//! }
//!
//! auth.logout().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod download;
pub mod error;

pub use api::{
    AuthState, CatalogEntry, ClientConfig, Device, DeviceTarget, DownloadInfo, HardwareIdentity,
    PartnerConfig, PartnerRegistry, SessionAuthenticator,
};
pub use download::DownloadProgress;
pub use error::{CloudError, Failure, Result};
