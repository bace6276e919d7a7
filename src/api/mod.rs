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


//! Tolino cloud API client implementation
//!
//! Everything a reading client needs to talk to the cloud of a partner shop:
//! session login via the partner site and OAuth, device registration,
//! inventory retrieval and content transfer.
//!
//! # Modules
//! - `hardware` - per-install hardware id
//! - `partner` - partner endpoint table
//! - `client` - cookie-carrying HTTP client and header helpers
//! - `auth` - login handshake and session lifecycle
//! - `devices` - device registration and listing
//! - `inventory` - uploaded and purchased content
//! - `transfer` - upload, delete and download

pub mod auth;
pub mod client;
pub mod devices;
pub mod hardware;
pub mod inventory;
pub mod partner;
pub mod transfer;

// Re-export commonly used types
pub use auth::{AuthState, Session, SessionAuthenticator};
pub use client::{ClientConfig, CloudClient};
pub use devices::{Device, DeviceManager, DeviceTarget};
pub use hardware::{HardwareCodes, HardwareIdentity, OsFamily};
pub use inventory::{CatalogClient, CatalogEntry};
pub use partner::{PartnerConfig, PartnerRegistry};
pub use transfer::{ContentTransferClient, DownloadInfo};
