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


//! Hardware fingerprint presented to the cloud
//!
//! The cloud only accepts hardware registration from clients that send a
//! hardware id in the shape the web reader produces:
//!
//! ```text
//! 1233X-44XXX-XXXXX-XXXXX-XXXXh
//!
//! 1  = operating system family
//! 2  = browser engine
//! 33 = browser
//! 44 = browser version
//! X  = fingerprint payload
//! ```
//!
//! Only the OS family is derived from the host. The engine, browser, version
//! and fingerprint codes are placeholders whose expected values are not
//! known; [`HardwareCodes`] lets callers override them.

use crate::error::{CloudError, Result};
use lazy_static::lazy_static;
use std::fmt;

/// Total length of a hardware id
pub const HARDWARE_ID_LEN: usize = 29;

/// Placeholder browser engine code
pub const DEFAULT_ENGINE_ID: &str = "x";

/// Placeholder browser code
pub const DEFAULT_BROWSER_ID: &str = "xx";

/// Placeholder browser version code
pub const DEFAULT_VERSION_ID: &str = "00";

/// Placeholder fingerprint payload
pub const DEFAULT_FINGERPRINT: &str = "ABCDEFGHIJKLMNOPQR";

lazy_static! {
    static ref SHARED_IDENTITY: HardwareIdentity =
        HardwareIdentity::compose(OsFamily::current(), &HardwareCodes::default());
}

/// Operating system family encoded in the first character of the id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    /// Any other platform
    Other,
}

impl OsFamily {
    /// Family of the host this process runs on
    pub fn current() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Map a `std::env::consts::OS` value to its family
    pub fn from_os_name(os: &str) -> Self {
        match os {
            "windows" => Self::Windows,
            "macos" => Self::MacOs,
            "linux" => Self::Linux,
            _ => Self::Other,
        }
    }

    /// Single-character code used in the hardware id
    pub fn code(&self) -> char {
        match self {
            Self::Windows => '1',
            Self::MacOs => '2',
            Self::Linux => '3',
            Self::Other => 'x',
        }
    }
}

/// Browser and fingerprint codes mixed into the hardware id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareCodes {
    /// Browser engine code (1 character)
    pub engine_id: String,
    /// Browser code (2 characters)
    pub browser_id: String,
    /// Browser version code (2 characters)
    pub version_id: String,
    /// Fingerprint payload (18 characters)
    pub fingerprint: String,
}

impl Default for HardwareCodes {
    fn default() -> Self {
        Self {
            engine_id: DEFAULT_ENGINE_ID.to_string(),
            browser_id: DEFAULT_BROWSER_ID.to_string(),
            version_id: DEFAULT_VERSION_ID.to_string(),
            fingerprint: DEFAULT_FINGERPRINT.to_string(),
        }
    }
}

impl HardwareCodes {
    /// Check every code has the width its slot in the id requires
    pub fn validate(&self) -> Result<()> {
        check_code("engine_id", &self.engine_id, 1)?;
        check_code("browser_id", &self.browser_id, 2)?;
        check_code("version_id", &self.version_id, 2)?;
        check_code("fingerprint", &self.fingerprint, 18)
    }
}

fn check_code(field: &str, value: &str, width: usize) -> Result<()> {
    if value.len() != width || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CloudError::configuration(format!(
            "hardware {} must be {} ASCII letters or digits, got {:?}",
            field, width, value
        )));
    }
    Ok(())
}

/// Hardware id string identifying this installation as a reading device
///
/// Immutable once built. Use [`HardwareIdentity::shared`] for the
/// process-wide id computed from the host; build one with
/// [`HardwareIdentity::with_codes`] to present different codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareIdentity {
    os: OsFamily,
    id: String,
}

impl HardwareIdentity {
    /// The process-wide identity, computed once on first use
    pub fn shared() -> &'static HardwareIdentity {
        &SHARED_IDENTITY
    }

    /// Build an identity for the host OS with custom codes
    pub fn with_codes(codes: &HardwareCodes) -> Result<Self> {
        Self::for_os(OsFamily::current(), codes)
    }

    /// Build an identity for an explicit OS family
    pub fn for_os(os: OsFamily, codes: &HardwareCodes) -> Result<Self> {
        codes.validate()?;
        Ok(Self::compose(os, codes))
    }

    // Codes must already be validated.
    fn compose(os: OsFamily, codes: &HardwareCodes) -> Self {
        let fp = &codes.fingerprint;
        let id = format!(
            "{}{}{}{}-{}{}-{}-{}-{}h",
            os.code(),
            codes.engine_id,
            codes.browser_id,
            &fp[0..1],
            codes.version_id,
            &fp[1..4],
            &fp[4..9],
            &fp[9..14],
            &fp[14..18],
        );
        Self { os, id }
    }

    /// The hardware id string
    pub fn as_str(&self) -> &str {
        &self.id
    }

    /// OS family encoded in the id
    pub fn os(&self) -> OsFamily {
        self.os
    }
}

impl Default for HardwareIdentity {
    fn default() -> Self {
        Self::shared().clone()
    }
}

impl fmt::Display for HardwareIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
