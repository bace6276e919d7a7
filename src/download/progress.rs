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


//! Download progress reporting

use serde::{Deserialize, Serialize};

/// Progress snapshot of a running download
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Bytes written to the destination file so far
    pub bytes_written: u64,

    /// Content length announced by the server, if any
    pub total_bytes: Option<u64>,
}

impl DownloadProgress {
    pub fn new(total_bytes: Option<u64>) -> Self {
        Self {
            bytes_written: 0,
            total_bytes,
        }
    }

    /// Percentage complete (0.0 - 100.0), `None` when the size is unknown
    pub fn percent(&self) -> Option<f64> {
        match self.total_bytes {
            Some(0) | None => None,
            Some(total) => Some((self.bytes_written as f64 / total as f64 * 100.0).min(100.0)),
        }
    }

    /// Check if every announced byte has been written
    pub fn is_complete(&self) -> bool {
        self.total_bytes
            .map(|total| self.bytes_written >= total)
            .unwrap_or(false)
    }
}
