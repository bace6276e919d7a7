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


//! Streaming a response body to disk
//!
//! The body is never buffered whole: every network chunk is written in
//! fixed-size slices through a `BufWriter` and the file is flushed once the
//! stream ends. Zero-length chunks are skipped.
//!
//! A stream that fails midway leaves the partially written file in place.

use crate::download::progress::DownloadProgress;
use crate::error::{CloudError, Result};
use futures_util::{pin_mut, Stream, StreamExt};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Size of each write to the destination file
pub const CHUNK_SIZE: usize = 1024;

/// Capacity of the write buffer in front of the file
const WRITE_BUFFER_SIZE: usize = 8 * 1024;

/// Write every chunk of `stream` to a new file at `path`
///
/// `on_progress` is called after each non-empty network chunk has been
/// written. Returns the number of bytes written.
///
/// # Errors
/// - `Io` - the file cannot be created or written
/// - whatever the stream yields (e.g. `Transport`), unchanged
pub async fn write_to_file<S, B, E, F>(
    stream: S,
    path: &Path,
    total_bytes: Option<u64>,
    mut on_progress: F,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    CloudError: From<E>,
    F: FnMut(DownloadProgress),
{
    let file = File::create(path).await?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut progress = DownloadProgress::new(total_bytes);

    pin_mut!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let bytes = chunk.as_ref();
        if bytes.is_empty() {
            continue;
        }

        for slice in bytes.chunks(CHUNK_SIZE) {
            writer.write_all(slice).await?;
        }

        progress.bytes_written += bytes.len() as u64;
        on_progress(progress);
    }

    writer.flush().await?;
    writer.into_inner().sync_all().await?;

    tracing::debug!(path = %path.display(), bytes = progress.bytes_written, "stream written");
    Ok(progress.bytes_written)
}
