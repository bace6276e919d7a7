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


//! Content upload, deletion and download
//!
//! # Endpoints
//! - `POST <upload_url>` multipart field `file` -> `{metadata: {deliverableId}}`
//! - `GET <delete_url>?deliverableId=<id>`
//! - `GET <downloadinfo_url>` with the base64 id filled in twice
//!   -> `{DownloadInfo: {contentUrl, format}}`
//! - `GET <contentUrl>` streamed to disk

use crate::api::auth::SessionAuthenticator;
use crate::api::client::{RawResponse, Scalar};
use crate::download::{write_to_file, DownloadProgress};
use crate::error::{CloudError, Failure, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use url::Url;

/// MIME type used for files whose extension is not recognized
pub const DEFAULT_UPLOAD_MIME: &str = "application/pdf";

/// Resolved download location of a deliverable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    /// Content URL to fetch
    pub url: String,
    /// Suggested local filename, taken from the URL's last path segment
    pub filename: String,
    /// Format label reported by the service (e.g. `EPUB`)
    pub format: String,
}

#[derive(Deserialize)]
struct UploadEnvelope {
    metadata: UploadMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadMetadata {
    deliverable_id: Scalar,
}

#[derive(Deserialize)]
struct DownloadInfoEnvelope {
    #[serde(rename = "DownloadInfo")]
    info: RawDownloadInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDownloadInfo {
    content_url: String,
    format: String,
}

/// MIME type the service expects for a file, by extension
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        _ => DEFAULT_UPLOAD_MIME,
    }
}

/// Local filename for a content URL
///
/// Uses the last path segment with the query dropped and percent-escapes
/// decoded. Empty segments and names that would leave the destination
/// directory are rejected.
pub fn filename_from_url(url: &str) -> std::result::Result<String, Failure> {
    let parsed =
        Url::parse(url).map_err(|e| Failure::malformed(format!("invalid content URL {}: {}", url, e)))?;

    let segment = parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();

    let name = urlencoding::decode(segment)
        .map_err(|e| Failure::malformed(format!("content URL is not UTF-8: {}", e)))?
        .into_owned();

    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Failure::malformed(format!("no usable filename in content URL {}", url)));
    }
    Ok(name)
}

fn parse_deliverable_id(raw: &RawResponse) -> std::result::Result<String, Failure> {
    let envelope: UploadEnvelope = raw.json()?;
    let id = envelope.metadata.deliverable_id.into_string();
    if id.is_empty() {
        return Err(Failure::malformed("empty deliverableId"));
    }
    Ok(id)
}

fn parse_download_info(raw: &RawResponse) -> std::result::Result<DownloadInfo, Failure> {
    let envelope: DownloadInfoEnvelope = raw.json()?;
    let filename = filename_from_url(&envelope.info.content_url)?;
    Ok(DownloadInfo {
        url: envelope.info.content_url,
        filename,
        format: envelope.info.format,
    })
}

/// Upload, delete and download operations on an authenticated session
#[derive(Debug, Clone, Copy)]
pub struct ContentTransferClient<'a> {
    auth: &'a SessionAuthenticator,
}

impl<'a> ContentTransferClient<'a> {
    pub fn new(auth: &'a SessionAuthenticator) -> Self {
        Self { auth }
    }

    /// Upload a local file to the account's cloud library
    ///
    /// The file is streamed from disk. Returns the deliverable id the service assigned.
    ///
    /// # Errors
    /// - `Upload` - non-200 status or no deliverable id in the response
    /// - `Io` - the file cannot be read
    /// - `InvalidInput` - the path has no file name
    pub async fn upload(&self, path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| CloudError::invalid_input(format!("not a file path: {}", path.display())))?;
        let mime = mime_for_path(path);

        let headers = self.auth.auth_headers(true)?;
        let file = File::open(path).await?;
        let size = file.metadata().await?.len();
        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, size)
            .file_name(name.clone())
            .mime_str(mime)?;
        let form = Form::new().part("file", part);

        tracing::debug!(file = %name, mime, size, "uploading");

        let response = self
            .auth
            .client()
            .http()
            .post(&self.auth.partner().upload_url)
            .headers(headers)
            .multipart(form)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            tracing::warn!(file = %name, status = raw.status.as_u16(), "upload rejected");
            return Err(CloudError::Upload(raw.rejection()));
        }

        let id = parse_deliverable_id(&raw).map_err(CloudError::Upload)?;
        tracing::info!(file = %name, deliverable_id = %id, "uploaded");
        Ok(id)
    }

    /// Delete content from the account's cloud library
    ///
    /// # Errors
    /// - `Delete` - carrying the service's message when it sent one
    pub async fn delete(&self, id: &str) -> Result<()> {
        let headers = self.auth.auth_headers(true)?;
        let response = self
            .auth
            .client()
            .http()
            .get(&self.auth.partner().delete_url)
            .query(&[("deliverableId", id)])
            .headers(headers)
            .send()
            .await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            let failure = raw.rejection();
            tracing::warn!(deliverable_id = %id, status = raw.status.as_u16(), "delete rejected");
            return Err(CloudError::Delete {
                id: id.to_string(),
                failure,
            });
        }

        tracing::info!(deliverable_id = %id, "deleted");
        Ok(())
    }

    /// Resolve where a deliverable can be downloaded from
    ///
    /// # Errors
    /// - `DownloadInfo` - non-200 status, missing fields or no usable filename
    pub async fn download_info(&self, id: &str) -> Result<DownloadInfo> {
        let encoded = STANDARD.encode(id.as_bytes());
        let url = self.auth.partner().download_info_url(&encoded);
        let headers = self.auth.auth_headers(true)?;

        let response = self.auth.client().http().get(&url).headers(headers).send().await?;

        let raw = RawResponse::read(response).await?;
        if !raw.is_ok() {
            return Err(CloudError::DownloadInfo(raw.rejection()));
        }

        parse_download_info(&raw).map_err(CloudError::DownloadInfo)
    }

    /// Download a deliverable into `dest` (or the working directory)
    ///
    /// Returns the path of the written file.
    pub async fn download(&self, dest: Option<&Path>, id: &str) -> Result<PathBuf> {
        self.download_with_progress(dest, id, |_| {}).await
    }

    /// Download a deliverable, reporting progress after every written chunk
    ///
    /// # Errors
    /// - `DownloadInfo` - the download location could not be resolved
    /// - `Download` - the content request was rejected
    /// - `Io` - the destination file cannot be written
    /// - `Transport` - the connection failed, including mid-stream
    pub async fn download_with_progress<F>(
        &self,
        dest: Option<&Path>,
        id: &str,
        on_progress: F,
    ) -> Result<PathBuf>
    where
        F: FnMut(DownloadProgress),
    {
        let info = self.download_info(id).await?;
        let headers = self.auth.auth_headers(true)?;

        let response = self
            .auth
            .client()
            .http()
            .get(&info.url)
            .headers(headers)
            .send()
            .await?;

        if response.status() != reqwest::StatusCode::OK {
            let raw = RawResponse::read(response).await?;
            tracing::warn!(deliverable_id = %id, status = raw.status.as_u16(), "download rejected");
            return Err(CloudError::Download(raw.rejection()));
        }

        let path = match dest {
            Some(dir) => dir.join(&info.filename),
            None => PathBuf::from(&info.filename),
        };
        let total = response.content_length();

        let written = write_to_file(response.bytes_stream(), &path, total, on_progress).await?;
        tracing::info!(deliverable_id = %id, path = %path.display(), bytes = written, "downloaded");
        Ok(path)
    }
}
