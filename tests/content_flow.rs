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


//! Inventory and content transfer against a mocked partner

mod common;

use common::*;
use httpmock::prelude::*;
use serde_json::{json, Value};
use tempfile::TempDir;
use tolino_cloud::{CloudError, Failure};

fn publication(id: &str, title: &str) -> Value {
    json!({
        "resellerId": "13",
        "epubMetaData": {
            "identifier": id,
            "title": title,
            "author": [{"name": "A. Writer"}],
            "type": "EBOOK",
            "issued": "1388534400000",
            "deliverable": [{"contentFormat": "application/epub+zip", "purchased": "1416000000000"}]
        }
    })
}

#[tokio::test]
async fn test_inventory_uploads_then_purchases() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/inventory")
                .query_param("strip", "true")
                .header("t_auth_token", ACCESS_TOKEN)
                .header_exists("hardware_id");
            then.status(200).json_body(json!({
                "PublicationInventory": {
                    "edata": [publication("U1", "Notes"), publication("U2", "Slides")],
                    "ebook": [publication("P1", "Novel"), publication("P2", "Poems"), publication("P3", "Essays")]
                }
            }));
        })
        .await;

    let entries = auth.catalog().inventory().await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["U1", "U2", "P1", "P2", "P3"]);

    let novel = &entries[2];
    assert_eq!(novel.title, "Novel");
    assert_eq!(novel.subtitle, None);
    assert_eq!(novel.authors, vec!["A. Writer".to_string()]);
    assert_eq!(novel.mime, "application/epub+zip");
    assert_eq!(novel.content_type, "ebook");
    assert_eq!(novel.partner, 13);
    assert_eq!(novel.issued, 1_388_534_400_000);
    assert_eq!(novel.purchased, 1_416_000_000_000);
}

#[tokio::test]
async fn test_inventory_malformed_record_fails_whole_call() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let mut broken = publication("P2", "Poems");
    broken["epubMetaData"]
        .as_object_mut()
        .unwrap()
        .remove("title");

    server
        .mock_async(|when, then| {
            when.method(GET).path("/inventory");
            then.status(200).json_body(json!({
                "PublicationInventory": {
                    "edata": [publication("U1", "Notes")],
                    "ebook": [publication("P1", "Novel"), broken]
                }
            }));
        })
        .await;

    let err = auth.catalog().inventory().await.unwrap_err();
    assert!(matches!(err, CloudError::CatalogParse(Failure::Malformed(_))));
}

#[tokio::test]
async fn test_upload_returns_deliverable_id() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("book.epub");
    tokio::fs::write(&file, b"PK\x03\x04 fake epub").await.unwrap();

    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/upload")
                .header("t_auth_token", ACCESS_TOKEN)
                .body_contains("name=\"file\"")
                .body_contains("filename=\"book.epub\"")
                .body_contains("application/epub+zip")
                .body_contains("fake epub")
                .header_exists("content-length");
            then.status(200)
                .json_body(json!({"metadata": {"deliverableId": "DLV-77"}}));
        })
        .await;

    let id = auth.transfer().upload(&file).await.unwrap();
    assert_eq!(id, "DLV-77");
    upload.assert_async().await;
}

#[tokio::test]
async fn test_upload_without_id_fails() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let dir = TempDir::new().unwrap();
    let file = dir.path().join("paper.pdf");
    tokio::fs::write(&file, b"%PDF-1.4").await.unwrap();

    server
        .mock_async(|when, then| {
            when.method(POST).path("/upload");
            then.status(200).json_body(json!({"metadata": {}}));
        })
        .await;

    let err = auth.transfer().upload(&file).await.unwrap_err();
    assert!(matches!(err, CloudError::Upload(Failure::Malformed(_))));
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let dir = TempDir::new().unwrap();
    let err = auth
        .transfer()
        .upload(&dir.path().join("absent.epub"))
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Io(_)));
}

#[tokio::test]
async fn test_delete_passes_id_as_query() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let delete = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/deletecontent")
                .query_param("deliverableId", "DLV-77");
            then.status(200);
        })
        .await;

    auth.transfer().delete("DLV-77").await.unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn test_delete_rejected_carries_message() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/deletecontent");
            then.status(404)
                .json_body(json!({"ResponseInfo": {"message": "Unknown deliverable"}}));
        })
        .await;

    let err = auth.transfer().delete("nope").await.unwrap_err();
    assert_eq!(err.to_string(), "Delete nope failed: Unknown deliverable");
}

#[tokio::test]
async fn test_download_writes_identical_bytes() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    let content: Vec<u8> = (0..10_000u32).map(|i| (i * 7 % 256) as u8).collect();

    // base64("123") fills both template slots
    let info = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/downloadinfo/MTIz/MTIz/type/external-download")
                .header("t_auth_token", ACCESS_TOKEN);
            then.status(200).json_body(json!({
                "DownloadInfo": {
                    "contentUrl": server.url("/files/Reading%20List.epub"),
                    "format": "EPUB"
                }
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path_contains("/files/Reading")
                .header("t_auth_token", ACCESS_TOKEN);
            then.status(200).body(&content);
        })
        .await;

    let resolved = auth.transfer().download_info("123").await.unwrap();
    assert_eq!(resolved.filename, "Reading List.epub");
    assert_eq!(resolved.format, "EPUB");

    let dir = TempDir::new().unwrap();
    let mut last = None;
    let path = auth
        .transfer()
        .download_with_progress(Some(dir.path()), "123", |progress| last = Some(progress))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("Reading List.epub"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), content);
    assert_eq!(last.map(|p| p.bytes_written), Some(content.len() as u64));
    assert_eq!(info.hits_async().await, 2);
}

#[tokio::test]
async fn test_download_info_rejected() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/downloadinfo/");
            then.status(500);
        })
        .await;

    let err = auth.transfer().download(None, "123").await.unwrap_err();
    assert!(matches!(err, CloudError::DownloadInfo(Failure::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_download_rejected_carries_message() {
    let server = MockServer::start_async().await;
    let auth = logged_in(&server).await;

    server
        .mock_async(|when, then| {
            when.method(GET).path_contains("/downloadinfo/");
            then.status(200).json_body(json!({
                "DownloadInfo": {"contentUrl": server.url("/files/locked.epub"), "format": "EPUB"}
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/files/locked.epub");
            then.status(403)
                .json_body(json!({"ResponseInfo": {"message": "DRM license expired"}}));
        })
        .await;

    let dir = TempDir::new().unwrap();
    let err = auth
        .transfer()
        .download(Some(dir.path()), "123")
        .await
        .unwrap_err();
    assert!(matches!(err, CloudError::Download(_)));
    assert_eq!(err.service_message(), Some("DRM license expired"));
    assert!(!dir.path().join("locked.epub").exists());
}
