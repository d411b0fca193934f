//! E2E tests for the OTA update endpoint
//!
//! Each test starts a real server on an ephemeral port and talks to it the
//! way an ESP8266 updater would.

mod common;

use common::{Store, TestServer};
use espota_core::md5_hex;
use futures::future::join_all;
use reqwest::StatusCode;

#[tokio::test]
async fn test_new_firmware_download() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let response = server.device_get("1.9_ABCD").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(
        headers["content-disposition"],
        "attachment; filename=fw_2_0.bin"
    );
    assert_eq!(
        headers["content-length"],
        store.firmware.len().to_string().as_str()
    );
    assert_eq!(headers["x-md5"], md5_hex(&store.firmware).as_str());

    let body = response.bytes().await.unwrap();
    assert_eq!(body.as_ref(), store.firmware.as_slice());
    assert_eq!(md5_hex(&body), headers["x-md5"].to_str().unwrap());

    let log = store.log();
    assert!(log.starts_with("User: 127.0.0.1 - "));
    assert!(log.contains("Msg: Update: ABCD 1.9 -> 2.0\n"));
}

#[tokio::test]
async fn test_up_to_date_repeats() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    for _ in 0..5 {
        let response = server.device_get("2.0_ABCD").send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
        assert!(response.bytes().await.unwrap().is_empty());
    }

    assert_eq!(store.log().matches("Msg: Up to date: ").count(), 5);
}

#[tokio::test]
async fn test_foreign_client_forbidden() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let response = server
        .client
        .get(server.url("/update"))
        .header("X-ESP8266-VERSION", "1.9_ABCD")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(response.headers().get("x-md5").is_none());
    assert!(response.bytes().await.unwrap().is_empty());
    assert!(store.log().contains("Msg: Invalid request.\n"));
}

#[tokio::test]
async fn test_short_version_500() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let response = server.device_get("1_AB").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_binary_500() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    for version in ["0.5_GONE", "1.0_GONE"] {
        let response = server.device_get(version).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.bytes().await.unwrap().is_empty());
    }
    assert_eq!(store.log().matches("Msg: Missing file: ").count(), 2);
}

#[tokio::test]
async fn test_catalog_published_between_requests() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let response = server.device_get("2.0_ABCD").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    // Release process publishes 2.1; the next request must see it
    std::fs::write(store.bin_dir().join("fw_2_1.bin"), b"v2.1").unwrap();
    std::fs::write(
        store.bin_dir().join("xremote_latest.txt"),
        r#"{"ABCD": {"version": "2.1", "file": "fw_2_1.bin"}}"#,
    )
    .unwrap();

    let response = server.device_get("2.0_ABCD").send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.bytes().await.unwrap().as_ref(), b"v2.1");
}

#[tokio::test]
async fn test_concurrent_requests_log_every_record() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let requests = (0..20).map(|i| {
        let version = if i % 2 == 0 { "2.0_ABCD" } else { "1.9_ABCD" };
        server.device_get(version).send()
    });
    for response in join_all(requests).await {
        let response = response.unwrap();
        assert!(matches!(
            response.status(),
            StatusCode::OK | StatusCode::NOT_MODIFIED
        ));
    }

    assert_eq!(store.log().matches("-------------------------\n").count(), 20);
}

#[tokio::test]
async fn test_health() {
    let store = Store::new();
    let server = TestServer::start(store.config()).await;

    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");
    assert!(store.log().is_empty());
}
