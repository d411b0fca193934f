//! Test utilities for espota-api
//!
//! Runs the router on an ephemeral port with a throwaway binary store.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use espota_api::{create_router, AppState};
use espota_core::Config;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const CATALOG: &str = r#"{
    "ABCD": { "version": "2.0", "file": "fw_2_0.bin" },
    "GONE": { "version": "1.0", "file": "missing.bin" }
}"#;

/// A binary store with a catalog and one firmware file
pub struct Store {
    pub dir: TempDir,
    pub firmware: Vec<u8>,
}

impl Store {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join("bin")).expect("Failed to create bin dir");
        std::fs::write(dir.path().join("bin/xremote_latest.txt"), CATALOG)
            .expect("Failed to write catalog");

        let firmware: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        std::fs::write(dir.path().join("bin/fw_2_0.bin"), &firmware)
            .expect("Failed to write firmware");

        Self { dir, firmware }
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.dir.path().join("bin")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("requests.log")
    }

    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.store.binary_dir = self.bin_dir();
        config.log.file_pattern = self.log_path().to_string_lossy().into_owned();
        config
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }
}

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve `config` on 127.0.0.1 with connect info enabled
    pub async fn start(config: Config) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = create_router(AppState::new(config));

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build client");

        Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET /update with the full ESP8266 updater header set
    pub fn device_get(&self, version: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url("/update"))
            .header("User-Agent", "ESP8266-http-Update")
            .header("X-ESP8266-STA-MAC", "18:FE:34:00:00:01")
            .header("X-ESP8266-AP-MAC", "1A:FE:34:00:00:01")
            .header("X-ESP8266-FREE-SPACE", "667648")
            .header("X-ESP8266-SKETCH-SIZE", "378800")
            .header("X-ESP8266-SKETCH-MD5", "0123456789abcdef0123456789abcdef")
            .header("X-ESP8266-CHIP-SIZE", "4194304")
            .header("X-ESP8266-SDK-VERSION", "2.2.2-dev(38a443e)")
            .header("X-ESP8266-VERSION", version)
    }

    /// Shutdown the server gracefully
    #[allow(dead_code)]
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
