/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use log::{info, warn};

use ftpfetch_client::{FtpLineDataReceiver, FtpMode};

use crate::config::{ClientConfig, ErrorPolicy, FetchConfig, FileEntry, StorageType};
use crate::connection::{ConnectionFactory, ConnectionManager, TcpConnectionFactory};
use crate::engine::TransferEngine;
use crate::error::{ConfigError, FetchError};
use crate::manifest::{FileManifest, ManifestReport};
use crate::storage::{ArtifactStore, DirectoryStore, MemoryStore};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ComponentState {
    Idle,
    Running,
}

/// Fetches a configured list of files from one FTP server.
///
/// Settings are collected through setters or [`from_config`](Self::from_config)
/// and validated on each [`setup`](Self::setup) call, before any connection
/// is made.
pub struct FtpFetchComponent {
    config: FetchConfig,
    store: Option<Box<dyn ArtifactStore>>,
    state: ComponentState,
    last_error: Option<FetchError>,
    last_report: Option<ManifestReport>,
}

impl Default for FtpFetchComponent {
    fn default() -> Self {
        FtpFetchComponent::from_config(FetchConfig::default())
    }
}

impl FtpFetchComponent {
    pub fn from_config(config: FetchConfig) -> Self {
        FtpFetchComponent {
            config,
            store: None,
            state: ComponentState::Idle,
            last_error: None,
            last_report: None,
        }
    }

    pub fn set_server(&mut self, server: &str) {
        self.config.client.set_server(server);
    }

    pub fn set_port(&mut self, port: u32) {
        self.config.client.set_port(port);
    }

    pub fn set_username(&mut self, username: &str) {
        self.config.client.set_username(username);
    }

    pub fn set_password(&mut self, password: &str) {
        self.config.client.set_password(password);
    }

    pub fn set_mode(&mut self, mode: FtpMode) {
        self.config.client.set_mode(mode);
    }

    pub fn set_transfer_buffer_size(&mut self, size: usize) {
        self.config.client.set_transfer_buffer_size(size);
    }

    pub fn set_timeout_ms(&mut self, timeout: u64) {
        self.config.client.set_timeout_ms(timeout);
    }

    pub fn set_on_error(&mut self, policy: ErrorPolicy) {
        self.config.client.set_on_error(policy);
    }

    pub fn set_download_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.config.client.set_download_dir(dir);
    }

    /// Use `store` instead of the one selected by the storage setting.
    pub fn set_store(&mut self, store: Box<dyn ArtifactStore>) {
        self.store = Some(store);
    }

    pub fn add_file(&mut self, source: &str, id: &str) -> Result<(), ConfigError> {
        let entry = FileEntry::new(source, id)?;
        self.config.files.push(entry);
        Ok(())
    }

    pub fn add_entry(&mut self, entry: FileEntry) {
        self.config.files.push(entry);
    }

    #[inline]
    pub fn state(&self) -> ComponentState {
        self.state
    }

    /// Error of the last setup, if any.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error
            .as_ref()
            .or_else(|| self.last_report.as_ref().and_then(|r| r.last_error()))
    }

    pub fn last_report(&self) -> Option<&ManifestReport> {
        self.last_report.as_ref()
    }

    pub fn store(&self) -> Option<&dyn ArtifactStore> {
        self.store.as_deref()
    }

    pub async fn read_file(&self, id: &str) -> io::Result<Option<Bytes>> {
        match &self.store {
            Some(store) => store.read(id).await,
            None => Ok(None),
        }
    }

    fn config_lines(&self) -> Vec<String> {
        let client = &self.config.client;
        let mut lines = vec![
            format!("server: {}", client.server()),
            format!("port: {}", client.port()),
            format!("username: {}", client.username()),
            "password: ******".to_string(),
            format!("mode: {}", client.mode()),
            format!("transfer buffer size: {}", client.transfer_buffer_size()),
            format!("timeout: {}ms", client.timeout_ms()),
            format!("on error: {}", client.on_error()),
            format!("download dir: {}", client.download_dir().display()),
        ];
        for entry in &self.config.files {
            lines.push(format!("file {}: {}", entry.id(), entry.source()));
        }
        lines
    }

    /// Log the current settings with the password masked.
    pub fn dump_config(&self) {
        info!("FTP fetch component:");
        for line in self.config_lines() {
            info!("  {line}");
        }

        let server = self.config.client.server();
        for entry in &self.config.files {
            if let Some(host) = entry.url_host()
                && !host.eq_ignore_ascii_case(server)
            {
                warn!(
                    "file {} refers to host {host} but will be fetched from {server}",
                    entry.id()
                );
            }
        }
    }

    fn validate(&mut self) -> Result<(ClientConfig, FileManifest), ConfigError> {
        match self.config.validate() {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!("invalid ftp fetch config: {e}");
                self.last_error = Some(FetchError::Configuration(e.clone()));
                Err(e)
            }
        }
    }

    /// Fetch every configured file over plain TCP.
    pub async fn setup(&mut self) -> Result<&ManifestReport, ConfigError> {
        self.setup_with(TcpConnectionFactory::default()).await
    }

    /// Fetch every configured file using connections made by `factory`.
    ///
    /// Configuration errors are returned before any connection is made.
    /// Failures of single files are recorded in the returned report.
    pub async fn setup_with<CF>(&mut self, factory: CF) -> Result<&ManifestReport, ConfigError>
    where
        CF: ConnectionFactory,
    {
        self.last_error = None;
        self.last_report = None;
        let (config, manifest) = self.validate()?;

        let store = self
            .store
            .get_or_insert_with(|| -> Box<dyn ArtifactStore> {
                match config.storage() {
                    StorageType::Memory => Box::new(MemoryStore::default()),
                    StorageType::Directory => Box::new(DirectoryStore::new(config.download_dir())),
                }
            });

        self.state = ComponentState::Running;
        let mut conn = ConnectionManager::new(&config, factory);
        let mut engine = TransferEngine::new(config.buffer_size());
        let report = manifest
            .run(&mut conn, &mut engine, store.as_mut(), config.on_error())
            .await;
        conn.release().await;
        self.state = ComponentState::Idle;

        if let Some(e) = report.last_error() {
            warn!("ftp fetch finished with error: {e}");
        }
        Ok(self.last_report.insert(report))
    }

    /// List a remote directory over plain TCP.
    pub async fn list_files(&mut self, path: Option<&str>) -> Result<Vec<String>, FetchError> {
        self.list_files_with(TcpConnectionFactory::default(), path)
            .await
    }

    pub async fn list_files_with<CF>(
        &mut self,
        factory: CF,
        path: Option<&str>,
    ) -> Result<Vec<String>, FetchError>
    where
        CF: ConnectionFactory,
    {
        let config = self.config.client.build()?;
        let mut conn = ConnectionManager::new(&config, factory);

        let r = list_directory(&mut conn, path).await;
        match &r {
            Ok(_) => conn.release().await,
            Err(_) => conn.discard(),
        }
        r
    }
}

#[derive(Default)]
struct LineCollector {
    lines: Vec<String>,
}

#[async_trait]
impl FtpLineDataReceiver for LineCollector {
    async fn recv_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    fn should_return_early(&self) -> bool {
        false
    }
}

async fn list_directory<CF>(
    conn: &mut ConnectionManager<CF>,
    path: Option<&str>,
) -> Result<Vec<String>, FetchError>
where
    CF: ConnectionFactory,
{
    let client = conn.session().await?;
    let data_stream = client.list_directory_start(path).await?;
    let mut collector = LineCollector::default();
    client
        .list_directory_receive(data_stream, &mut collector)
        .await?;
    Ok(collector.lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::{MockFactory, login_script};
    use crate::engine::TransferStatus;
    use tokio_test::io::Builder;

    fn component() -> FtpFetchComponent {
        let mut c = FtpFetchComponent::default();
        c.set_server("ftp.example.com");
        c.set_port(21);
        c.set_username("user");
        c.set_password("pass");
        c.set_mode(FtpMode::Passive);
        c.set_store(Box::new(MemoryStore::default()));
        c
    }

    #[tokio::test]
    async fn empty_password() {
        let mut c = component();
        c.set_password("");
        c.add_file("ftp://ftp.example.com/a.bin", "a").unwrap();

        let factory = MockFactory::default();
        let e = c.setup_with(factory.clone()).await.unwrap_err();
        assert_eq!(e, ConfigError::EmptyPassword);
        assert_eq!(factory.providers(), 0);
        assert_eq!(c.last_error().unwrap().kind(), "ConfigurationError");
        assert_eq!(c.state(), ComponentState::Idle);
    }

    #[tokio::test]
    async fn out_of_range_settings() {
        let factory = MockFactory::default();

        let mut c = component();
        c.set_port(70000);
        assert_eq!(
            c.setup_with(factory.clone()).await.unwrap_err(),
            ConfigError::PortOutOfRange(70000)
        );

        let mut c = component();
        c.set_transfer_buffer_size(64);
        assert_eq!(
            c.setup_with(factory.clone()).await.unwrap_err(),
            ConfigError::BufferSizeOutOfRange(64)
        );

        let mut c = component();
        c.set_timeout_ms(500);
        assert_eq!(
            c.setup_with(factory.clone()).await.unwrap_err(),
            ConfigError::TimeoutOutOfRange(500)
        );
        assert_eq!(factory.providers(), 0);
    }

    #[test]
    fn add_file_checks_entry() {
        let mut c = component();
        assert_eq!(c.add_file("", "a").unwrap_err(), ConfigError::EmptySource);
        assert_eq!(c.add_file("/a", " ").unwrap_err(), ConfigError::EmptyIdentifier);
        assert!(c.add_file("/a", "a").is_ok());
    }

    #[test]
    fn password_is_masked() {
        let mut c = component();
        c.set_password("secret-value");
        c.add_file("/pub/a.bin", "a").unwrap();
        let lines = c.config_lines();
        assert!(lines.iter().all(|l| !l.contains("secret-value")));
        assert!(lines.contains(&"password: ******".to_string()));
        assert!(lines.contains(&"file a: /pub/a.bin".to_string()));
        c.dump_config();
    }

    #[tokio::test]
    async fn setup_fetches_into_store() {
        let control = login_script(&mut Builder::new())
            .write(b"SIZE /a.bin\r\n")
            .read(b"213 3\r\n")
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(b"RETR /a.bin\r\n")
            .read(b"150 ok\r\n")
            .read(b"226 ok\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let data = Builder::new().read(b"abc").build();
        let factory = MockFactory::new(vec![control], vec![data]);

        let mut c = component();
        c.add_file("ftp://ftp.example.com/a.bin", "a").unwrap();
        let report = c.setup_with(factory.clone()).await.unwrap();
        assert!(report.is_success());
        let session = report.get("a").and_then(|r| r.session()).unwrap();
        assert_eq!(session.status(), TransferStatus::Complete);

        assert!(c.last_error().is_none());
        assert_eq!(c.state(), ComponentState::Idle);
        assert_eq!(
            c.read_file("a").await.unwrap(),
            Some(Bytes::from_static(b"abc"))
        );
        assert!(c.store().unwrap().contains("a"));
        assert_eq!(factory.providers(), 1);
    }

    #[tokio::test]
    async fn setup_records_last_error() {
        let control = login_script(&mut Builder::new())
            .write(b"SIZE /a.bin\r\n")
            .read(b"550 not found\r\n")
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(b"RETR /a.bin\r\n")
            .read(b"550 not found\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![Builder::new().build()]);

        let mut c = component();
        c.add_file("/a.bin", "a").unwrap();
        let report = c.setup_with(factory).await.unwrap();
        assert_eq!(report.failed(), 1);
        assert_eq!(c.last_error().unwrap().kind(), "TransferError");
        assert_eq!(c.read_file("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn list_files() {
        let control = login_script(&mut Builder::new())
            .write(b"TYPE A\r\n")
            .read(b"200 ok\r\n")
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(b"LIST /pub\r\n")
            .read(b"150 here it comes\r\n")
            .read(b"226 done\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let data = Builder::new()
            .read(b"-rw-r--r-- 1 ftp ftp 3 Jan 01 00:00 a.bin\r\n")
            .read(b"drwxr-xr-x 2 ftp ftp 0 Jan 01 00:00 sub\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![data]);

        let mut c = component();
        let lines = c.list_files_with(factory, Some("/pub")).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("a.bin"));
        assert!(lines[1].ends_with("sub"));
    }

    #[tokio::test]
    async fn list_rejected_login() {
        let control = Builder::new()
            .read(b"220 ready\r\n")
            .write(b"USER user\r\n")
            .read(b"331 password required\r\n")
            .write(b"PASS pass\r\n")
            .read(b"530 login incorrect\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let factory = MockFactory::new(vec![control], vec![]);

        let mut c = component();
        let e = c.list_files_with(factory, None).await.unwrap_err();
        assert_eq!(e.kind(), "AuthenticationError");
    }
}
