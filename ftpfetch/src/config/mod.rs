/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;

use ftpfetch_client::{FtpClientConfig, FtpMode, Host, Password, UpstreamAddr, Username};

use crate::error::ConfigError;

mod entry;
pub use entry::FileEntry;

mod yaml;
pub use yaml::{FetchConfig, load_config};

pub const DEFAULT_PORT: u16 = 21;
pub const MIN_BUFFER_SIZE: usize = 128;
pub const MAX_BUFFER_SIZE: usize = 8192;
pub const DEFAULT_BUFFER_SIZE: usize = 1024;
pub const MIN_TIMEOUT_MS: u64 = 1000;
pub const MAX_TIMEOUT_MS: u64 = 60000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30000;
pub const DEFAULT_DOWNLOAD_DIR: &str = "/config";

/// What to do with the rest of a manifest once one file has failed.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum ErrorPolicy {
    #[default]
    Continue,
    Abort,
}

impl ErrorPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorPolicy::Continue => "continue",
            ErrorPolicy::Abort => "abort",
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(ErrorPolicy::Continue),
            "abort" | "stop" => Ok(ErrorPolicy::Abort),
            _ => Err(anyhow!("invalid error policy {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum StorageType {
    Memory,
    #[default]
    Directory,
}

impl FromStr for StorageType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageType::Memory),
            "directory" | "dir" | "fs" => Ok(StorageType::Directory),
            _ => Err(anyhow!("invalid storage type {s}")),
        }
    }
}

/// Validated connection and transfer settings, fixed for the lifetime of a run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    server: UpstreamAddr,
    username: Username,
    password: Password,
    mode: FtpMode,
    buffer_size: usize,
    timeout: Duration,
    on_error: ErrorPolicy,
    download_dir: PathBuf,
    storage: StorageType,
    protocol: Arc<FtpClientConfig>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    #[inline]
    pub fn server(&self) -> &UpstreamAddr {
        &self.server
    }

    #[inline]
    pub fn username(&self) -> &Username {
        &self.username
    }

    #[inline]
    pub fn password(&self) -> &Password {
        &self.password
    }

    #[inline]
    pub fn mode(&self) -> FtpMode {
        self.mode
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn on_error(&self) -> ErrorPolicy {
        self.on_error
    }

    #[inline]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    #[inline]
    pub fn storage(&self) -> StorageType {
        self.storage
    }

    /// Protocol settings with mode and timeout applied.
    pub fn protocol(&self) -> &Arc<FtpClientConfig> {
        &self.protocol
    }
}

/// Mutable settings collected from setters or YAML, checked by [`build`](Self::build).
#[derive(Clone)]
pub struct ClientConfigBuilder {
    server: String,
    port: u32,
    username: String,
    password: String,
    mode: FtpMode,
    buffer_size: usize,
    timeout_ms: u64,
    on_error: ErrorPolicy,
    download_dir: PathBuf,
    always_try_epsv: bool,
    storage: StorageType,
    protocol: FtpClientConfig,
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"****")
            .field("mode", &self.mode)
            .field("buffer_size", &self.buffer_size)
            .field("timeout_ms", &self.timeout_ms)
            .field("on_error", &self.on_error)
            .field("download_dir", &self.download_dir)
            .field("always_try_epsv", &self.always_try_epsv)
            .field("storage", &self.storage)
            .field("protocol", &self.protocol)
            .finish()
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        ClientConfigBuilder {
            server: String::new(),
            port: DEFAULT_PORT as u32,
            username: String::new(),
            password: String::new(),
            mode: FtpMode::Passive,
            buffer_size: DEFAULT_BUFFER_SIZE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            on_error: ErrorPolicy::Continue,
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            always_try_epsv: true,
            storage: StorageType::Directory,
            protocol: FtpClientConfig::default(),
        }
    }
}

impl ClientConfigBuilder {
    pub fn set_server(&mut self, server: &str) {
        self.server = server.trim().to_string();
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Takes a wide integer so that out of range values can be reported.
    pub fn set_port(&mut self, port: u32) {
        self.port = port;
    }

    pub fn port(&self) -> u32 {
        self.port
    }

    pub fn set_username(&mut self, username: &str) {
        self.username = username.to_string();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn set_password(&mut self, password: &str) {
        self.password = password.to_string();
    }

    pub fn set_mode(&mut self, mode: FtpMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> FtpMode {
        self.mode
    }

    pub fn set_transfer_buffer_size(&mut self, size: usize) {
        self.buffer_size = size;
    }

    pub fn transfer_buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn set_timeout_ms(&mut self, timeout: u64) {
        self.timeout_ms = timeout;
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn set_on_error(&mut self, policy: ErrorPolicy) {
        self.on_error = policy;
    }

    pub fn on_error(&self) -> ErrorPolicy {
        self.on_error
    }

    pub fn set_download_dir<P: Into<PathBuf>>(&mut self, dir: P) {
        self.download_dir = dir.into();
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    pub fn set_always_try_epsv(&mut self, enable: bool) {
        self.always_try_epsv = enable;
    }

    pub fn set_storage(&mut self, storage: StorageType) {
        self.storage = storage;
    }

    /// Protocol limits; mode and per stage timeouts are overwritten on build.
    pub fn set_protocol(&mut self, protocol: FtpClientConfig) {
        self.protocol = protocol;
    }

    pub fn build(&self) -> Result<ClientConfig, ConfigError> {
        if self.server.is_empty() {
            return Err(ConfigError::EmptyServer);
        }
        let host =
            Host::from_str(&self.server).map_err(|_| ConfigError::InvalidServer(self.server.clone()))?;
        let port = match u16::try_from(self.port) {
            Ok(0) | Err(_) => return Err(ConfigError::PortOutOfRange(self.port)),
            Ok(port) => port,
        };

        if self.username.is_empty() {
            return Err(ConfigError::EmptyUsername);
        }
        if self.password.is_empty() {
            return Err(ConfigError::EmptyPassword);
        }
        let username = Username::from_original(&self.username)
            .map_err(|e| ConfigError::InvalidCredential("username", e.to_string()))?;
        let password = Password::from_original(&self.password)
            .map_err(|e| ConfigError::InvalidCredential("password", e.to_string()))?;

        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(ConfigError::BufferSizeOutOfRange(self.buffer_size));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConfigError::TimeoutOutOfRange(self.timeout_ms));
        }
        let timeout = Duration::from_millis(self.timeout_ms);

        let mut protocol = self.protocol.clone();
        protocol.mode = self.mode;
        protocol.always_try_epsv = self.always_try_epsv;
        protocol.set_timeout(timeout);

        Ok(ClientConfig {
            server: UpstreamAddr::new(host, port),
            username,
            password,
            mode: self.mode,
            buffer_size: self.buffer_size,
            timeout,
            on_error: self.on_error,
            download_dir: self.download_dir.clone(),
            storage: self.storage,
            protocol: Arc::new(protocol),
        })
    }
}
