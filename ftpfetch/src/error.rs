/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use ftpfetch_client::{
    FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileRetrieveStartError, FtpSessionOpenError, FtpTransferSetupError,
};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Rejected configuration, always detected before any socket is opened.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("server address is empty")]
    EmptyServer,
    #[error("invalid server address {0}")]
    InvalidServer(String),
    #[error("port {0} is out of range 1-65535")]
    PortOutOfRange(u32),
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("password must not be empty")]
    EmptyPassword,
    #[error("invalid {0}: {1}")]
    InvalidCredential(&'static str, String),
    #[error("transfer buffer size {0} is out of range {min}-{max}", min = crate::config::MIN_BUFFER_SIZE, max = crate::config::MAX_BUFFER_SIZE)]
    BufferSizeOutOfRange(usize),
    #[error("timeout {0}ms is out of range {min}-{max}ms", min = crate::config::MIN_TIMEOUT_MS, max = crate::config::MAX_TIMEOUT_MS)]
    TimeoutOutOfRange(u64),
    #[error("file source must not be empty")]
    EmptySource,
    #[error("file id must not be empty")]
    EmptyIdentifier,
    #[error("malformed file url {0}: {1}")]
    MalformedUrl(String, String),
    #[error("unsupported url scheme {0}, only ftp is allowed")]
    UnsupportedScheme(String),
    #[error("duplicated file id {0}")]
    DuplicatedIdentifier(String),
    #[error("remote path of file {0} contains line break or NUL characters")]
    UnsafeRemotePath(String),
    #[error("files {0} and {1} resolve to the same local path {2}")]
    DuplicatedLocalPath(String, String, String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("connection error: {0}")]
    Connection(BoxError),
    #[error("authentication error: {0}")]
    Authentication(FtpSessionOpenError),
    #[error("transfer error: {0}")]
    Transfer(BoxError),
    #[error("timeout: {0}")]
    Timeout(BoxError),
    #[error("destination error: {0}")]
    Destination(io::Error),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Configuration(_) => "ConfigurationError",
            FetchError::Connection(_) => "ConnectionError",
            FetchError::Authentication(_) => "AuthenticationError",
            FetchError::Transfer(_) => "TransferError",
            FetchError::Timeout(_) => "Timeout",
            FetchError::Destination(_) => "DestinationError",
        }
    }

    pub(crate) fn transfer_msg(msg: String) -> Self {
        FetchError::Transfer(msg.into())
    }
}

impl<E> From<FtpConnectError<E>> for FetchError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: FtpConnectError<E>) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(Box::new(e))
        } else {
            FetchError::Connection(Box::new(e))
        }
    }
}

impl From<FtpSessionOpenError> for FetchError {
    fn from(e: FtpSessionOpenError) -> Self {
        if e.is_rejected() {
            FetchError::Authentication(e)
        } else if e.is_timeout() {
            FetchError::Timeout(Box::new(e))
        } else {
            FetchError::Connection(Box::new(e))
        }
    }
}

impl From<FtpCommandError> for FetchError {
    fn from(e: FtpCommandError) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(Box::new(e))
        } else if e.keeps_session() {
            FetchError::Transfer(Box::new(e))
        } else {
            FetchError::Connection(Box::new(e))
        }
    }
}

impl<E> From<FtpFileRetrieveStartError<E>> for FetchError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: FtpFileRetrieveStartError<E>) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout(Box::new(e));
        }
        match e {
            FtpFileRetrieveStartError::CommandError(e) => e.into(),
            FtpFileRetrieveStartError::TransferSetupFailed(FtpTransferSetupError::CommandError(
                e,
            )) => e.into(),
            FtpFileRetrieveStartError::TransferSetupFailed(_)
            | FtpFileRetrieveStartError::ServiceNotAvailable => {
                FetchError::Connection(Box::new(e))
            }
            FtpFileRetrieveStartError::FileUnavailable => FetchError::Transfer(Box::new(e)),
        }
    }
}

impl From<FtpFileRetrieveError> for FetchError {
    fn from(e: FtpFileRetrieveError) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout(Box::new(e));
        }
        match e {
            FtpFileRetrieveError::LocalWriteFailed(e) => FetchError::Destination(e),
            _ => FetchError::Transfer(Box::new(e)),
        }
    }
}

impl From<FtpFileListError> for FetchError {
    fn from(e: FtpFileListError) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(Box::new(e))
        } else {
            FetchError::Transfer(Box::new(e))
        }
    }
}
