/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{
    FtpCommandError, FtpLineDataReadError, FtpRawResponseError, FtpTransferServerError,
    FtpTransferSetupError,
};

#[derive(Debug, Error)]
pub enum FtpFileRetrieveStartError<E: std::error::Error> {
    #[error("data transfer setup error: {0}")]
    TransferSetupFailed(FtpTransferSetupError<E>),
    #[error("command error: {0}")]
    CommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("file unavailable")]
    FileUnavailable,
}

impl<E: std::error::Error> FtpFileRetrieveStartError<E> {
    pub fn is_timeout(&self) -> bool {
        match self {
            FtpFileRetrieveStartError::TransferSetupFailed(e) => e.is_timeout(),
            FtpFileRetrieveStartError::CommandError(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Whether the control connection may be reused for the next file.
    pub fn keeps_session(&self) -> bool {
        match self {
            FtpFileRetrieveStartError::FileUnavailable => true,
            FtpFileRetrieveStartError::CommandError(e) => e.keeps_session(),
            FtpFileRetrieveStartError::TransferSetupFailed(FtpTransferSetupError::CommandError(
                e,
            )) => e.keeps_session(),
            _ => false,
        }
    }
}

impl<E: std::error::Error> From<FtpCommandError> for FtpFileRetrieveStartError<E> {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpFileRetrieveStartError::ServiceNotAvailable,
            _ => FtpFileRetrieveStartError::CommandError(e),
        }
    }
}

impl<E: std::error::Error> From<FtpTransferSetupError<E>> for FtpFileRetrieveStartError<E> {
    fn from(e: FtpTransferSetupError<E>) -> Self {
        match e {
            FtpTransferSetupError::ServiceNotAvailable => {
                FtpFileRetrieveStartError::ServiceNotAvailable
            }
            _ => FtpFileRetrieveStartError::TransferSetupFailed(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileRetrieveError {
    #[error("server reported error: {0}")]
    ServerReportedError(FtpTransferServerError),
    #[error("timeout to wait end reply")]
    TimeoutToWaitEndReply,
    #[error("control read error: {0}")]
    ControlReadError(#[from] FtpRawResponseError),
    #[error("data read failed: {0:?}")]
    DataReadFailed(io::Error),
    #[error("timeout to wait data")]
    TimeoutToWaitData,
    #[error("local write failed: {0:?}")]
    LocalWriteFailed(io::Error),
}

impl FtpFileRetrieveError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FtpFileRetrieveError::TimeoutToWaitEndReply
            | FtpFileRetrieveError::TimeoutToWaitData => true,
            FtpFileRetrieveError::ControlReadError(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// The end reply has been consumed, so the control connection is in sync.
    pub fn keeps_session(&self) -> bool {
        matches!(self, FtpFileRetrieveError::ServerReportedError(_))
    }
}

impl From<FtpTransferServerError> for FtpFileRetrieveError {
    fn from(e: FtpTransferServerError) -> Self {
        if let FtpTransferServerError::RecvFailed(e) = e {
            FtpFileRetrieveError::ControlReadError(e)
        } else {
            FtpFileRetrieveError::ServerReportedError(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpFileListError {
    #[error("server reported error: {0}")]
    ServerReportedError(#[from] FtpTransferServerError),
    #[error("timeout to wait end reply")]
    TimeoutToWaitEndReply,
    #[error("timeout to wait all data")]
    TimeoutToWaitAllData,
    #[error("data read failed: {0}")]
    DataReadFailed(FtpLineDataReadError),
    #[error("local io callback failed")]
    LocalIoCallbackFailed,
}

impl FtpFileListError {
    pub fn is_timeout(&self) -> bool {
        match self {
            FtpFileListError::TimeoutToWaitEndReply | FtpFileListError::TimeoutToWaitAllData => {
                true
            }
            FtpFileListError::ServerReportedError(FtpTransferServerError::RecvFailed(e)) => {
                e.is_timeout()
            }
            _ => false,
        }
    }

    pub fn keeps_session(&self) -> bool {
        match self {
            FtpFileListError::ServerReportedError(FtpTransferServerError::RecvFailed(_)) => false,
            FtpFileListError::ServerReportedError(_) => true,
            _ => false,
        }
    }
}

impl From<FtpLineDataReadError> for FtpFileListError {
    fn from(e: FtpLineDataReadError) -> Self {
        if matches!(e, FtpLineDataReadError::AbortedByCallback) {
            FtpFileListError::LocalIoCallbackFailed
        } else {
            FtpFileListError::DataReadFailed(e)
        }
    }
}
