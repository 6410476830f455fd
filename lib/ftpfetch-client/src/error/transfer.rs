/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpRawResponseError};
use crate::control::FtpCommand;

#[derive(Debug, Error)]
pub enum FtpTransferSetupError<E: std::error::Error> {
    #[error("command error: {0}")]
    CommandError(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("data connect failed: {0:?}")]
    ConnectIoError(E),
    #[error("timed out to connect data channel")]
    ConnectTimedOut,
    #[error("data listen failed: {0:?}")]
    ListenIoError(E),
    #[error("data accept failed: {0:?}")]
    AcceptIoError(E),
    #[error("timed out to accept data channel")]
    AcceptTimedOut,
}

impl<E: std::error::Error> FtpTransferSetupError<E> {
    pub fn is_timeout(&self) -> bool {
        match self {
            FtpTransferSetupError::ConnectTimedOut | FtpTransferSetupError::AcceptTimedOut => true,
            FtpTransferSetupError::CommandError(e) => e.is_timeout(),
            _ => false,
        }
    }
}

impl<E: std::error::Error> From<FtpCommandError> for FtpTransferSetupError<E> {
    fn from(e: FtpCommandError) -> Self {
        match e {
            FtpCommandError::ServiceNotAvailable => FtpTransferSetupError::ServiceNotAvailable,
            _ => FtpTransferSetupError::CommandError(e),
        }
    }
}

#[derive(Debug, Error)]
pub enum FtpTransferServerError {
    #[error("unable to recv reply: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("restart needed")]
    RestartNeeded,
    #[error("data transfer not established")]
    DataTransferNotEstablished,
    #[error("data transfer lost")]
    DataTransferLost,
    #[error("server failed")]
    ServerFailed,
    #[error("unexpected end reply code ({0} -> {1})")]
    UnexpectedEndReplyCode(FtpCommand, u16),
}

#[derive(Debug, Error)]
pub enum FtpLineDataReadError {
    #[error("read failed: {0:?}")]
    ReadFailed(#[from] io::Error),
    #[error("unsupported encoding")]
    UnsupportedEncoding,
    #[error("line #{0} is too long")]
    LineTooLong(usize),
    #[error("too many lines")]
    TooManyLines,
    #[error("aborted by callback")]
    AbortedByCallback,
}
