/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod auth;
mod client;
mod config;
mod connection;
mod control;
mod debug;
mod error;
mod io;
mod net;
mod transfer;

pub use auth::{Password, Username};
pub use client::FtpClient;
pub use config::{FtpClientConfig, FtpControlConfig, FtpMode, FtpTransferConfig};
pub use connection::FtpConnectionProvider;
pub use control::FtpCommand;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};
pub use error::{
    FtpCommandError, FtpConnectError, FtpFileListError, FtpFileRetrieveError,
    FtpFileRetrieveStartError, FtpLineDataReadError, FtpRawResponseError, FtpSessionOpenError,
    FtpTransferServerError, FtpTransferSetupError,
};
pub use net::{Host, UpstreamAddr};
pub use transfer::{FtpLineDataReceiver, FtpTransferType};
