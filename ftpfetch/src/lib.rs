/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod component;
mod connection;
mod engine;
mod error;
mod manifest;
mod opts;

pub mod cmd;
pub mod config;
pub mod logger;
pub mod storage;

pub use component::{ComponentState, FtpFetchComponent};
pub use connection::{ConnectionFactory, ConnectionManager, TcpConnectionFactory, TcpConnectionProvider};
pub use engine::{TransferEngine, TransferSession, TransferStatus};
pub use error::{ConfigError, FetchError};
pub use manifest::{EntryOutcome, EntryReport, FileManifest, ManifestReport};
pub use opts::{ProcArgs, add_global_args, parse_global_args};
