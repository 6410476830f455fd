/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::anyhow;

#[cfg(feature = "yaml")]
mod yaml;

/// How the data connection is negotiated.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum FtpMode {
    /// The client listens and the server connects back (PORT / EPRT).
    Active,
    /// The client connects to an endpoint supplied by the server (EPSV / PASV).
    #[default]
    Passive,
}

impl FtpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FtpMode::Active => "ACTIVE",
            FtpMode::Passive => "PASSIVE",
        }
    }
}

impl fmt::Display for FtpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FtpMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" | "PORT" => Ok(FtpMode::Active),
            "PASSIVE" | "PASV" => Ok(FtpMode::Passive),
            _ => Err(anyhow!("invalid ftp mode {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: 2048,
            max_multi_lines: 128,
            command_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpTransferConfig {
    pub list_max_line_len: usize,
    pub list_max_entries: usize,
    pub list_all_timeout: Duration,
    /// Maximum idle time between two reads on a data connection.
    pub data_read_timeout: Duration,
    pub end_wait_timeout: Duration,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_line_len: 2048,
            list_max_entries: 1024,
            list_all_timeout: Duration::from_secs(120),
            data_read_timeout: Duration::from_secs(30),
            end_wait_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FtpClientConfig {
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    pub mode: FtpMode,
    pub always_try_epsv: bool,
}

impl Default for FtpClientConfig {
    fn default() -> Self {
        FtpClientConfig {
            control: Default::default(),
            transfer: Default::default(),
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            mode: FtpMode::default(),
            always_try_epsv: true,
        }
    }
}

impl FtpClientConfig {
    /// Apply one timeout to every blocking stage of a session.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.connect_timeout = timeout;
        self.greeting_timeout = timeout;
        self.control.command_timeout = timeout;
        self.transfer.data_read_timeout = timeout;
        self.transfer.end_wait_timeout = timeout;
    }
}
