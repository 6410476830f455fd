/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use super::{FtpClientConfig, FtpControlConfig, FtpMode, FtpTransferConfig};

impl FtpMode {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::String(s) = value {
            FtpMode::from_str(s)
        } else {
            Err(anyhow!("yaml value type for ftp mode should be 'string'"))
        }
    }
}

impl FtpControlConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpControlConfig::default();
            ftpfetch_yaml::foreach_kv(map, |k, v| {
                match ftpfetch_yaml::key::normalize(k).as_str() {
                    "max_line_len" | "max_line_length" => {
                        config.max_line_len = ftpfetch_yaml::humanize::as_usize(v)
                            .context(format!("invalid humanize usize value for key {k}"))?;
                    }
                    "max_multi_lines" => {
                        config.max_multi_lines = ftpfetch_yaml::value::as_usize(v)
                            .context(format!("invalid usize value for key {k}"))?;
                    }
                    "command_timeout" => {
                        config.command_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    _ => return Err(anyhow!("invalid key {k}")),
                }
                Ok(())
            })?;
            if config.max_line_len < 8 {
                return Err(anyhow!("max_line_len is too small"));
            }
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpTransferConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpTransferConfig::default();
            ftpfetch_yaml::foreach_kv(map, |k, v| {
                match ftpfetch_yaml::key::normalize(k).as_str() {
                    "list_max_line_len" | "list_max_line_length" => {
                        config.list_max_line_len = ftpfetch_yaml::humanize::as_usize(v)
                            .context(format!("invalid humanize usize value for key {k}"))?;
                    }
                    "list_max_entries" => {
                        config.list_max_entries = ftpfetch_yaml::value::as_usize(v)
                            .context(format!("invalid usize value for key {k}"))?;
                    }
                    "list_all_timeout" => {
                        config.list_all_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    "data_read_timeout" => {
                        config.data_read_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    "end_wait_timeout" => {
                        config.end_wait_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    _ => return Err(anyhow!("invalid key {k}")),
                }
                Ok(())
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpClientConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpClientConfig::default();
            ftpfetch_yaml::foreach_kv(map, |k, v| {
                match ftpfetch_yaml::key::normalize(k).as_str() {
                    "control" => {
                        config.control = FtpControlConfig::parse_yaml(v).context(format!(
                            "invalid ftp control connection config value for key {k}"
                        ))?;
                    }
                    "transfer" => {
                        config.transfer = FtpTransferConfig::parse_yaml(v).context(format!(
                            "invalid ftp transfer connection config value for key {k}"
                        ))?;
                    }
                    "connect_timeout" => {
                        config.connect_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    "greeting_timeout" => {
                        config.greeting_timeout = ftpfetch_yaml::humanize::as_duration(v)
                            .context(format!("invalid humanize duration value for key {k}"))?;
                    }
                    "mode" => {
                        config.mode = FtpMode::parse_yaml(v)
                            .context(format!("invalid ftp mode value for key {k}"))?;
                    }
                    "always_try_epsv" => {
                        config.always_try_epsv = ftpfetch_yaml::value::as_bool(v)
                            .context(format!("invalid bool value for key {k}"))?;
                    }
                    _ => return Err(anyhow!("invalid key {k}")),
                }
                Ok(())
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}
