/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use yaml_rust::Yaml;

use ftpfetch_client::{FtpClientConfig, FtpMode};

use super::{ClientConfig, ClientConfigBuilder, ErrorPolicy, FileEntry, StorageType};
use crate::error::ConfigError;
use crate::manifest::FileManifest;

/// Everything loaded from one config file.
#[derive(Clone, Debug, Default)]
pub struct FetchConfig {
    pub client: ClientConfigBuilder,
    pub files: Vec<FileEntry>,
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(ClientConfig, FileManifest), ConfigError> {
        let client = self.client.build()?;
        let manifest = FileManifest::new(self.files.clone())?;
        if client.storage() == StorageType::Directory {
            let mut taken = HashMap::with_capacity(manifest.entries().len());
            for entry in manifest.entries() {
                let path = entry.local_path(client.download_dir());
                if let Some(first) = taken.get(&path) {
                    return Err(ConfigError::DuplicatedLocalPath(
                        String::from(*first),
                        entry.id().to_string(),
                        path.display().to_string(),
                    ));
                }
                taken.insert(path, entry.id());
            }
        }
        Ok((client, manifest))
    }

    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        let Yaml::Hash(map) = value else {
            return Err(anyhow!("root value should be a map"));
        };

        let mut client = ClientConfigBuilder::default();
        let mut files = Vec::new();
        ftpfetch_yaml::foreach_kv(map, |k, v| {
            match ftpfetch_yaml::key::normalize(k).as_str() {
                "server" => {
                    let server = ftpfetch_yaml::value::as_string(v)?;
                    client.set_server(&server);
                }
                "port" => {
                    let port = ftpfetch_yaml::value::as_usize(v)
                        .context(format!("invalid port value for key {k}"))?;
                    client.set_port(u32::try_from(port).unwrap_or(u32::MAX));
                }
                "username" => {
                    let username = ftpfetch_yaml::value::as_string(v)?;
                    client.set_username(&username);
                }
                "password" => {
                    let password = ftpfetch_yaml::value::as_string(v)?;
                    client.set_password(&password);
                }
                "mode" => {
                    let mode = FtpMode::parse_yaml(v)
                        .context(format!("invalid ftp mode value for key {k}"))?;
                    client.set_mode(mode);
                }
                "buffer_size" | "transfer_buffer_size" => {
                    let size = ftpfetch_yaml::humanize::as_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    client.set_transfer_buffer_size(size);
                }
                "timeout" | "timeout_ms" => {
                    let timeout = ftpfetch_yaml::humanize::as_millis_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    client.set_timeout_ms(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
                }
                "on_error" => {
                    let s = ftpfetch_yaml::value::as_string(v)?;
                    client.set_on_error(ErrorPolicy::from_str(&s)?);
                }
                "download_dir" => {
                    let dir = ftpfetch_yaml::value::as_string(v)?;
                    client.set_download_dir(dir);
                }
                "always_try_epsv" => {
                    let enable = ftpfetch_yaml::value::as_bool(v)
                        .context(format!("invalid bool value for key {k}"))?;
                    client.set_always_try_epsv(enable);
                }
                "storage" => {
                    let storage = parse_storage(v)
                        .context(format!("invalid storage value for key {k}"))?;
                    client.set_storage(storage);
                }
                "client" => {
                    let protocol = FtpClientConfig::parse_yaml(v)
                        .context(format!("invalid ftp client config value for key {k}"))?;
                    client.set_protocol(protocol);
                }
                "files" => {
                    files = ftpfetch_yaml::value::as_list(v, parse_file_entry)
                        .context(format!("invalid file list value for key {k}"))?;
                }
                _ => return Err(anyhow!("invalid key {k}")),
            }
            Ok(())
        })?;

        Ok(FetchConfig { client, files })
    }
}

fn parse_storage(v: &Yaml) -> anyhow::Result<StorageType> {
    match v {
        Yaml::String(s) => StorageType::from_str(s),
        Yaml::Hash(map) => {
            let v = ftpfetch_yaml::hash_get_required(map, "type")?;
            let s = ftpfetch_yaml::value::as_string(v)?;
            StorageType::from_str(&s)
        }
        _ => Err(anyhow!("yaml value type for storage should be 'string' or 'map'")),
    }
}

fn parse_file_entry(v: &Yaml) -> anyhow::Result<FileEntry> {
    let Yaml::Hash(map) = v else {
        return Err(anyhow!("yaml value type for file entry should be 'map'"));
    };

    let mut source = String::new();
    let mut id = String::new();
    let mut local_path = None;
    ftpfetch_yaml::foreach_kv(map, |k, v| {
        match ftpfetch_yaml::key::normalize(k).as_str() {
            "source" | "url" | "path" => source = ftpfetch_yaml::value::as_string(v)?,
            "id" | "file_id" => id = ftpfetch_yaml::value::as_string(v)?,
            "local_path" => local_path = Some(ftpfetch_yaml::value::as_string(v)?),
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    })?;

    let entry = FileEntry::new(&source, &id)?;
    Ok(match local_path {
        Some(p) => entry.with_local_path(p),
        None => entry,
    })
}

/// Load and validate a config file.
pub fn load_config(path: &Path) -> anyhow::Result<FetchConfig> {
    let doc = ftpfetch_yaml::load_doc(path)?;
    let config = FetchConfig::parse_yaml(&doc)
        .context(format!("invalid config file {}", path.display()))?;
    config
        .validate()
        .context(format!("invalid config file {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    const FULL: &str = r#"
server: ftp.example.com
port: 2121
username: user
password: pass
mode: active
buffer_size: 2048
timeout: 5s
on-error: abort
download_dir: /var/lib/ftpfetch
always_try_epsv: false
storage:
  type: memory
client:
  control:
    max_line_len: 1024
files:
  - source: ftp://ftp.example.com/a.bin
    id: a
  - url: /pub/b.txt
    file_id: b
    local_path: text/b.txt
"#;

    #[test]
    fn parse_full() {
        let doc = ftpfetch_yaml::load_str(FULL).unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        let (client, manifest) = config.validate().unwrap();
        assert_eq!(client.server().to_string(), "ftp.example.com:2121");
        assert_eq!(client.mode(), FtpMode::Active);
        assert_eq!(client.buffer_size(), 2048);
        assert_eq!(client.timeout(), Duration::from_secs(5));
        assert_eq!(client.on_error(), ErrorPolicy::Abort);
        assert_eq!(client.storage(), StorageType::Memory);
        assert_eq!(client.download_dir(), Path::new("/var/lib/ftpfetch"));
        assert!(!client.protocol().always_try_epsv);
        assert_eq!(client.protocol().control.max_line_len, 1024);

        let ids: Vec<&str> = manifest.entries().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(
            manifest.entries()[1].local_path(client.download_dir()),
            Path::new("/var/lib/ftpfetch/text/b.txt")
        );
    }

    #[test]
    fn timeout_in_millis() {
        let doc = ftpfetch_yaml::load_str(
            "server: 10.0.0.1\nusername: u\npassword: p\ntimeout: 1500\n",
        )
        .unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        let (client, manifest) = config.validate().unwrap();
        assert_eq!(client.timeout(), Duration::from_millis(1500));
        assert!(manifest.entries().is_empty());
    }

    #[test]
    fn invalid_values() {
        let doc = ftpfetch_yaml::load_str("server: a\nunknown: 1\n").unwrap();
        assert!(FetchConfig::parse_yaml(&doc).is_err());

        let doc = ftpfetch_yaml::load_str("mode: extended\n").unwrap();
        assert!(FetchConfig::parse_yaml(&doc).is_err());

        let doc = ftpfetch_yaml::load_str("files:\n  - source: http://a/b\n    id: b\n").unwrap();
        assert!(FetchConfig::parse_yaml(&doc).is_err());

        let doc = ftpfetch_yaml::load_str(
            "server: a\nusername: u\npassword: \"\"\n",
        )
        .unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPassword)));

        let doc = ftpfetch_yaml::load_str(
            "server: a\nusername: u\npassword: p\nport: 70000\n",
        )
        .unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PortOutOfRange(70000))
        ));
    }

    #[test]
    fn colliding_local_paths() {
        const DOC: &str = r#"
server: ftp.example.com
username: u
password: p
download_dir: /data
files:
  - source: /v1/fw.bin
    id: old
  - source: /v2/fw.bin
    id: new
"#;
        let doc = ftpfetch_yaml::load_str(DOC).unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::DuplicatedLocalPath(
                "old".to_string(),
                "new".to_string(),
                "/data/fw.bin".to_string()
            )
        );

        let doc = ftpfetch_yaml::load_str(&format!("{DOC}    local_path: v2/fw.bin\n")).unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        assert!(config.validate().is_ok());

        // memory storage has no local paths
        let doc = ftpfetch_yaml::load_str(&format!("{DOC}storage:\n  type: memory\n")).unwrap();
        let config = FetchConfig::parse_yaml(&doc).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.files.len(), 2);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"server: a\nusername: u\npassword: p\nbuffer_size: 64\n")
            .unwrap();
        let e = load_config(file.path()).unwrap_err();
        assert_eq!(
            e.downcast_ref::<ConfigError>(),
            Some(&ConfigError::BufferSizeOutOfRange(64))
        );
    }
}
