/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::ConfigError;

/// One remote file to fetch and the identifier it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    id: String,
    source: String,
    remote_path: String,
    url_host: Option<String>,
    local_path: Option<PathBuf>,
}

impl FileEntry {
    /// `source` is either a remote path or an `ftp://` url.
    pub fn new(source: &str, id: &str) -> Result<Self, ConfigError> {
        let source = source.trim();
        if source.is_empty() {
            return Err(ConfigError::EmptySource);
        }
        let id = id.trim();
        if id.is_empty() {
            return Err(ConfigError::EmptyIdentifier);
        }

        let (remote_path, url_host) = match source.split_once("://") {
            Some(_) => parse_url(source)?,
            None => (source.to_string(), None),
        };
        // the path is sent as a control channel argument
        if remote_path.bytes().any(|b| matches!(b, b'\r' | b'\n' | b'\0')) {
            return Err(ConfigError::UnsafeRemotePath(id.to_string()));
        }

        Ok(FileEntry {
            id: id.to_string(),
            source: source.to_string(),
            remote_path,
            url_host,
            local_path: None,
        })
    }

    pub fn with_local_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.local_path = Some(path.into());
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The path sent to the server in RETR.
    #[inline]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    /// Host part of an url source.
    #[inline]
    pub fn url_host(&self) -> Option<&str> {
        self.url_host.as_deref()
    }

    /// File name used when no explicit local path is set.
    pub fn local_file_name(&self) -> &str {
        let name = match self.remote_path.rfind('/') {
            Some(p) => &self.remote_path[p + 1..],
            None => "",
        };
        match name {
            "" | "." | ".." => self.id.as_str(),
            name => name,
        }
    }

    pub fn local_path(&self, download_dir: &Path) -> PathBuf {
        match &self.local_path {
            Some(p) if p.is_absolute() => p.clone(),
            Some(p) => download_dir.join(p),
            None => download_dir.join(self.local_file_name()),
        }
    }
}

fn parse_url(source: &str) -> Result<(String, Option<String>), ConfigError> {
    let url = Url::parse(source)
        .map_err(|e| ConfigError::MalformedUrl(source.to_string(), e.to_string()))?;
    if url.scheme() != "ftp" {
        return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::MalformedUrl(source.to_string(), "no host".to_string()))?;

    let path = percent_decode_str(url.path())
        .decode_utf8()
        .map_err(|e| ConfigError::MalformedUrl(source.to_string(), e.to_string()))?;
    if path.is_empty() || path == "/" {
        return Err(ConfigError::MalformedUrl(
            source.to_string(),
            "no file path".to_string(),
        ));
    }
    Ok((path.into_owned(), Some(host.to_string())))
}
