/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use super::{ArtifactStore, ArtifactWriter};
use crate::config::FileEntry;

const PART_SUFFIX: &str = ".part";

/// Writes each file below a download directory.
///
/// Content goes to `<path>.part` first and is renamed over `<path>` on commit,
/// so an existing artifact is only replaced by a complete one.
pub struct DirectoryStore {
    download_dir: PathBuf,
    artifacts: HashMap<String, PathBuf>,
}

impl DirectoryStore {
    pub fn new<P: Into<PathBuf>>(download_dir: P) -> Self {
        DirectoryStore {
            download_dir: download_dir.into(),
            artifacts: HashMap::new(),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Local path of a committed artifact.
    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.artifacts.get(id).map(|p| p.as_path())
    }
}

fn part_path(path: &Path) -> PathBuf {
    let mut s = OsString::from(path.as_os_str());
    s.push(PART_SUFFIX);
    PathBuf::from(s)
}

async fn persist(mut file: BufWriter<File>, part_path: &Path, final_path: &Path) -> io::Result<()> {
    file.flush().await?;
    file.get_ref().sync_all().await?;
    drop(file);
    tokio::fs::rename(part_path, final_path).await
}

#[async_trait]
impl ArtifactStore for DirectoryStore {
    async fn create(&mut self, entry: &FileEntry) -> io::Result<ArtifactWriter> {
        let final_path = entry.local_path(&self.download_dir);
        if let Some((owner, _)) = self
            .artifacts
            .iter()
            .find(|(id, path)| *path == &final_path && id.as_str() != entry.id())
        {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is already taken by {owner}", final_path.display()),
            ));
        }
        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let part_path = part_path(&final_path);
        let file = File::create(&part_path).await?;
        Ok(ArtifactWriter::File {
            file: BufWriter::new(file),
            part_path,
            final_path,
        })
    }

    async fn commit(
        &mut self,
        entry: &FileEntry,
        writer: ArtifactWriter,
        size: u64,
    ) -> io::Result<()> {
        let ArtifactWriter::File {
            file,
            part_path,
            final_path,
        } = writer
        else {
            return Err(super::unexpected_writer());
        };

        if let Err(e) = persist(file, &part_path, &final_path).await {
            if let Err(e) = tokio::fs::remove_file(&part_path).await {
                warn!("failed to remove partial file {}: {e}", part_path.display());
            }
            return Err(e);
        }
        debug!(
            "stored {size} bytes for {} at {}",
            entry.id(),
            final_path.display()
        );
        self.artifacts.insert(entry.id().to_string(), final_path);
        Ok(())
    }

    async fn discard(&mut self, entry: &FileEntry, writer: ArtifactWriter) {
        let ArtifactWriter::File {
            file, part_path, ..
        } = writer
        else {
            return;
        };
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&part_path).await {
            warn!(
                "failed to remove partial file {} of {}: {e}",
                part_path.display(),
                entry.id()
            );
        }
    }

    async fn read(&self, id: &str) -> io::Result<Option<Bytes>> {
        match self.artifacts.get(id) {
            Some(path) => {
                let data = tokio::fs::read(path).await?;
                Ok(Some(Bytes::from(data)))
            }
            None => Ok(None),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.artifacts.contains_key(id)
    }
}
