/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncWrite, BufWriter};

use crate::config::FileEntry;

mod memory;
pub use memory::MemoryStore;

mod fs;
pub use fs::DirectoryStore;

/// Destination of the fetched files, addressed by file id.
///
/// An artifact becomes visible through [`read`](Self::read) only after
/// [`commit`](Self::commit); a discarded writer leaves nothing behind.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn create(&mut self, entry: &FileEntry) -> io::Result<ArtifactWriter>;
    async fn commit(&mut self, entry: &FileEntry, writer: ArtifactWriter, size: u64)
    -> io::Result<()>;
    async fn discard(&mut self, entry: &FileEntry, writer: ArtifactWriter);
    async fn read(&self, id: &str) -> io::Result<Option<Bytes>>;
    fn contains(&self, id: &str) -> bool;
}

/// Pending artifact content.
#[derive(Debug)]
pub enum ArtifactWriter {
    Memory(Vec<u8>),
    File {
        file: BufWriter<File>,
        part_path: PathBuf,
        final_path: PathBuf,
    },
}

impl AsyncWrite for ArtifactWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            ArtifactWriter::Memory(v) => Pin::new(v).poll_write(cx, buf),
            ArtifactWriter::File { file, .. } => Pin::new(file).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ArtifactWriter::Memory(v) => Pin::new(v).poll_flush(cx),
            ArtifactWriter::File { file, .. } => Pin::new(file).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            ArtifactWriter::Memory(v) => Pin::new(v).poll_shutdown(cx),
            ArtifactWriter::File { file, .. } => Pin::new(file).poll_shutdown(cx),
        }
    }
}

fn unexpected_writer() -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        "writer was not created by this store",
    )
}
