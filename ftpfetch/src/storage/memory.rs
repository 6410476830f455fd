/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashMap;
use std::io;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

use super::{ArtifactStore, ArtifactWriter};
use crate::config::FileEntry;

#[derive(Default)]
pub struct MemoryStore {
    artifacts: HashMap<String, Bytes>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Borrow the content without going through the async interface.
    pub fn get(&self, id: &str) -> Option<&Bytes> {
        self.artifacts.get(id)
    }
}

#[async_trait]
impl ArtifactStore for MemoryStore {
    async fn create(&mut self, _entry: &FileEntry) -> io::Result<ArtifactWriter> {
        Ok(ArtifactWriter::Memory(Vec::new()))
    }

    async fn commit(
        &mut self,
        entry: &FileEntry,
        writer: ArtifactWriter,
        size: u64,
    ) -> io::Result<()> {
        let ArtifactWriter::Memory(data) = writer else {
            return Err(super::unexpected_writer());
        };
        debug!("store {size} bytes in memory as {}", entry.id());
        self.artifacts.insert(entry.id().to_string(), Bytes::from(data));
        Ok(())
    }

    async fn discard(&mut self, _entry: &FileEntry, _writer: ArtifactWriter) {}

    async fn read(&self, id: &str) -> io::Result<Option<Bytes>> {
        Ok(self.artifacts.get(id).cloned())
    }

    fn contains(&self, id: &str) -> bool {
        self.artifacts.contains_key(id)
    }
}
