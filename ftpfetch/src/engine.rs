/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use log::{debug, info, warn};

use crate::config::FileEntry;
use crate::connection::{ConnectionFactory, ConnectionManager};
use crate::error::FetchError;
use crate::storage::ArtifactStore;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TransferStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Pending => f.write_str("pending"),
            TransferStatus::InProgress => f.write_str("in-progress"),
            TransferStatus::Complete => f.write_str("complete"),
            TransferStatus::Failed => f.write_str("failed"),
        }
    }
}

/// State of a single file fetch.
#[derive(Debug, Clone)]
pub struct TransferSession {
    id: String,
    bytes_transferred: u64,
    expected_size: Option<u64>,
    status: TransferStatus,
}

impl TransferSession {
    fn new(entry: &FileEntry) -> Self {
        TransferSession {
            id: entry.id().to_string(),
            bytes_transferred: 0,
            expected_size: None,
            status: TransferStatus::Pending,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred
    }

    #[inline]
    pub fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }

    #[inline]
    pub fn status(&self) -> TransferStatus {
        self.status
    }
}

/// Fetches files one at a time through a buffer allocated once.
pub struct TransferEngine {
    buf: Box<[u8]>,
}

impl TransferEngine {
    pub fn new(buffer_size: usize) -> Self {
        TransferEngine {
            buf: vec![0u8; buffer_size].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buf.len()
    }

    /// Fetch one entry into `store`.
    ///
    /// The session in the returned pair is `Complete` on success and `Failed`
    /// otherwise. When the error leaves the control connection in an unknown
    /// state it is dropped from `conn`, so the next call reconnects.
    pub async fn fetch<CF>(
        &mut self,
        conn: &mut ConnectionManager<CF>,
        entry: &FileEntry,
        store: &mut dyn ArtifactStore,
    ) -> (TransferSession, Result<u64, FetchError>)
    where
        CF: ConnectionFactory,
    {
        let mut session = TransferSession::new(entry);
        session.status = TransferStatus::InProgress;
        let r = self.do_fetch(conn, entry, store, &mut session).await;
        match &r {
            Ok(n) => {
                session.status = TransferStatus::Complete;
                info!("fetched {} ({n} bytes) as {}", entry.source(), entry.id());
            }
            Err(e) => {
                session.status = TransferStatus::Failed;
                warn!("failed to fetch {} as {}: {e}", entry.source(), entry.id());
            }
        }
        (session, r)
    }

    async fn do_fetch<CF>(
        &mut self,
        conn: &mut ConnectionManager<CF>,
        entry: &FileEntry,
        store: &mut dyn ArtifactStore,
        session: &mut TransferSession,
    ) -> Result<u64, FetchError>
    where
        CF: ConnectionFactory,
    {
        let path = entry.remote_path();
        let client = conn.session().await?;

        match client.fetch_file_size(path).await {
            Ok(size) => session.expected_size = size,
            Err(e) if e.keeps_session() => debug!("no size for {path}: {e}"),
            Err(e) => {
                conn.discard();
                return Err(e.into());
            }
        }

        let mut writer = store.create(entry).await.map_err(FetchError::Destination)?;

        let data_stream = match client.retrieve_file_start(path).await {
            Ok(stream) => stream,
            Err(e) => {
                store.discard(entry, writer).await;
                if !e.keeps_session() {
                    conn.discard();
                }
                return Err(e.into());
            }
        };

        let received = match client
            .retrieve_file_receive(data_stream, &mut writer, &mut self.buf)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                store.discard(entry, writer).await;
                if !e.keeps_session() {
                    conn.discard();
                }
                return Err(e.into());
            }
        };
        session.bytes_transferred = received;

        if let Some(expected) = session.expected_size
            && expected != received
        {
            store.discard(entry, writer).await;
            return Err(FetchError::transfer_msg(format!(
                "size mismatch for {path}: expected {expected} bytes, received {received}"
            )));
        }

        store
            .commit(entry, writer, received)
            .await
            .map_err(FetchError::Destination)?;
        Ok(received)
    }
}
