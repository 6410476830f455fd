/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;

use log::{info, warn};

use crate::config::{ErrorPolicy, FileEntry};
use crate::connection::{ConnectionFactory, ConnectionManager};
use crate::engine::{TransferEngine, TransferSession};
use crate::error::{ConfigError, FetchError};
use crate::storage::ArtifactStore;

/// Ordered list of files with unique identifiers.
#[derive(Debug, Clone, Default)]
pub struct FileManifest {
    entries: Vec<FileEntry>,
}

impl FileManifest {
    pub fn new(entries: Vec<FileEntry>) -> Result<Self, ConfigError> {
        let mut ids = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !ids.insert(entry.id()) {
                return Err(ConfigError::DuplicatedIdentifier(entry.id().to_string()));
            }
        }
        Ok(FileManifest { entries })
    }

    #[inline]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fetch every entry in order.
    ///
    /// With [`ErrorPolicy::Continue`] each entry is attempted regardless of
    /// earlier failures. With [`ErrorPolicy::Abort`] the first failure stops
    /// the run and the remaining entries are reported as skipped.
    pub async fn run<CF>(
        &self,
        conn: &mut ConnectionManager<CF>,
        engine: &mut TransferEngine,
        store: &mut dyn ArtifactStore,
        policy: ErrorPolicy,
    ) -> ManifestReport
    where
        CF: ConnectionFactory,
    {
        let mut report = ManifestReport::default();
        let mut aborted = false;

        for entry in &self.entries {
            if aborted {
                report.push(entry, EntryOutcome::Skipped, None);
                continue;
            }

            let (session, r) = engine.fetch(conn, entry, store).await;
            match r {
                Ok(n) => report.push(entry, EntryOutcome::Fetched(n), Some(session)),
                Err(e) => {
                    if policy == ErrorPolicy::Abort {
                        warn!("aborting manifest run after failure on {}", entry.id());
                        aborted = true;
                    }
                    report.push(entry, EntryOutcome::Failed(e), Some(session));
                }
            }
        }

        info!(
            "manifest run finished: {} fetched, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        report
    }
}

#[derive(Debug)]
pub enum EntryOutcome {
    Fetched(u64),
    Failed(FetchError),
    Skipped,
}

#[derive(Debug)]
pub struct EntryReport {
    id: String,
    outcome: EntryOutcome,
    session: Option<TransferSession>,
}

impl EntryReport {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn outcome(&self) -> &EntryOutcome {
        &self.outcome
    }

    /// Absent for skipped entries.
    pub fn session(&self) -> Option<&TransferSession> {
        self.session.as_ref()
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.outcome {
            EntryOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ManifestReport {
    entries: Vec<EntryReport>,
}

impl ManifestReport {
    pub(crate) fn push(&mut self, entry: &FileEntry, outcome: EntryOutcome, session: Option<TransferSession>) {
        self.entries.push(EntryReport {
            id: entry.id().to_string(),
            outcome,
            session,
        });
    }

    pub fn entries(&self) -> &[EntryReport] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|r| r.id == id)
    }

    pub fn succeeded(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Fetched(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Failed(_)))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.entries
            .iter()
            .filter(|r| matches!(r.outcome, EntryOutcome::Skipped))
            .count()
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.skipped() == 0
    }

    /// The last error seen in this run.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.entries.iter().rev().find_map(|r| r.error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::tests::{MockFactory, client_config, login_script};
    use crate::engine::TransferStatus;
    use crate::storage::{DirectoryStore, MemoryStore};
    use bytes::Bytes;
    use tokio_test::io::Builder;

    fn manifest(items: &[(&str, &str)]) -> FileManifest {
        let entries = items
            .iter()
            .map(|(src, id)| FileEntry::new(src, id).unwrap())
            .collect();
        FileManifest::new(entries).unwrap()
    }

    fn fetch_ok<'a>(builder: &'a mut Builder, path: &str, len: usize) -> &'a mut Builder {
        builder
            .write(format!("SIZE {path}\r\n").as_bytes())
            .read(format!("213 {len}\r\n").as_bytes())
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(format!("RETR {path}\r\n").as_bytes())
            .read(b"150 ok\r\n")
            .read(b"226 ok\r\n")
    }

    fn fetch_missing<'a>(builder: &'a mut Builder, path: &str) -> &'a mut Builder {
        builder
            .write(format!("SIZE {path}\r\n").as_bytes())
            .read(b"550 no such file\r\n")
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(format!("RETR {path}\r\n").as_bytes())
            .read(b"550 no such file\r\n")
    }

    #[test]
    fn duplicated_identifier() {
        let entries = vec![
            FileEntry::new("/a", "x").unwrap(),
            FileEntry::new("/b", "x").unwrap(),
        ];
        assert_eq!(
            FileManifest::new(entries).unwrap_err(),
            ConfigError::DuplicatedIdentifier("x".to_string())
        );
    }

    #[tokio::test]
    async fn single_file_scenario() {
        let control = login_script(&mut Builder::new())
            .write(b"SIZE /a.bin\r\n")
            .read(b"213 4\r\n")
            .write(b"EPSV\r\n")
            .read(b"229 Entering Extended Passive Mode (|||40000|)\r\n")
            .write(b"RETR /a.bin\r\n")
            .read(b"150 ok\r\n")
            .read(b"226 ok\r\n")
            .write(b"QUIT\r\n")
            .read(b"221 bye\r\n")
            .build();
        let data = Builder::new().read(b"abcd").build();
        let factory = MockFactory::new(vec![control], vec![data]);
        let config = client_config();
        let mut conn = ConnectionManager::new(&config, factory.clone());
        let mut engine = TransferEngine::new(config.buffer_size());
        let mut store = MemoryStore::default();

        let manifest = manifest(&[("ftp://ftp.example.com/a.bin", "a")]);
        let report = manifest
            .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Continue)
            .await;
        conn.release().await;

        assert!(report.is_success());
        assert_eq!(factory.providers(), 1);
        assert_eq!(store.get("a"), Some(&Bytes::from_static(b"abcd")));
        let session = report.get("a").and_then(|r| r.session()).unwrap();
        assert_eq!(session.status(), TransferStatus::Complete);
        assert_eq!(session.bytes_transferred(), 4);
    }

    #[tokio::test]
    async fn continue_after_failure() {
        let mut control = Builder::new();
        login_script(&mut control);
        fetch_ok(&mut control, "/1", 1);
        fetch_missing(&mut control, "/2");
        fetch_ok(&mut control, "/3", 3);
        let control = control.build();
        let d1 = Builder::new().read(b"1").build();
        let d2 = Builder::new().build();
        let d3 = Builder::new().read(b"333").build();
        let factory = MockFactory::new(vec![control], vec![d1, d2, d3]);
        let mut conn = ConnectionManager::new(&client_config(), factory.clone());
        let mut engine = TransferEngine::new(1024);
        let mut store = MemoryStore::default();

        let manifest = manifest(&[("/1", "one"), ("/2", "two"), ("/3", "three")]);
        let report = manifest
            .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Continue)
            .await;

        assert!(!report.is_success());
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.get("two").unwrap().error().unwrap().kind(), "TransferError");
        assert!(store.contains("one"));
        assert!(!store.contains("two"));
        assert!(store.contains("three"));
        // file unavailable keeps the control connection
        assert_eq!(factory.providers(), 1);
    }

    #[tokio::test]
    async fn abort_on_failure() {
        let mut control = Builder::new();
        login_script(&mut control);
        fetch_missing(&mut control, "/1");
        let control = control.build();
        let factory = MockFactory::new(vec![control], vec![Builder::new().build()]);
        let mut conn = ConnectionManager::new(&client_config(), factory);
        let mut engine = TransferEngine::new(1024);
        let mut store = MemoryStore::default();

        let manifest = manifest(&[("/1", "one"), ("/2", "two"), ("/3", "three")]);
        let report = manifest
            .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Abort)
            .await;

        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 2);
        assert!(report.get("three").unwrap().session().is_none());
        assert!(matches!(
            report.get("two").unwrap().outcome(),
            EntryOutcome::Skipped
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reconnect_after_lost_connection() {
        let first = login_script(&mut Builder::new())
            .write(b"SIZE /1\r\n")
            .read(b"421 closing control connection\r\n")
            .build();
        let mut second = Builder::new();
        login_script(&mut second);
        let second = fetch_ok(&mut second, "/2", 2).build();
        let data = Builder::new().read(b"22").build();
        let factory = MockFactory::new(vec![first, second], vec![data]);
        let mut conn = ConnectionManager::new(&client_config(), factory.clone());
        let mut engine = TransferEngine::new(1024);
        let mut store = MemoryStore::default();

        let manifest = manifest(&[("/1", "one"), ("/2", "two")]);
        let report = manifest
            .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Continue)
            .await;

        assert_eq!(report.get("one").unwrap().error().unwrap().kind(), "ConnectionError");
        assert!(matches!(
            report.get("two").unwrap().outcome(),
            EntryOutcome::Fetched(2)
        ));
        assert_eq!(factory.providers(), 2);
        assert_eq!(report.last_error().unwrap().kind(), "ConnectionError");
    }

    #[tokio::test]
    async fn connect_failure_is_recorded_per_entry() {
        let factory = MockFactory::new(vec![], vec![]);
        let mut conn = ConnectionManager::new(&client_config(), factory.clone());
        let mut engine = TransferEngine::new(1024);
        let mut store = MemoryStore::default();

        let manifest = manifest(&[("/1", "one"), ("/2", "two")]);
        let report = manifest
            .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Continue)
            .await;

        assert_eq!(report.failed(), 2);
        for r in report.entries() {
            assert_eq!(r.error().unwrap().kind(), "ConnectionError");
        }
        assert_eq!(factory.providers(), 2);
    }

    #[tokio::test]
    async fn rerun_gives_identical_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest(&[("/pub/a.bin", "a"), ("/pub/b.txt", "b")]);
        let mut engine = TransferEngine::new(128);
        let mut store = DirectoryStore::new(dir.path());

        let mut contents = Vec::new();
        for _ in 0..2 {
            let mut control = Builder::new();
            login_script(&mut control);
            fetch_ok(&mut control, "/pub/a.bin", 200);
            let control = fetch_ok(&mut control, "/pub/b.txt", 5).build();
            let a = Builder::new().read(&[7u8; 200]).build();
            let b = Builder::new().read(b"hello").build();
            let factory = MockFactory::new(vec![control], vec![a, b]);
            let mut conn = ConnectionManager::new(&client_config(), factory);

            let report = manifest
                .run(&mut conn, &mut engine, &mut store, ErrorPolicy::Abort)
                .await;
            assert!(report.is_success());
            contents.push((
                store.read("a").await.unwrap().unwrap(),
                store.read("b").await.unwrap().unwrap(),
            ));
        }
        assert_eq!(contents[0], contents[1]);
        assert_eq!(contents[0].1, Bytes::from_static(b"hello"));
        assert!(dir.path().join("a.bin").exists());
        assert!(!dir.path().join("a.bin.part").exists());
    }
}
