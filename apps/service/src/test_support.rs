//! In-memory collaborators shared by the worker tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::archive::{ArchiveError, LogArchive, Rotation};
use crate::monitoring::checker::Prober;
use crate::monitoring::types::{Check, CheckMethod, CheckState, ProbeOutcome, Protocol};
use crate::notify::{Notifier, NotifyError};
use crate::storage::{Storage, StorageError};

pub fn sample_check() -> Check {
    Check {
        id: "abcdefghijklmnopqrst".into(),
        user_phone: "5551234567".into(),
        protocol: Protocol::Http,
        url: "example.com/".into(),
        method: CheckMethod::Get,
        success_codes: vec![200],
        timeout_seconds: 3,
        state: CheckState::Down,
        last_checked: None,
    }
}

/// 20 character id derived from `n`
pub fn check_id(n: usize) -> String {
    format!("{n:0>20}")
}

#[derive(Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<(String, String), Value>>,
    unreadable: Mutex<HashSet<String>>,
    fail_updates: AtomicBool,
    updates: AtomicUsize,
}

impl MemoryStorage {
    pub fn insert(&self, collection: &str, id: &str, record: Value) {
        self.records.lock().unwrap().insert((collection.into(), id.into()), record);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.records.lock().unwrap().get(&(collection.into(), id.into())).cloned()
    }

    /// Listed but failing on read
    pub fn make_unreadable(&self, id: &str) {
        self.unreadable.lock().unwrap().insert(id.into());
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn list(&self, collection: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == collection)
            .map(|(_, id)| id.clone())
            .collect())
    }

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StorageError> {
        if self.unreadable.lock().unwrap().contains(id) {
            return Err(StorageError::Io(std::io::Error::other("disk on fire")));
        }
        self.get(collection, id).ok_or_else(|| StorageError::NotFound {
            collection: collection.into(),
            id: id.into(),
        })
    }

    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError> {
        self.insert(collection, id, record.clone());
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StorageError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::other("read-only filesystem")));
        }
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.insert(collection, id, record.clone());
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        self.records.lock().unwrap().remove(&(collection.into(), id.into()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryArchive {
    live: Mutex<HashMap<String, Vec<String>>>,
    archives: Mutex<HashMap<String, String>>,
    fail_appends: AtomicBool,
    fail_compress: Mutex<HashSet<String>>,
}

impl MemoryArchive {
    pub fn lines(&self, id: &str) -> Vec<String> {
        self.live.lock().unwrap().get(id).cloned().unwrap_or_default()
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Compression of this live log fails
    pub fn fail_compress(&self, id: &str) {
        self.fail_compress.lock().unwrap().insert(id.into());
    }

    pub fn archive_ids(&self) -> Vec<String> {
        self.archives.lock().unwrap().keys().cloned().collect()
    }

    fn contents(&self, id: &str) -> String {
        self.lines(id).iter().map(|line| format!("{line}\n")).collect()
    }
}

#[async_trait]
impl LogArchive for MemoryArchive {
    async fn append(&self, id: &str, line: &str) -> Result<(), ArchiveError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(ArchiveError::io(id, std::io::Error::other("no space left")));
        }
        self.live.lock().unwrap().entry(id.into()).or_default().push(line.into());
        Ok(())
    }

    async fn list(&self, include_compressed: bool) -> Result<Vec<String>, ArchiveError> {
        let mut ids: Vec<String> = self.live.lock().unwrap().keys().cloned().collect();
        if include_compressed {
            ids.extend(self.archive_ids());
        }
        Ok(ids)
    }

    async fn compress(&self, id: &str, archive_id: &str) -> Result<(), ArchiveError> {
        if self.fail_compress.lock().unwrap().contains(id) {
            return Err(ArchiveError::io(id, std::io::Error::other("compression failed")));
        }
        let mut archives = self.archives.lock().unwrap();
        if archives.contains_key(archive_id) {
            return Err(ArchiveError::ArchiveExists(archive_id.into()));
        }
        archives.insert(archive_id.into(), self.contents(id));
        Ok(())
    }

    async fn decompress(&self, archive_id: &str) -> Result<String, ArchiveError> {
        self.archives.lock().unwrap().get(archive_id).cloned().ok_or_else(|| {
            ArchiveError::io(archive_id, std::io::Error::from(std::io::ErrorKind::NotFound))
        })
    }

    async fn truncate(&self, id: &str) -> Result<(), ArchiveError> {
        self.live.lock().unwrap().insert(id.into(), Vec::new());
        Ok(())
    }

    async fn rotate(&self, id: &str, archive_id: &str) -> Result<Rotation, ArchiveError> {
        if self.lines(id).is_empty() {
            return Ok(Rotation::Empty);
        }
        let bytes = self.contents(id).len() as u64;
        self.compress(id, archive_id).await?;
        self.truncate(id).await?;
        Ok(Rotation::Archived { archive_id: archive_id.into(), bytes })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected { status: 500, body: "provider down".into() });
        }
        self.sent.lock().unwrap().push((phone.into(), message.into()));
        Ok(())
    }
}

/// Answers every probe with a fixed outcome and records who was probed
pub struct StaticProber {
    outcome: ProbeOutcome,
    probed: Mutex<Vec<String>>,
}

impl StaticProber {
    pub fn new(outcome: ProbeOutcome) -> Self {
        Self { outcome, probed: Mutex::new(Vec::new()) }
    }

    pub fn probed(&self) -> Vec<String> {
        self.probed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for StaticProber {
    async fn probe(&self, check: &Check) -> ProbeOutcome {
        self.probed.lock().unwrap().push(check.id.clone());
        self.outcome.clone()
    }
}
