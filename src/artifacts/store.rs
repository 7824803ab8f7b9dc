//! Artifact store: resolves catalog artifacts to local files.
//!
//! Every distinct artifact of a [`Catalog`] lives at `<dir>/<base name>`.
//! A request for an artifact already on disk resolves immediately; otherwise
//! the bytes are fetched and persisted through a temporary file in the same
//! directory, so a half-written download is never mistaken for a present
//! artifact.
//!
//! Each artifact counts once towards the resolved total, whether its fetch
//! succeeded or failed. Failures are not retried automatically; they stay in
//! the failure list until a later request for the same artifact succeeds.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::fetch::Fetcher;
use crate::core::Catalog;
use crate::{BenchError, BenchResult};

#[derive(Debug)]
struct Entry {
    url: String,
    path: PathBuf,
    present: AtomicBool,
    resolved: AtomicBool,
}

impl Entry {
    fn is_present(&self) -> bool {
        if self.present.load(Ordering::Acquire) {
            return true;
        }
        let on_disk = self.path.is_file();
        if on_disk {
            self.present.store(true, Ordering::Release);
        }
        on_disk
    }
}

/// How a single request resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    AlreadyPresent,
    Fetched { bytes: usize },
    Failed { message: String },
}

/// Aggregate outcome of [`ArtifactStore::request_all`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadSummary {
    pub total: usize,
    pub resolved: usize,
    pub fetched: usize,
    pub already_present: usize,
    /// `(artifact, reason)` for every failed fetch.
    pub failed: Vec<(String, String)>,
}

impl DownloadSummary {
    pub fn is_complete(&self) -> bool {
        self.resolved == self.total && self.failed.is_empty()
    }
}

/// One row of the artifact status listing.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactStatus {
    pub artifact: String,
    pub url: String,
    pub path: PathBuf,
    pub present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

#[derive(Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    entries: Arc<BTreeMap<String, Arc<Entry>>>,
    resolved: Arc<AtomicUsize>,
    failures: Arc<Mutex<BTreeMap<String, String>>>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("dir", &self.dir)
            .field("total", &self.entries.len())
            .field("resolved", &self.resolved.load(Ordering::Acquire))
            .finish()
    }
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>, catalog: &Catalog, fetcher: Arc<dyn Fetcher>) -> Self {
        let dir = dir.into();
        let entries = catalog
            .distinct_artifacts()
            .into_iter()
            .map(|id| {
                let entry = Entry {
                    url: catalog.url_of(&id),
                    path: dir.join(&id),
                    present: AtomicBool::new(false),
                    resolved: AtomicBool::new(false),
                };
                (id, Arc::new(entry))
            })
            .collect();

        ArtifactStore {
            dir,
            fetcher,
            entries: Arc::new(entries),
            resolved: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of distinct artifacts in the catalog.
    pub fn total(&self) -> usize {
        self.entries.len()
    }

    /// Deterministic local path of an artifact.
    pub fn path_of(&self, artifact: &str) -> BenchResult<PathBuf> {
        self.entry(artifact).map(|e| e.path.clone())
    }

    fn entry(&self, artifact: &str) -> BenchResult<&Arc<Entry>> {
        self.entries
            .get(artifact)
            .ok_or_else(|| BenchError::ArtifactMissing(format!("{artifact} is not in the catalog")))
    }

    /// Resolve one artifact, fetching it if it is not on disk.
    ///
    /// Fetch failures are reported through [`Resolution::Failed`] and still
    /// count as resolved; only an artifact outside the catalog is an error.
    #[instrument(level = "debug", skip(self))]
    pub async fn request(&self, artifact: &str) -> BenchResult<Resolution> {
        let entry = Arc::clone(self.entry(artifact)?);

        if entry.is_present() {
            debug!(artifact, "already present");
            self.mark_resolved(&entry);
            self.clear_failure(artifact);
            return Ok(Resolution::AlreadyPresent);
        }

        let outcome = match self.fetcher.fetch(&entry.url).await {
            Ok(bytes) => {
                let len = bytes.len();
                match persist(self.dir.clone(), entry.path.clone(), bytes).await {
                    Ok(()) => {
                        entry.present.store(true, Ordering::Release);
                        Resolution::Fetched { bytes: len }
                    }
                    Err(e) => Resolution::Failed {
                        message: e.to_string(),
                    },
                }
            }
            Err(e) => Resolution::Failed {
                message: e.to_string(),
            },
        };

        match &outcome {
            Resolution::Failed { message } => {
                warn!(artifact, url = %entry.url, error = %message, "artifact fetch failed");
                self.record_failure(artifact, message);
            }
            Resolution::Fetched { bytes } => {
                debug!(artifact, bytes, "artifact stored");
                self.clear_failure(artifact);
            }
            Resolution::AlreadyPresent => {}
        }
        self.mark_resolved(&entry);
        Ok(outcome)
    }

    /// Request every distinct artifact concurrently and wait for all of them.
    pub async fn request_all(&self) -> DownloadSummary {
        let total = self.total();
        let (tx, mut rx) = mpsc::unbounded_channel();

        for id in self.entries.keys() {
            let store = self.clone();
            let tx = tx.clone();
            let id = id.clone();
            tokio::spawn(async move {
                let outcome = store.request(&id).await;
                let _ = tx.send((id, outcome));
            });
        }
        drop(tx);

        let mut summary = DownloadSummary {
            total,
            ..DownloadSummary::default()
        };
        while let Some((id, outcome)) = rx.recv().await {
            match outcome {
                Ok(Resolution::AlreadyPresent) => summary.already_present += 1,
                Ok(Resolution::Fetched { .. }) => summary.fetched += 1,
                Ok(Resolution::Failed { message }) => summary.failed.push((id, message)),
                Err(e) => summary.failed.push((id, e.to_string())),
            }
            let (resolved, total) = self.progress();
            info!("Files downloaded: {resolved} / {total}");
        }

        summary.failed.sort();
        summary.resolved = self.progress().0;
        summary
    }

    /// `(resolved, total)`; failed fetches count as resolved.
    pub fn progress(&self) -> (usize, usize) {
        (self.resolved.load(Ordering::Acquire), self.total())
    }

    /// Every artifact has resolved and none of them failed.
    pub fn is_ready(&self) -> bool {
        let (resolved, total) = self.progress();
        resolved == total && self.failures().is_empty()
    }

    /// Every artifact exists on disk.
    pub fn all_present(&self) -> bool {
        self.entries.values().all(|e| e.is_present())
    }

    /// Artifacts that are not on disk, in catalog order.
    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| !e.is_present())
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn failures(&self) -> BTreeMap<String, String> {
        self.failures.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// SHA-256 of an artifact's local file.
    pub fn fingerprint(&self, artifact: &str) -> BenchResult<String> {
        let path = self.path_of(artifact)?;
        let bytes = std::fs::read(&path)
            .map_err(|e| BenchError::ArtifactMissing(format!("{}: {e}", path.display())))?;
        Ok(crate::sha256_hex(&bytes))
    }

    pub fn statuses(&self) -> Vec<ArtifactStatus> {
        let failures = self.failures();
        self.entries
            .iter()
            .map(|(id, e)| ArtifactStatus {
                artifact: id.clone(),
                url: e.url.clone(),
                path: e.path.clone(),
                present: e.is_present(),
                failure: failures.get(id).cloned(),
            })
            .collect()
    }

    fn mark_resolved(&self, entry: &Entry) {
        if !entry.resolved.swap(true, Ordering::AcqRel) {
            self.resolved.fetch_add(1, Ordering::AcqRel);
        }
    }

    fn record_failure(&self, artifact: &str, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(artifact.to_string(), message.to_string());
        }
    }

    fn clear_failure(&self, artifact: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.remove(artifact);
        }
    }
}

/// Write through a temporary file in `dir`, then rename into place.
async fn persist(dir: PathBuf, path: PathBuf, bytes: Vec<u8>) -> BenchResult<()> {
    tokio::task::spawn_blocking(move || -> BenchResult<()> {
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| BenchError::Io(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| BenchError::Message(format!("persist task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DEFAULT_BASE_URL;
    use async_trait::async_trait;
    use tempfile::tempdir;

    struct Echo;

    #[async_trait]
    impl Fetcher for Echo {
        async fn fetch(&self, url: &str) -> BenchResult<Vec<u8>> {
            Ok(url.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_request_persists_under_base_name() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::reference(DEFAULT_BASE_URL);
        let store = ArtifactStore::new(dir.path(), &catalog, Arc::new(Echo));

        let outcome = store.request("sha256.json").await.unwrap();
        assert!(matches!(outcome, Resolution::Fetched { .. }));
        let path = store.path_of("sha256.json").unwrap();
        assert_eq!(path, dir.path().join("sha256.json"));
        assert_eq!(
            std::fs::read_to_string(path).unwrap(),
            "https://ci-keys.zkmopro.org/sha256.json"
        );
        assert_eq!(store.progress(), (1, 12));
    }

    #[tokio::test]
    async fn test_unknown_artifact_is_an_error() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::reference(DEFAULT_BASE_URL);
        let store = ArtifactStore::new(dir.path(), &catalog, Arc::new(Echo));
        let err = store.request("nope.zkey").await.unwrap_err();
        assert_eq!(err.kind(), "ArtifactMissing");
    }

    #[test]
    fn test_fingerprint_of_local_file() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::reference(DEFAULT_BASE_URL);
        let store = ArtifactStore::new(dir.path(), &catalog, Arc::new(Echo));
        std::fs::write(dir.path().join("input.json"), b"abc").unwrap();
        assert_eq!(
            store.fingerprint("input.json").unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(store.fingerprint("rsa_main.dat").is_err());
    }
}
