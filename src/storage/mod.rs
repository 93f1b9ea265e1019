//! JSON file persistence: one snapshot per provider plus the annotation store.

use crate::models::{Annotation, AnnotationUpdate, Listing};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub type AnnotationMap = BTreeMap<String, Annotation>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("listing id must not be empty")]
    EmptyId,

    #[error("annotation store {path:?} is unreadable, refusing to overwrite it: {reason}")]
    CorruptAnnotations { path: PathBuf, reason: String },
}

/// Write `bytes` to a sibling temp file, then rename over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("Failed to write {:?}", tmp))?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {:?}", path))?;
    Ok(())
}

// ── Snapshots ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `{dir}/{provider}_listings.json`
    pub fn path_for(&self, provider: &str) -> PathBuf {
        self.dir.join(format!("{}_listings.json", provider))
    }

    /// Replace the provider's snapshot with `listings`.
    pub async fn save(&self, provider: &str, listings: &[Listing]) -> Result<()> {
        let path = self.path_for(provider);
        let json = serde_json::to_vec_pretty(listings).context("Failed to serialize snapshot")?;
        write_atomic(&path, &json).await?;
        debug!("Wrote {} listings to {:?}", listings.len(), path);
        Ok(())
    }

    pub async fn load(&self, provider: &str) -> Result<Vec<Listing>> {
        let path = self.path_for(provider);
        let raw = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_slice(&raw).with_context(|| format!("Corrupt snapshot {:?}", path))
    }
}

// ── Annotations ───────────────────────────────────────────────────────────────

/// Annotation file keyed by listing id. Writes from one process are serialized.
#[derive(Debug, Clone)]
pub struct AnnotationStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl AnnotationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty store; an unparsable one is an error.
    pub async fn load(&self) -> Result<AnnotationMap> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(AnnotationMap::new()),
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };
        serde_json::from_slice(&raw).with_context(|| format!("Corrupt annotation store {:?}", self.path))
    }

    /// Read-modify-write of one entry; only the fields present in `update` change.
    pub async fn update(&self, update: &AnnotationUpdate) -> Result<Annotation> {
        if update.id.trim().is_empty() {
            return Err(CatalogError::EmptyId.into());
        }
        if let Some(rating) = update.rating {
            if !(1..=5).contains(&rating) {
                return Err(CatalogError::InvalidRating(rating).into());
            }
        }

        let _guard = self.lock.lock().await;

        let mut all = self.load().await.map_err(|e| CatalogError::CorruptAnnotations {
            path: self.path.clone(),
            reason: format!("{:#}", e),
        })?;

        let entry = all.entry(update.id.clone()).or_default();
        entry.merge(update);
        let merged = entry.clone();
        if merged.is_empty() {
            all.remove(&update.id);
        }

        let json = serde_json::to_vec_pretty(&all).context("Failed to serialize annotations")?;
        write_atomic(&self.path, &json).await?;
        info!("Annotation saved for {}", update.id);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnnotationField, Tag};
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn snapshot_save_replaces_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));
        let first = vec![
            Listing::new("duda", "1", "https://d.test/1", 1000.0),
            Listing::new("duda", "2", "https://d.test/2", 1100.0),
        ];
        store.save("duda", &first).await.unwrap();
        store.save("duda", &first[..1]).await.unwrap();

        assert_eq!(store.load("duda").await.unwrap(), first[..1].to_vec());
        assert!(store.path_for("duda").ends_with("nested/duda_listings.json"));
        assert!(!dir.path().join("nested/duda_listings.json.tmp").exists());
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_err!(SnapshotStore::new(dir.path()).load("olx").await);
    }

    #[tokio::test]
    async fn annotation_update_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));

        store
            .update(&AnnotationUpdate {
                id: "olx_1".into(),
                tag: Some(Tag::Scheduled),
                rating: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        let merged = store
            .update(&AnnotationUpdate {
                id: "olx_1".into(),
                note: Some("sol da manhã".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(merged.tag, Some(Tag::Scheduled));
        assert_eq!(merged.rating, Some(4));
        assert_eq!(store.load().await.unwrap()["olx_1"].note.as_deref(), Some("sol da manhã"));
    }

    #[tokio::test]
    async fn clearing_every_field_removes_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));
        store
            .update(&AnnotationUpdate { id: "a_1".into(), rating: Some(2), ..Default::default() })
            .await
            .unwrap();
        store
            .update(&AnnotationUpdate {
                id: "a_1".into(),
                clear: vec![AnnotationField::Rating],
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_out_of_range_rating() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));
        let err = assert_err!(
            store
                .update(&AnnotationUpdate { id: "a_1".into(), rating: Some(6), ..Default::default() })
                .await
        );
        assert!(matches!(err.downcast_ref::<CatalogError>(), Some(CatalogError::InvalidRating(6))));
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn corrupt_store_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotations.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = AnnotationStore::new(&path);

        assert_err!(store.load().await);
        let err = assert_err!(
            store
                .update(&AnnotationUpdate { id: "a_1".into(), rating: Some(3), ..Default::default() })
                .await
        );
        assert!(matches!(
            err.downcast_ref::<CatalogError>(),
            Some(CatalogError::CorruptAnnotations { .. })
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[tokio::test]
    async fn concurrent_updates_in_one_process_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = AnnotationStore::new(dir.path().join("annotations.json"));
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(&AnnotationUpdate { id: format!("p_{i}"), rating: Some(5), ..Default::default() })
                    .await
            }));
        }
        for h in handles {
            assert_ok!(h.await.unwrap());
        }
        assert_eq!(assert_ok!(store.load().await).len(), 8);
    }
}
