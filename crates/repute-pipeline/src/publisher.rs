// crates/repute-pipeline/src/publisher.rs
//
// Publishers for the cycle snapshot.
//
// Publishing is idempotent per timestamp: a snapshot whose timestamp and
// content fingerprint were already published is reported as Unchanged and
// nothing is written. A file publish is complete only once `latest.json`
// is in place; a failure before that removes the snapshot file it wrote.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use repute_core::error::ReputeError;
use repute_core::score::PublishedResult;
use repute_core::traits::{PublishOutcome, Publisher};

/// SHA-256 of the snapshot's canonical JSON, hex-encoded.
pub fn fingerprint(result: &PublishedResult) -> Result<String, ReputeError> {
    let bytes = serde_json::to_vec(result)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Writes `snapshot-{millis}.json` and refreshes `latest.json` in a directory.
pub struct JsonFilePublisher {
    dir: PathBuf,
    /// timestamp millis -> fingerprint of what was written for it.
    written: Mutex<HashMap<i64, String>>,
}

impl JsonFilePublisher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn snapshot_path(&self, result: &PublishedResult) -> PathBuf {
        self.dir
            .join(format!("snapshot-{}.json", result.timestamp.timestamp_millis()))
    }

    pub fn latest_path(&self) -> PathBuf {
        self.dir.join("latest.json")
    }

    fn already_written(&self, millis: i64, print: &str) -> Result<bool, ReputeError> {
        let written = self
            .written
            .lock()
            .map_err(|_| ReputeError::Publish("publisher lock poisoned".to_string()))?;
        Ok(written.get(&millis).map_or(false, |p| p == print))
    }

    /// Write to a sibling temp file, then rename over the target.
    async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ReputeError> {
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .map_err(|e| ReputeError::Publish(format!("Failed to write {}: {}", tmp.display(), e)))?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ReputeError::Publish(format!(
                "Failed to move {} into place: {}",
                path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Whether `latest.json` already holds this snapshot, or a newer one.
    async fn latest_covers(&self, body: &[u8], result: &PublishedResult) -> bool {
        match tokio::fs::read(self.latest_path()).await {
            Ok(latest) if latest == body => true,
            Ok(latest) => serde_json::from_slice::<LatestHeader>(&latest)
                .map_or(false, |header| header.timestamp > result.timestamp),
            Err(_) => false,
        }
    }
}

/// The part of `latest.json` needed to order snapshots.
#[derive(Deserialize)]
struct LatestHeader {
    timestamp: DateTime<Utc>,
}

#[async_trait]
impl Publisher for JsonFilePublisher {
    async fn publish(&self, result: &PublishedResult) -> Result<PublishOutcome, ReputeError> {
        let millis = result.timestamp.timestamp_millis();
        let print = fingerprint(result)?;
        if self.already_written(millis, &print)? {
            tracing::debug!("Snapshot {} already published", millis);
            return Ok(PublishOutcome::Unchanged);
        }

        let body = serde_json::to_vec_pretty(result)?;
        let snapshot = self.snapshot_path(result);

        // A previous process may have completed the same publish.
        let existing = tokio::fs::read(&snapshot).await.ok();
        let had_snapshot = existing.is_some();
        if existing.as_deref() == Some(body.as_slice()) && self.latest_covers(&body, result).await {
            self.remember(millis, print)?;
            return Ok(PublishOutcome::Unchanged);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ReputeError::Publish(format!("Failed to create {}: {}", self.dir.display(), e)))?;
        Self::write_atomic(&snapshot, &body).await?;
        if let Err(e) = Self::write_atomic(&self.latest_path(), &body).await {
            if !had_snapshot {
                if let Err(rm) = tokio::fs::remove_file(&snapshot).await {
                    tracing::warn!("Could not remove partial snapshot {}: {}", snapshot.display(), rm);
                }
            }
            return Err(e);
        }
        self.remember(millis, print)?;

        tracing::info!("Published snapshot to {}", snapshot.display());
        Ok(PublishOutcome::Published)
    }
}

impl JsonFilePublisher {
    fn remember(&self, millis: i64, print: String) -> Result<(), ReputeError> {
        self.written
            .lock()
            .map_err(|_| ReputeError::Publish("publisher lock poisoned".to_string()))?
            .insert(millis, print);
        Ok(())
    }
}

/// Keeps published snapshots in memory, in publish order.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    snapshots: Mutex<Vec<PublishedResult>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every distinct snapshot published so far.
    pub fn snapshots(&self) -> Vec<PublishedResult> {
        self.snapshots.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    async fn publish(&self, result: &PublishedResult) -> Result<PublishOutcome, ReputeError> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| ReputeError::Publish("publisher lock poisoned".to_string()))?;
        if snapshots.iter().any(|s| s == result) {
            return Ok(PublishOutcome::Unchanged);
        }
        snapshots.push(result.clone());
        Ok(PublishOutcome::Published)
    }
}
