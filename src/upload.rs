//! Hand-off of output files to an object store

use crate::error::PipelineError;
use std::{
    future::Future,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Destination of the output files
///
/// Implementations own authentication and transfer. The pipeline only hands
/// them a local file and the destination key it should be stored under, and
/// wraps the call in its retry policy.
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under some destination key
    fn upload(
        &self,
        from: &Path,
        to: &str,
    ) -> impl Future<Output = Result<(), PipelineError>> + Send;
}

/// Object store backed by a local directory
///
/// Destination keys are interpreted as `/`-separated paths relative to the
/// root directory.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct LocalObjectStore {
    /// Directory which plays the role of the bucket
    root: PathBuf,
}
//
impl LocalObjectStore {
    /// Set up a store rooted at some directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the file associated with a destination key
    ///
    /// Keys may not climb out of the root directory.
    fn target(&self, key: &str) -> Result<PathBuf, PipelineError> {
        let mut target = self.root.clone();
        for part in key.split('/') {
            match part {
                "" | "." => continue,
                ".." => return Err(PipelineError::Destination { key: key.into() }),
                _ => target.push(part),
            }
        }
        Ok(target)
    }
}
//
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, from: &Path, to: &str) -> Result<(), PipelineError> {
        let target = self.target(to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PipelineError::io("creating", parent, e))?;
        }
        fs::copy(from, &target)
            .await
            .map_err(|e| {
                log::debug!("Failed to copy {} to {}", from.display(), target.display());
                PipelineError::io("uploading to", &target, e)
            })?;
        log::info!("Uploaded {} to {}", from.display(), target.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_uploads_land_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("reviews_0.parquet");
        std::fs::write(&source, b"PAR1").unwrap();
        let store = LocalObjectStore::new(dir.path().join("bucket"));
        store
            .upload(&source, "yelp_project/data/reviews/reviews_0.parquet")
            .await
            .unwrap();
        let uploaded = dir
            .path()
            .join("bucket/yelp_project/data/reviews/reviews_0.parquet");
        assert_eq!(std::fs::read(uploaded).unwrap(), b"PAR1");
    }

    #[tokio::test]
    async fn failed_copies_name_the_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("reviews_0.parquet");
        std::fs::write(&source, b"PAR1").unwrap();
        let store = LocalObjectStore::new(dir.path().join("bucket"));
        std::fs::create_dir_all(dir.path().join("bucket/taken")).unwrap();
        match store.upload(&source, "taken").await {
            Err(PipelineError::Io { path, .. }) => assert!(path.ends_with("taken")),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("reviews_0.parquet");
        std::fs::write(&source, b"PAR1").unwrap();
        let store = LocalObjectStore::new(dir.path().join("bucket"));
        let result = store.upload(&source, "data/../../escaped.parquet").await;
        let error = result.unwrap_err();
        assert!(matches!(error, PipelineError::Destination { .. }));
        assert!(!error.is_retryable());
        assert!(!dir.path().join("escaped.parquet").exists());
        assert_eq!(
            store.target("./a//b/").unwrap(),
            dir.path().join("bucket/a/b")
        );
    }

    #[tokio::test]
    async fn missing_sources_are_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let result = store.upload(&dir.path().join("nope"), "x/nope").await;
        assert!(matches!(result, Err(PipelineError::Io { .. })));
    }
}
