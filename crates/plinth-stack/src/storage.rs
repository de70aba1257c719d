//! Storage containers and the packaged code artifact.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::StackResult;

/// An object-storage container.
///
/// Two exist per stack with independent lifecycles: the event-source
/// container (uploads land here) and the code-artifact container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageContainer {
    pub name: String,
    pub location: String,
}

/// The packaged handler source, addressed by content digest.
///
/// Content is immutable once uploaded: new source produces a new digest and
/// therefore a new object key, never an in-place overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    /// Name of the container holding the artifact.
    pub container: String,
    pub object_key: String,
    /// Hex sha256 over the source tree (relative path + bytes, sorted).
    pub content_digest: String,
}

impl CodeArtifact {
    /// Package a source directory: walk it in sorted order and digest each
    /// file's relative path and contents.
    pub fn package(container: &str, name: &str, source_dir: &Path) -> StackResult<Self> {
        let mut hasher = Sha256::new();
        let mut entries: Vec<_> = WalkDir::new(source_dir)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        entries.sort_by(|a, b| a.path().cmp(b.path()));

        for entry in entries {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(source_dir)
                .unwrap_or(entry.path());
            hasher.update(rel.to_string_lossy().as_bytes());
            hasher.update(std::fs::read(entry.path())?);
        }

        let digest = hex::encode(hasher.finalize());
        Ok(Self::from_digest(container, name, &digest))
    }

    /// Build an artifact from a precomputed digest.
    pub fn from_digest(container: &str, name: &str, digest: &str) -> Self {
        let short = &digest[..digest.len().min(12)];
        Self {
            container: container.to_string(),
            object_key: format!("{name}-{short}.zip"),
            content_digest: digest.to_string(),
        }
    }
}
