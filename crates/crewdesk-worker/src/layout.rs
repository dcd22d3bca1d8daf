//! Per-tenant artifact directory layout.
//!
//! The surrounding application owns the artifact root and the upload naming
//! conventions; pipelines only ever combine the filenames stored on the job
//! row with the directories resolved here.

use std::path::{Path, PathBuf};

/// Resolves tenant-relative artifact directories under one root.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a tenant's receipt uploads for one month, and every
    /// artifact derived from them.
    pub fn receipt_dir(&self, tenant: &str, month_folder: &str) -> PathBuf {
        self.root.join(tenant).join(month_folder)
    }

    /// Directory holding a tenant's estimate audio clips.
    pub fn estimate_dir(&self, tenant: &str) -> PathBuf {
        self.root.join(tenant).join("estimates")
    }
}
