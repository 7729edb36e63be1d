// northstar-core/src/infrastructure/fs.rs

use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::infrastructure::error::InfrastructureError;

/// Writes `content` through a temporary file in the same directory, then renames it
/// over `path`. Readers see either the previous artifact or the new one, never a partial file.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Output directory for run artifacts, created on first use.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    root: PathBuf,
}

impl ArtifactDir {
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, InfrastructureError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn write_text(&self, name: &str, content: &str) -> Result<PathBuf, InfrastructureError> {
        let path = self.root.join(name);
        atomic_write(&path, content)?;
        Ok(path)
    }

    /// Pretty-printed JSON.
    pub fn write_json<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<PathBuf, InfrastructureError> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_text(name, &json)
    }
}
