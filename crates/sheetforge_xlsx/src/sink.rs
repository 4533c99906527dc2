//! Artifact delivery targets for serialized workbooks.

use std::fs;
use std::path::{Path, PathBuf};

use crate::spec::{SinkError, SpecArtifact};

/// Receives each finished workbook.
pub trait ArtifactSink {
    fn deliver(&mut self, artifact: SpecArtifact) -> Result<(), SinkError>;
}

impl<F> ArtifactSink for F
where
    F: FnMut(SpecArtifact) -> Result<(), SinkError>,
{
    fn deliver(&mut self, artifact: SpecArtifact) -> Result<(), SinkError> {
        self(artifact)
    }
}

/// Collects artifacts in delivery order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub artifacts: Vec<SpecArtifact>,
}

impl MemorySink {
    pub fn into_artifacts(self) -> Vec<SpecArtifact> {
        self.artifacts
    }
}

impl ArtifactSink for MemorySink {
    fn deliver(&mut self, artifact: SpecArtifact) -> Result<(), SinkError> {
        self.artifacts.push(artifact);
        Ok(())
    }
}

/// Writes each artifact to `<dir>/<file_name>`, overwriting existing files.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    path_dir: PathBuf,
    l_paths_written: Vec<PathBuf>,
}

impl DirectorySink {
    pub fn new(path_dir: impl Into<PathBuf>) -> Self {
        Self {
            path_dir: path_dir.into(),
            l_paths_written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.path_dir
    }

    /// Paths written so far, in delivery order.
    pub fn paths_written(&self) -> &[PathBuf] {
        &self.l_paths_written
    }
}

impl ArtifactSink for DirectorySink {
    fn deliver(&mut self, artifact: SpecArtifact) -> Result<(), SinkError> {
        validate_file_name(&artifact.file_name)?;

        fs::create_dir_all(&self.path_dir).map_err(|source| SinkError::Io {
            path: self.path_dir.clone(),
            source,
        })?;
        let path_file = self.path_dir.join(&artifact.file_name);
        fs::write(&path_file, &artifact.bytes).map_err(|source| SinkError::Io {
            path: path_file.clone(),
            source,
        })?;

        log::debug!(
            "Wrote {} ({} bytes)",
            path_file.display(),
            artifact.bytes.len()
        );
        self.l_paths_written.push(path_file);
        Ok(())
    }
}

/// Reject names that are empty or would escape the target directory.
pub fn validate_file_name(file_name: &str) -> Result<(), SinkError> {
    if file_name.trim().is_empty()
        || file_name.contains(['/', '\\'])
        || matches!(file_name, "." | "..")
    {
        return Err(SinkError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}
