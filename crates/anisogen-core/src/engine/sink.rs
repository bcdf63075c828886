use crate::core::io::CsvArtifactError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Receives every artifact after it has been published locally.
///
/// Sinks are best effort: the search keeps going on local state whatever a
/// sink returns.
pub trait ArtifactSink: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, local: &Path) -> std::io::Result<()>;
}

/// Copies artifacts into a second directory, replacing older copies.
#[derive(Debug, Clone)]
pub struct DirectoryMirror {
    root: PathBuf,
}

impl DirectoryMirror {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactSink for DirectoryMirror {
    fn name(&self) -> &str {
        "directory-mirror"
    }

    fn publish(&self, local: &Path) -> std::io::Result<()> {
        let file_name = local.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' has no file name", local.display()),
            )
        })?;
        std::fs::create_dir_all(&self.root)?;
        let mut staged = tempfile::NamedTempFile::new_in(&self.root)?;
        std::io::copy(&mut std::fs::File::open(local)?, &mut staged)?;
        staged.persist(self.root.join(file_name)).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Forwards `path` to every sink, logging failures instead of returning them.
pub fn mirror_artifact(sinks: &[Box<dyn ArtifactSink>], path: &Path) {
    for sink in sinks {
        match sink.publish(path) {
            Ok(()) => debug!(sink = sink.name(), path = %path.display(), "Mirrored artifact."),
            Err(e) => warn!(
                sink = sink.name(),
                path = %path.display(),
                error = %e,
                "Failed to mirror artifact; continuing with local copy."
            ),
        }
    }
}

/// The run's work directory plus any mirrors of it.
pub struct ArtifactStore {
    dir: PathBuf,
    sinks: Vec<Box<dyn ArtifactSink>>,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sinks: Vec::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ArtifactSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Writes `name` locally with `write`, then mirrors it. Local failures are
    /// returned; mirror failures are only logged.
    pub fn publish<F>(&self, name: &str, write: F) -> Result<PathBuf, CsvArtifactError>
    where
        F: FnOnce(&Path) -> Result<(), CsvArtifactError>,
    {
        let path = self.path(name);
        write(&path)?;
        mirror_artifact(&self.sinks, &path);
        Ok(path)
    }
}
