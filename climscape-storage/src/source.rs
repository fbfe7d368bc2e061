//! Raw access to simulation documents.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use climscape_core::SourceError;
use tracing::trace;

/// Where simulation documents come from.
///
/// Paths are relative and `/`-separated, e.g.
/// `simulation/scenarios/base/T/time_12/horizontal_ground.json`.
#[async_trait]
pub trait SimulationSource: Send + Sync {
    /// Read the full document at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Source backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` under the root. Absolute paths and parent components
    /// are refused.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SourceError> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        let mut segments = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    segments += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(SourceError::InvalidPath {
                        path: path.to_string(),
                    })
                }
            }
        }
        if segments == 0 {
            return Err(SourceError::InvalidPath {
                path: path.to_string(),
            });
        }
        Ok(resolved)
    }
}

#[async_trait]
impl SimulationSource for DirectorySource {
    async fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let file = self.resolve(path)?;
        trace!(path = %path, "reading simulation document");
        tokio::fs::read(&file).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound {
                path: path.to_string(),
            },
            _ => SourceError::Io {
                path: path.to_string(),
                reason: e.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_joins_under_root() {
        let source = DirectorySource::new("/data");
        let path = source
            .resolve("simulation/scenarios/base/T/time_0/horizontal_ground.json")
            .unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/simulation/scenarios/base/T/time_0/horizontal_ground.json")
        );
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let source = DirectorySource::new("/data");
        for bad in ["../etc/passwd", "/etc/passwd", "simulation/../../x", "", "."] {
            assert!(
                matches!(source.resolve(bad), Err(SourceError::InvalidPath { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_read_existing_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("simulation");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("variablesAttributes.json"), b"{}").unwrap();

        let source = DirectorySource::new(dir.path());
        let bytes = source.read("simulation/variablesAttributes.json").await.unwrap();
        assert_eq!(bytes, b"{}");

        let missing = source.read("simulation/scenarios/scenarios.json").await;
        assert_eq!(
            missing,
            Err(SourceError::NotFound {
                path: "simulation/scenarios/scenarios.json".to_string()
            })
        );
    }
}
