use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::error::UploadError;

/// Directory that receives uploaded rosters under their original file names.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create upload directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves the stored path for a client-supplied name. Only the final
    /// path component is kept.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf, UploadError> {
        let name = Path::new(filename)
            .file_name()
            .ok_or_else(|| UploadError::InvalidFilename(filename.to_string()))?;
        Ok(self.dir.join(name))
    }

    /// Writes the upload, replacing any earlier file with the same name.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf, UploadError> {
        let path = self.path_for(filename)?;
        tokio::fs::write(&path, data).await?;
        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(path)
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, UploadError> {
        Ok(tokio::fs::read(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("nested").join("uploads");
        let store = UploadStore::open(&dir).unwrap();
        assert!(store.dir().is_dir());
    }

    #[test]
    fn path_keeps_only_final_component() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();

        let path = store.path_for("../../etc/grades.csv").unwrap();
        assert_eq!(path, root.path().join("grades.csv"));
        assert!(matches!(
            store.path_for(".."),
            Err(UploadError::InvalidFilename(_))
        ));
    }

    #[tokio::test]
    async fn save_overwrites_same_name() {
        let root = tempfile::tempdir().unwrap();
        let store = UploadStore::open(root.path()).unwrap();

        store.save("grades.csv", b"first").await.unwrap();
        let path = store.save("grades.csv", b"second").await.unwrap();

        assert_eq!(store.read(&path).await.unwrap(), b"second");
    }
}
