// Copyright (c) 2022-2023 The MobileCoin Foundation

//! File backed [`Storage`] for simulated devices

use std::path::{Path, PathBuf};

use anyhow::Context;
use log::{debug, error, warn};

use keychain_core::keystore::{Storage, ERASED, STORAGE_LEN};

/// [`FileStorage`] holds the keystore image in memory, writing it back
/// to the backing file (where provided) on [`Storage::commit`].
pub struct FileStorage {
    path: Option<PathBuf>,
    data: Vec<u8>,
    artifact: Vec<u8>,
    dirty: bool,
}

impl FileStorage {
    /// Open a storage image and optional artifact file
    ///
    /// Missing images are created in the erased (all `0xFF`) state.
    pub fn open(path: Option<&Path>, artifact: Option<&Path>) -> anyhow::Result<Self> {
        let data = match path {
            Some(p) if p.exists() => {
                let mut d = std::fs::read(p)
                    .with_context(|| format!("failed to read storage image '{}'", p.display()))?;

                if d.len() != STORAGE_LEN {
                    warn!(
                        "Storage image length {} (expected {}), resizing",
                        d.len(),
                        STORAGE_LEN
                    );
                    d.resize(STORAGE_LEN, ERASED);
                }

                d
            }
            Some(p) => {
                debug!("Creating erased storage image '{}'", p.display());

                let d = vec![ERASED; STORAGE_LEN];
                std::fs::write(p, &d)
                    .with_context(|| format!("failed to create storage image '{}'", p.display()))?;
                d
            }
            None => vec![ERASED; STORAGE_LEN],
        };

        let artifact = match artifact {
            Some(p) => std::fs::read(p)
                .with_context(|| format!("failed to read artifact '{}'", p.display()))?,
            None => vec![],
        };

        Ok(Self {
            path: path.map(Path::to_path_buf),
            data,
            artifact,
            dirty: false,
        })
    }

    /// Fetch the in-memory storage image
    pub fn image(&self) -> &[u8] {
        &self.data
    }
}

impl Storage for FileStorage {
    fn read_bytes(&self, offset: usize, buff: &mut [u8]) {
        buff.copy_from_slice(&self.data[offset..][..buff.len()]);
    }

    fn write_bytes(&mut self, offset: usize, data: &[u8]) {
        self.data[offset..][..data.len()].copy_from_slice(data);
        self.dirty = true;
    }

    fn commit(&mut self) {
        let p = match (&self.path, self.dirty) {
            (Some(p), true) => p,
            _ => return,
        };

        match std::fs::write(p, &self.data) {
            Ok(_) => self.dirty = false,
            Err(e) => error!("Failed to write storage image '{}': {}", p.display(), e),
        }
    }

    fn artifact_len(&self) -> usize {
        self.artifact.len()
    }

    fn read_artifact(&self, offset: usize, buff: &mut [u8]) -> usize {
        let d = self.artifact.get(offset..).unwrap_or_default();
        let n = d.len().min(buff.len());
        buff[..n].copy_from_slice(&d[..n]);
        n
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn create_erased_image() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("keychain.bin");

        let s = FileStorage::open(Some(&p), None).unwrap();
        assert!(s.image().iter().all(|b| *b == ERASED));

        let f = std::fs::read(&p).unwrap();
        assert_eq!(f.len(), STORAGE_LEN);
    }

    #[test]
    fn commit_persists_writes() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("keychain.bin");

        let mut s = FileStorage::open(Some(&p), None).unwrap();
        s.write_bytes(10, &[1, 2, 3]);

        // Writes are buffered until commit
        assert_eq!(std::fs::read(&p).unwrap()[10], ERASED);

        s.commit();

        let s = FileStorage::open(Some(&p), None).unwrap();
        let mut b = [0u8; 3];
        s.read_bytes(10, &mut b);
        assert_eq!(b, [1, 2, 3]);
    }

    #[test]
    fn artifact_reads() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("artifact.gz");
        std::fs::write(&p, [7u8; 100]).unwrap();

        let s = FileStorage::open(None, Some(&p)).unwrap();
        assert_eq!(s.artifact_len(), 100);

        let mut b = [0u8; 64];
        assert_eq!(s.read_artifact(0, &mut b), 64);
        assert_eq!(s.read_artifact(64, &mut b), 36);
        assert_eq!(s.read_artifact(100, &mut b), 0);
        assert_eq!(s.read_artifact(200, &mut b), 0);
    }

    #[test]
    fn missing_artifact_fails() {
        let d = tempfile::tempdir().unwrap();
        let p = d.path().join("missing.gz");

        assert!(FileStorage::open(None, Some(&p)).is_err());
    }
}
