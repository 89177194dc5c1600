use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use backref_types::{NodeId, RecordSnapshot, ReferenceRecord};

use crate::error::{StoreError, StoreResult};
use crate::traits::ReferenceStore;

/// File extension of record files.
const RECORD_EXTENSION: &str = "refs";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Configuration for a [`FileReferenceStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStoreConfig {
    /// Directory holding the record files.
    pub root: PathBuf,
    /// `fsync` each record file before it replaces the previous version, and
    /// the shard directory after every replace or delete.
    pub fsync: bool,
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(".backref"),
            fsync: true,
        }
    }
}

/// Filesystem-backed reference store.
///
/// Each target gets one file at `<root>/<first 2 hex chars>/<32 hex chars>.refs`:
///
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized RecordSnapshot)]
/// ```
///
/// Writes land in a temporary file in the same directory and are renamed over
/// the previous version, so readers see either the old or the new record.
#[derive(Debug)]
pub struct FileReferenceStore {
    config: FileStoreConfig,
}

impl FileReferenceStore {
    /// Open (or create) a store rooted at `config.root`.
    pub fn open(config: FileStoreConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.root)?;
        debug!(root = %config.root.display(), fsync = config.fsync, "file store opened");
        Ok(Self { config })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Path of the record file for `target`.
    pub fn path_for(&self, target: &NodeId) -> PathBuf {
        let hex = target.to_hex();
        self.config
            .root
            .join(&hex[..2])
            .join(format!("{hex}.{RECORD_EXTENSION}"))
    }

    /// Every target with a record file, sorted.
    ///
    /// Files whose names are not node ids are skipped with a warning.
    pub fn targets(&self) -> StoreResult<Vec<NodeId>> {
        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.config.root).min_depth(2).max_depth(2) {
            let entry = entry.map_err(io::Error::from)?;
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION)
            {
                continue;
            }
            let parsed = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::parse::<NodeId>);
            match parsed {
                Some(Ok(id)) => ids.push(id),
                _ => warn!(path = %path.display(), "skipping unrecognized record file"),
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn encode(snapshot: &RecordSnapshot) -> StoreResult<Vec<u8>> {
        let payload =
            bincode::serialize(snapshot).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            StoreError::Serialization(format!("record too large: {} bytes", payload.len()))
        })?;
        let crc = crc32fast::hash(&payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    fn decode(target: &NodeId, path: &Path, bytes: &[u8]) -> StoreResult<RecordSnapshot> {
        let corrupt = |reason: String| StoreError::Corrupt {
            target: *target,
            path: path.to_path_buf(),
            reason,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(corrupt(format!("truncated header ({} bytes)", bytes.len())));
        }
        let (header, payload) = bytes.split_at(HEADER_SIZE);
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let stored_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if payload.len() != length {
            return Err(corrupt(format!(
                "length mismatch: header says {length}, found {}",
                payload.len()
            )));
        }
        let computed_crc = crc32fast::hash(payload);
        if computed_crc != stored_crc {
            return Err(corrupt(format!(
                "CRC mismatch: stored {stored_crc:#010x}, computed {computed_crc:#010x}"
            )));
        }

        let snapshot: RecordSnapshot =
            bincode::deserialize(payload).map_err(|e| corrupt(e.to_string()))?;
        if snapshot.target != *target {
            return Err(corrupt(format!("file holds record for {}", snapshot.target)));
        }
        Ok(snapshot)
    }
}

impl ReferenceStore for FileReferenceStore {
    fn load(&self, target: &NodeId) -> StoreResult<Option<ReferenceRecord>> {
        let path = self.path_for(target);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot = Self::decode(target, &path, &bytes)?;
        debug!(node = %target, referrers = snapshot.referrers.len(), "record loaded");
        Ok(Some(ReferenceRecord::from_snapshot(snapshot)))
    }

    fn store(&self, record: &ReferenceRecord) -> StoreResult<()> {
        let snapshot = record.snapshot();
        let bytes = Self::encode(&snapshot)?;
        let path = self.path_for(&snapshot.target);
        let dir = path
            .parent()
            .ok_or_else(|| StoreError::Unavailable(format!("no parent for {}", path.display())))?;
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        if self.config.fsync {
            tmp.as_file().sync_all()?;
        }
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        if self.config.fsync {
            sync_dir(dir)?;
        }

        debug!(node = %snapshot.target, len = bytes.len(), "record stored");
        Ok(())
    }

    fn destroy(&self, record: &ReferenceRecord) -> StoreResult<()> {
        let target = record.target();
        let path = self.path_for(&target);
        match fs::remove_file(&path) {
            Ok(()) => {
                if self.config.fsync {
                    if let Some(dir) = path.parent() {
                        sync_dir(dir)?;
                    }
                }
                debug!(node = %target, "record destroyed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, target: &NodeId) -> StoreResult<bool> {
        Ok(self.path_for(target).try_exists()?)
    }
}

/// Flush a directory so renames and unlinks inside it survive a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use backref_types::PropertyId;

    fn open(dir: &Path) -> FileReferenceStore {
        FileReferenceStore::open(FileStoreConfig {
            root: dir.to_path_buf(),
            fsync: false,
        })
        .unwrap()
    }

    fn record_with(target: NodeId, names: &[&str]) -> ReferenceRecord {
        let owner = NodeId::new();
        let referrers = names
            .iter()
            .map(|n| PropertyId::new(owner, *n).unwrap())
            .collect();
        ReferenceRecord::with_referrers(target, referrers)
    }

    #[test]
    fn store_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        let record = record_with(target, &["a", "b", "a"]);

        store.store(&record).unwrap();
        assert!(store.exists(&target).unwrap());

        let loaded = store.load(&target).unwrap().expect("should exist");
        assert_eq!(loaded.target(), target);
        assert_eq!(loaded.referrers(), record.referrers());
    }

    #[test]
    fn load_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        assert!(store.load(&target).unwrap().is_none());
        assert!(!store.exists(&target).unwrap());
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let target = NodeId::new();
        open(dir.path()).store(&record_with(target, &["x"])).unwrap();

        let reopened = open(dir.path());
        assert_eq!(reopened.load(&target).unwrap().unwrap().len(), 1);
    }

    #[test]
    fn store_overwrites_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        store.store(&record_with(target, &["a", "b"])).unwrap();
        store.store(&record_with(target, &["c"])).unwrap();

        let loaded = store.load(&target).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.referrers()[0].name(), "c");
    }

    #[test]
    fn destroy_removes_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        let record = record_with(target, &["a"]);
        store.store(&record).unwrap();

        store.destroy(&record).unwrap();
        assert!(!store.exists(&target).unwrap());
        store.destroy(&record).unwrap();
    }

    #[test]
    fn layout_is_sharded_by_hex_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        let hex = target.to_hex();
        let path = store.path_for(&target);
        assert_eq!(path, dir.path().join(&hex[..2]).join(format!("{hex}.refs")));
    }

    #[test]
    fn crc_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        store.store(&record_with(target, &["a"])).unwrap();

        let path = store.path_for(&target);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        fs::write(&path, bytes).unwrap();

        let err = store.load(&target).unwrap_err();
        assert!(
            matches!(&err, StoreError::Corrupt { reason, .. } if reason.contains("CRC")),
            "expected CRC corruption, got: {err}"
        );
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();
        store.store(&record_with(target, &["a"])).unwrap();

        let path = store.path_for(&target);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        assert!(matches!(
            store.load(&target),
            Err(StoreError::Corrupt { .. })
        ));

        fs::write(&path, &bytes[..4]).unwrap();
        assert!(matches!(
            store.load(&target),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn file_for_another_target_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let real = NodeId::new();
        let other = NodeId::new();
        store.store(&record_with(real, &["a"])).unwrap();

        let dest = store.path_for(&other);
        fs::create_dir_all(dest.parent().unwrap()).unwrap();
        fs::copy(store.path_for(&real), &dest).unwrap();

        let err = store.load(&other).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { target, .. } if target == other));
    }

    #[test]
    fn invalid_referrer_name_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let target = NodeId::new();

        // Same layout as a snapshot, but with a name `PropertyId::new` rejects.
        let payload = bincode::serialize(&(target, vec![(NodeId::new(), "has space")])).unwrap();
        let mut bytes = (payload.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        bytes.extend_from_slice(&payload);

        let path = store.path_for(&target);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();

        let err = store.load(&target).unwrap_err();
        assert!(
            matches!(&err, StoreError::Corrupt { reason, .. } if reason.contains("has space")),
            "expected invalid name to be reported, got: {err}"
        );
    }

    #[test]
    fn fsync_mode_stores_and_destroys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileReferenceStore::open(FileStoreConfig {
            root: dir.path().to_path_buf(),
            fsync: true,
        })
        .unwrap();
        let target = NodeId::new();
        let record = record_with(target, &["a"]);

        store.store(&record).unwrap();
        assert_eq!(store.load(&target).unwrap().unwrap().len(), 1);
        store.destroy(&record).unwrap();
        assert!(!store.exists(&target).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn sync_dir_requires_an_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        sync_dir(dir.path()).unwrap();
        assert!(sync_dir(&dir.path().join("missing")).is_err());
    }

    #[test]
    fn targets_lists_stored_records_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open(dir.path());
        let a = NodeId::new();
        let b = NodeId::new();
        store.store(&record_with(a, &["x"])).unwrap();
        store.store(&record_with(b, &["y"])).unwrap();

        let stray = dir.path().join("zz");
        fs::create_dir_all(&stray).unwrap();
        fs::write(stray.join("garbage.refs"), b"nope").unwrap();
        fs::write(stray.join("notes.txt"), b"ignored").unwrap();

        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(store.targets().unwrap(), expected);
    }
}
