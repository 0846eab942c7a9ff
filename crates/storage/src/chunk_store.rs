//! Thread-safe, per-path-locked filesystem operations for persistent
//! Swamps: length-prefixed binary framing of segments, whole-chunk
//! compression, and recursive empty-folder reclamation.
//!
//! # Chunk file format
//! On disk, a chunk file is `compress(payload)` where `payload` is the
//! concatenation of framed segments:
//!
//! ```text
//! offset  size  field
//! 0       4     segment_length : uint32 little-endian
//! 4       N     segment_bytes  : opaque
//! ```
//!
//! Segments are opaque to this module; the Swamp runtime defines them as
//! serialized Treasures.

use crate::compressor::{self, Algorithm};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use hydraide_concurrency::PathLockTable;
use hydraide_core::error::{HydraideError, HydraideResult};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Thread-safe file/folder operations used by persistent Swamps.
///
/// One `ChunkStore` is shared process-wide; its internal [`PathLockTable`]
/// guarantees conflicting operations on the same path serialize while
/// unrelated Swamps never contend.
#[derive(Debug, Default)]
pub struct ChunkStore {
    locks: PathLockTable,
}

impl ChunkStore {
    /// A store with an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `path` and any missing ancestors. Idempotent.
    pub fn create_folder(&self, path: &Path) -> HydraideResult<()> {
        if path.as_os_str().is_empty() {
            return Err(HydraideError::invalid_argument("folder path must not be empty"));
        }
        let lock = self.locks.get_or_create(path);
        let _guard = lock.lock();
        fs::create_dir_all(path)?;
        Ok(())
    }

    /// True if `path` exists and is a directory.
    pub fn is_folder_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    /// Remove `path` if it contains no entries, then iteratively attempt
    /// the same on up to `max_depth` parents. Stops at the first
    /// non-empty ancestor. A missing `path` is a no-op.
    pub fn delete_folder_if_empty(&self, path: &Path, max_depth: u32) -> HydraideResult<()> {
        let mut current = path.to_path_buf();
        for _ in 0..=max_depth {
            let lock = self.locks.get_or_create(&current);
            let guard = lock.lock();
            let is_empty = match fs::read_dir(&current) {
                Ok(mut entries) => entries.next().is_none(),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
                Err(e) => return Err(e.into()),
            };
            if !is_empty {
                drop(guard);
                break;
            }
            fs::remove_dir(&current)?;
            drop(guard);
            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        Ok(())
    }

    /// Write `segments` to `path`, compressed with `algorithm`.
    ///
    /// In append mode the existing file (if any) is decompressed, the new
    /// segments are framed and appended, and the result is recompressed
    /// and rewritten. Non-append mode is a whole-file replacement.
    pub fn save_file(
        &self,
        path: &Path,
        segments: &[Vec<u8>],
        append: bool,
        algorithm: Algorithm,
    ) -> HydraideResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let lock = self.locks.get_or_create(path);
        let _guard = lock.lock();

        let mut payload = if append && path.exists() {
            let existing = fs::read(path)?;
            compressor::decompress(algorithm, &existing)?
        } else {
            Vec::new()
        };
        for segment in segments {
            write_frame(&mut payload, segment)?;
        }
        let compressed = compressor::compress(algorithm, &payload)?;
        fs::write(path, compressed)?;
        Ok(())
    }

    /// Read, decompress, and parse `path` into its framed segments.
    pub fn get_file(&self, path: &Path, algorithm: Algorithm) -> HydraideResult<Vec<Vec<u8>>> {
        let lock = self.locks.get_or_create(path);
        let _guard = lock.lock();
        let raw = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HydraideError::not_found(format!("chunk file not found: {}", path.display()))
            } else {
                HydraideError::from(e)
            }
        })?;
        let payload = compressor::decompress(algorithm, &raw)?;
        parse_frames(&payload)
    }

    /// Best-effort bulk read of every file directly under `folder`,
    /// skipping names in `excluded` and skipping (not failing on) any file
    /// that errors while reading.
    pub fn get_all_file_contents(
        &self,
        folder: &Path,
        excluded: &[PathBuf],
        algorithm: Algorithm,
    ) -> Vec<(PathBuf, Vec<Vec<u8>>)> {
        let mut out = Vec::new();
        let entries = match fs::read_dir(folder) {
            Ok(e) => e,
            Err(_) => return out,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || excluded.contains(&path) {
                continue;
            }
            if let Ok(segments) = self.get_file(&path, algorithm) {
                out.push((path, segments));
            }
        }
        out
    }

    /// On-disk (compressed) size of `path` in bytes.
    pub fn get_file_size(&self, path: &Path) -> HydraideResult<u64> {
        Ok(fs::metadata(path)?.len())
    }

    /// Delete `path`. Missing file is success (idempotent).
    pub fn delete_file(&self, path: &Path) -> HydraideResult<()> {
        let lock = self.locks.get_or_create(path);
        let _guard = lock.lock();
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete every file directly under `folder`. Missing folder is
    /// success.
    pub fn delete_all_files(&self, folder: &Path) -> HydraideResult<()> {
        let entries = match fs::read_dir(folder) {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                self.delete_file(&path)?;
            }
        }
        Ok(())
    }
}

fn write_frame(out: &mut Vec<u8>, segment: &[u8]) -> HydraideResult<()> {
    out.write_u32::<LittleEndian>(segment.len() as u32)
        .map_err(|e| HydraideError::internal(format!("frame length write failed: {e}")))?;
    out.extend_from_slice(segment);
    Ok(())
}

fn parse_frames(payload: &[u8]) -> HydraideResult<Vec<Vec<u8>>> {
    let mut cursor = Cursor::new(payload);
    let mut segments = Vec::new();
    while (cursor.position() as usize) < payload.len() {
        let len = cursor.read_u32::<LittleEndian>().map_err(|_| {
            HydraideError::internal("chunk file frame truncated: length prefix incomplete")
        })? as usize;
        let start = cursor.position() as usize;
        let end = start + len;
        if end > payload.len() {
            return Err(HydraideError::internal(
                "chunk file frame truncated: segment body incomplete",
            ));
        }
        segments.push(payload[start..end].to_vec());
        cursor.set_position(end as u64);
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_then_get_roundtrips_segments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/chunk-0");
        let store = ChunkStore::new();
        let segments = vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()];
        store.save_file(&path, &segments, false, Algorithm::Snappy).unwrap();
        let read_back = store.get_file(&path, Algorithm::Snappy).unwrap();
        assert_eq!(read_back, segments);
    }

    #[test]
    fn append_mode_concatenates_segments() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chunk-0");
        let store = ChunkStore::new();
        let a = vec![b"a1".to_vec(), b"a2".to_vec()];
        let b = vec![b"b1".to_vec()];
        store.save_file(&path, &a, false, Algorithm::Snappy).unwrap();
        store.save_file(&path, &b, true, Algorithm::Snappy).unwrap();
        let read_back = store.get_file(&path, Algorithm::Snappy).unwrap();
        assert_eq!(read_back, vec![b"a1".to_vec(), b"a2".to_vec(), b"b1".to_vec()]);
    }

    #[test]
    fn get_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::new();
        let err = store.get_file(&dir.path().join("nope"), Algorithm::Snappy).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn delete_missing_file_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::new();
        assert!(store.delete_file(&dir.path().join("nope")).is_ok());
    }

    #[test]
    fn delete_folder_if_empty_removes_empty_ancestors_only() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::new();
        let leaf = dir.path().join("a/b/c");
        store.create_folder(&leaf).unwrap();
        // sibling under "a" keeps "a" from being pruned
        store.create_folder(&dir.path().join("a/sibling")).unwrap();

        store.delete_folder_if_empty(&leaf, 3).unwrap();

        assert!(!leaf.exists());
        assert!(!dir.path().join("a/b").exists());
        assert!(dir.path().join("a").exists());
        assert!(dir.path().join("a/sibling").exists());
    }

    #[test]
    fn delete_folder_if_empty_on_missing_path_is_a_no_op() {
        let dir = tempdir().unwrap();
        let store = ChunkStore::new();
        assert!(store.delete_folder_if_empty(&dir.path().join("nope"), 3).is_ok());
    }

    #[test]
    fn create_folder_rejects_empty_path() {
        let store = ChunkStore::new();
        assert!(store.create_folder(Path::new("")).is_err());
    }

    #[test]
    fn corrupt_file_surfaces_a_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt");
        // Valid snappy-compressed payload whose inner framing is truncated.
        let truncated_payload = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x00];
        let compressed = compressor::compress(Algorithm::Snappy, &truncated_payload).unwrap();
        fs::write(&path, compressed).unwrap();
        let store = ChunkStore::new();
        assert!(store.get_file(&path, Algorithm::Snappy).is_err());
    }
}
