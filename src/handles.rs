//! Open-file handle store: per-handle spill files backing random-access
//! POSIX I/O over FTP's whole-file GET/PUT model.
//!
//! Handle slots are never read without taking the handles lock: every
//! accessor takes the lock, clones the `Arc<Handle>` it finds, and drops
//! the lock immediately. This closes the reference's "fast path reads the
//! raw slot without the lock" race (§9 of the expanded spec) without
//! requiring a generation counter, since a cloned `Arc` keeps the handle
//! alive even if the slot is concurrently freed and reused.

use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{FsError, FsResult};

pub const MAX_HANDLES: usize = 1024;

struct HandleState {
    dirty: bool,
    is_new: bool,
}

pub struct Handle {
    pub remote_path: String,
    pub spill_path: PathBuf,
    pub flags: i32,
    state: Mutex<HandleState>,
}

impl Handle {
    pub fn is_dirty(&self) -> bool {
        self.state.lock().unwrap().dirty
    }

    pub fn is_new(&self) -> bool {
        self.state.lock().unwrap().is_new
    }

    pub fn mark_dirty(&self) {
        self.state.lock().unwrap().dirty = true;
    }

    /// Opens the spill by path, seeks, reads one span, closes. No
    /// persistent descriptor is kept between calls (matches the reference;
    /// random-access I/O is infrequent enough that per-call open/seek/close
    /// is not a bottleneck relative to the network round-trips it replaces).
    pub fn read_at(&self, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let mut file = OpenOptions::new().read(true).open(&self.spill_path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; size as usize];
        let n = file.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Writes one span at `offset`, taking the per-handle lock for the
    /// duration so a concurrent release cannot upload a half-written spill.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> FsResult<u32> {
        let _guard = self.state.lock().unwrap();
        let mut file = OpenOptions::new().write(true).open(&self.spill_path)?;
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        drop(_guard);
        self.mark_dirty();
        Ok(data.len() as u32)
    }

}

pub struct HandleTable {
    slots: Mutex<Vec<Option<Arc<Handle>>>>,
    temp_dir: PathBuf,
    discriminator: AtomicU64,
}

impl HandleTable {
    pub fn new(temp_dir: PathBuf) -> Self {
        let mut slots = Vec::with_capacity(MAX_HANDLES);
        slots.resize_with(MAX_HANDLES, || None);
        Self { slots: Mutex::new(slots), temp_dir, discriminator: AtomicU64::new(0) }
    }

    fn fresh_spill_path(&self) -> PathBuf {
        let pid = std::process::id();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros();
        let n = self.discriminator.fetch_add(1, Ordering::Relaxed);
        self.temp_dir.join(format!("fh_{pid}_{now}_{n}"))
    }

    /// Allocates a slot, creates an empty 0600 spill file, and returns its
    /// index together with the handle so the caller can prime it (download
    /// or leave empty for `is_new`) before the first I/O call.
    pub fn allocate(&self, remote_path: String, flags: i32, is_new: bool) -> FsResult<(usize, Arc<Handle>)> {
        let spill_path = self.fresh_spill_path();
        create_empty_spill(&spill_path)?;

        let handle = Arc::new(Handle {
            remote_path,
            spill_path,
            flags,
            state: Mutex::new(HandleState { dirty: false, is_new }),
        });

        let mut slots = self.slots.lock().unwrap();
        let idx = slots.iter().position(|s| s.is_none()).ok_or(FsError::Capacity)?;
        slots[idx] = Some(handle.clone());
        Ok((idx, handle))
    }

    /// Snapshots the handle at `idx` under the lock, then releases the lock
    /// immediately. Returns `None` for an unregistered or already-released
    /// slot (the caller treats that as the ad-hoc read path or `EBADF`).
    pub fn get(&self, idx: usize) -> Option<Arc<Handle>> {
        let slots = self.slots.lock().unwrap();
        slots.get(idx).and_then(|s| s.clone())
    }

    /// Frees the slot and returns the handle that occupied it, so the
    /// caller can perform the upload-on-release outside the handles lock
    /// (the FTP lock must never be taken while the handles lock is held).
    pub fn release(&self, idx: usize) -> Option<Arc<Handle>> {
        let mut slots = self.slots.lock().unwrap();
        slots.get_mut(idx).and_then(|s| s.take())
    }
}

fn create_empty_spill(path: &Path) -> FsResult<()> {
    let file = OpenOptions::new().write(true).create_new(true).open(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn allocate_then_release_frees_slot() {
        let dir = tempdir().unwrap();
        let table = HandleTable::new(dir.path().to_path_buf());
        let (idx, _h) = table.allocate("/a".into(), 0, false).unwrap();
        assert!(table.get(idx).is_some());
        table.release(idx);
        assert!(table.get(idx).is_none());
    }

    #[test]
    fn exhaustion_returns_capacity_error() {
        let dir = tempdir().unwrap();
        let table = HandleTable::new(dir.path().to_path_buf());
        for _ in 0..MAX_HANDLES {
            table.allocate("/a".into(), 0, false).unwrap();
        }
        match table.allocate("/a".into(), 0, false) {
            Err(FsError::Capacity) => {}
            other => panic!("expected Capacity, got {other:?}"),
        }
    }

    #[test]
    fn release_then_reallocate_succeeds() {
        let dir = tempdir().unwrap();
        let table = HandleTable::new(dir.path().to_path_buf());
        let mut idxs = Vec::new();
        for _ in 0..MAX_HANDLES {
            idxs.push(table.allocate("/a".into(), 0, false).unwrap().0);
        }
        table.release(idxs[0]);
        assert!(table.allocate("/a".into(), 0, false).is_ok());
    }

    #[test]
    fn write_then_read_roundtrips() {
        let dir = tempdir().unwrap();
        let table = HandleTable::new(dir.path().to_path_buf());
        let (_idx, h) = table.allocate("/a".into(), 0, false).unwrap();
        h.write_at(0, b"hello").unwrap();
        assert!(h.is_dirty());
        let data = h.read_at(0, 5).unwrap();
        assert_eq!(data, b"hello");
    }
}
