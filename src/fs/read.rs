//! `lookup`, `readdir`, `open`, `read`.
//!
//! `open` resolves the handle-priming open question the expanded spec
//! calls out: rather than keying priming off `O_CREAT` alone, it stats the
//! parent first. If the name already exists remotely, the handle is always
//! downloaded before use; if it does not, or the caller passed `O_TRUNC`,
//! priming is skipped and the handle is marked so `release` uploads
//! unconditionally.

use bytes::Bytes;

use super::attr::entry_to_attr;
use super::prelude::*;
use super::{join_path, split_path, RemoteFs};
use crate::error::{FsError, FsResult};

pub fn lookup(fs: &mut RemoteFs, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
    let parent_path = match fs.path_for(parent) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let name_str = match name.to_str() {
        Some(s) => s,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    match fs.core.stat(&parent_path, name_str) {
        Ok(Some(entry)) => {
            let full_path = join_path(&parent_path, name_str);
            let ino = fs.ino_for_path(&full_path);
            reply.entry(&ENTRY_TTL, &entry_to_attr(&entry, ino, req.uid(), req.gid()), 0);
        }
        Ok(None) => reply.error(ENOENT),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn readdir(fs: &mut RemoteFs, req: &Request, ino: u64, _fh: u64, offset: i64, mut reply: ReplyDirectory) {
    let path = match fs.path_for(ino) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    let mut rows: Vec<(u64, FileType, String)> = Vec::new();
    let parent_ino = if path == "/" {
        ROOT_INO
    } else {
        let (parent_path, _) = split_path(&path);
        fs.ino_for_path(&parent_path)
    };
    rows.push((ino, FileType::Directory, ".".to_string()));
    rows.push((parent_ino, FileType::Directory, "..".to_string()));

    match fs.core.list_dir(&path) {
        Ok(entries) => {
            for entry in entries {
                let full_path = join_path(&path, &entry.name);
                let child_ino = fs.ino_for_path(&full_path);
                let child_attr = entry_to_attr(&entry, child_ino, req.uid(), req.gid());
                rows.push((child_ino, child_attr.kind, entry.name));
            }
        }
        Err(e) => {
            reply.error(e.to_errno());
            return;
        }
    }

    for (i, (row_ino, kind, name)) in rows.into_iter().enumerate().skip(offset as usize) {
        if reply.add(row_ino, (i + 1) as i64, kind, &name) {
            break;
        }
    }
    reply.ok();
}

pub fn open(fs: &mut RemoteFs, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
    let write_access = (flags & libc::O_WRONLY != 0) || (flags & libc::O_RDWR != 0);
    if !write_access {
        reply.opened(0, 0);
        return;
    }

    let path = match fs.path_for(ino) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    match open_for_write(&fs.core, path, flags) {
        Ok(fh) => reply.opened(fh, 0),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// Allocates and, unless skipped, primes a write handle. Returns the `fh`
/// value handed to the kernel, which is the handle-table slot plus one (0
/// is reserved to mean "no handle", the read-only open short-circuit).
pub(super) fn open_for_write(core: &Core, path: String, flags: i32) -> FsResult<u64> {
    let (parent, name) = split_path(&path);
    let exists = matches!(core.stat(&parent, &name), Ok(Some(_)));
    let truncating = flags & libc::O_TRUNC != 0;
    let skip_download = !exists || truncating;

    let (idx, handle) = core.handles.allocate(path.clone(), flags, skip_download)?;
    if !skip_download {
        if let Err(e) = core.download(&path, &handle.spill_path) {
            core.handles.release(idx);
            let _ = std::fs::remove_file(&handle.spill_path);
            return Err(e);
        }
    }
    Ok(idx as u64 + 1)
}

#[allow(clippy::too_many_arguments)]
pub fn read(
    fs: &mut RemoteFs,
    _req: &Request<'_>,
    ino: u64,
    fh: u64,
    offset: i64,
    size: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyData,
) {
    if fh != 0 {
        if let Some(handle) = fs.core.handles.get((fh - 1) as usize) {
            match handle.read_at(offset.max(0) as u64, size) {
                Ok(data) => reply.data(&data),
                Err(e) => reply.error(e.to_errno()),
            }
            return;
        }
    }

    // Ephemeral read path: either `fh == 0` (read-only open short-circuit)
    // or a stale slot the kernel referenced without a live handle.
    let path = match fs.path_for(ino) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    match ad_hoc_read(&fs.core, &path, offset.max(0) as u64, size) {
        Ok(data) => reply.data(&data),
        Err(e) => reply.error(e.to_errno()),
    }
}

fn ad_hoc_read(core: &Core, path: &str, offset: u64, size: u32) -> FsResult<Vec<u8>> {
    let (parent, name) = split_path(path);
    let entry = core.stat(&parent, &name)?.ok_or(FsError::NotFound)?;

    let bytes = match core.read_cache_get(path, entry.mtime) {
        Some(b) => b,
        None => {
            let local = scratch_download_path(core);
            core.download(path, &local)?;
            let data = std::fs::read(&local)?;
            let _ = std::fs::remove_file(&local);
            let bytes = Bytes::from(data);
            core.read_cache_put(path, entry.mtime, bytes.clone());
            bytes
        }
    };

    let start = offset as usize;
    if start >= bytes.len() {
        return Ok(Vec::new());
    }
    let end = (start + size as usize).min(bytes.len());
    Ok(bytes[start..end].to_vec())
}


fn scratch_download_path(core: &Core) -> std::path::PathBuf {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let pid = std::process::id();
    let now = std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    core.temp_dir().join(format!("adhoc_{pid}_{now}_{n}"))
}
