//! `getattr` / `setattr`, including the truncate path.
//!
//! `chmod`, `chown`, and `utimens` arrive here as fields of `setattr` and
//! are accepted no-ops: FTP has no faithful mapping for any of them. Only
//! a `size` change does real work, since that is how the kernel asks for
//! `truncate`/`ftruncate`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use super::prelude::*;
use super::split_path;
use crate::error::FsResult;
use crate::parser::Entry;

pub fn entry_to_attr(entry: &Entry, ino: u64, uid: u32, gid: u32) -> FileAttr {
    let kind = match entry.kind {
        EntryKind::Directory => FileType::Directory,
        EntryKind::Symlink => FileType::Symlink,
        EntryKind::File | EntryKind::Unknown => FileType::RegularFile,
    };
    let mtime = UNIX_EPOCH + Duration::from_secs(entry.mtime.max(0) as u64);
    FileAttr {
        ino,
        size: entry.size,
        blocks: (entry.size + 511) / 512,
        atime: mtime,
        mtime,
        ctime: mtime,
        crtime: mtime,
        kind,
        perm: (entry.mode & 0o777) as u16,
        nlink: if kind == FileType::Directory { 2 } else { 1 },
        uid,
        gid,
        rdev: 0,
        flags: 0,
        blksize: 512,
    }
}

pub fn root_attr(uid: u32, gid: u32) -> FileAttr {
    FileAttr {
        ino: ROOT_INO,
        size: 0,
        blocks: 0,
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: FileType::Directory,
        perm: 0o755,
        nlink: 2,
        uid,
        gid,
        rdev: 0,
        flags: 0,
        blksize: 512,
    }
}

pub fn getattr(fs: &mut RemoteFs, req: &Request, ino: u64, reply: ReplyAttr) {
    if ino == ROOT_INO {
        reply.attr(&ENTRY_TTL, &root_attr(req.uid(), req.gid()));
        return;
    }
    let path = match fs.path_for(ino) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let (parent, name) = split_path(&path);
    match fs.core.stat(&parent, &name) {
        Ok(Some(entry)) => reply.attr(&ENTRY_TTL, &entry_to_attr(&entry, ino, req.uid(), req.gid())),
        Ok(None) => reply.error(ENOENT),
        Err(e) => reply.error(e.to_errno()),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn setattr(
    fs: &mut RemoteFs,
    req: &Request<'_>,
    ino: u64,
    _mode: Option<u32>,
    _uid: Option<u32>,
    _gid: Option<u32>,
    size: Option<u64>,
    _atime: Option<TimeOrNow>,
    _mtime: Option<TimeOrNow>,
    _ctime: Option<std::time::SystemTime>,
    _fh: Option<u64>,
    _crtime: Option<std::time::SystemTime>,
    _chgtime: Option<std::time::SystemTime>,
    _bkuptime: Option<std::time::SystemTime>,
    _flags: Option<u32>,
    reply: ReplyAttr,
) {
    let path = match fs.path_for(ino) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };

    if let Some(new_size) = size {
        if let Err(e) = truncate_remote(&fs.core, &path, new_size) {
            reply.error(e.to_errno());
            return;
        }
    }

    if path == "/" {
        reply.attr(&ENTRY_TTL, &root_attr(req.uid(), req.gid()));
        return;
    }
    let (parent, name) = split_path(&path);
    match fs.core.stat(&parent, &name) {
        Ok(Some(entry)) => reply.attr(&ENTRY_TTL, &entry_to_attr(&entry, ino, req.uid(), req.gid())),
        Ok(None) => reply.error(ENOENT),
        Err(e) => reply.error(e.to_errno()),
    }
}

/// Synthetic, generous capacity figures: FTP has no free-space query, but
/// `statfs(2)` callers (`df`, coreutils, editors checking free space before
/// a save) expect the callback to answer rather than fail.
pub fn statfs(_fs: &mut RemoteFs, _req: &Request, _ino: u64, reply: fuser::ReplyStatfs) {
    const BLOCK_SIZE: u32 = 512;
    const TOTAL_BLOCKS: u64 = 1 << 40; // ~512 TiB of make-believe free space
    reply.statfs(
        TOTAL_BLOCKS,
        TOTAL_BLOCKS,
        TOTAL_BLOCKS,
        0,
        0,
        BLOCK_SIZE,
        255,
        BLOCK_SIZE,
    );
}

fn scratch_spill_path(core: &Core) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let pid = std::process::id();
    let now = std::time::SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    core.temp_dir().join(format!("trunc_{pid}_{now}_{n}"))
}

/// Download -> truncate -> upload -> delete. If the download fails (the
/// remote path does not yet exist), the spill starts empty instead, so
/// `ftruncate` on a nonexistent file creates `size` bytes of undefined
/// (zero) content on upload rather than failing outright.
fn truncate_remote(core: &Core, remote: &str, size: u64) -> FsResult<()> {
    let local = scratch_spill_path(core);
    let downloaded = core.download(remote, &local).is_ok();
    if !downloaded {
        std::fs::File::create(&local)?;
    }
    {
        let file = std::fs::OpenOptions::new().write(true).open(&local)?;
        file.set_len(size)?;
    }
    let result = core.upload(&local, remote);
    let _ = std::fs::remove_file(&local);
    result
}
