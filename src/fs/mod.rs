//! The FUSE dispatcher.
//!
//! `RemoteFs` is the single type the kernel binding drives. It owns an
//! `Arc<Core>` (the FTP adapter, directory cache, read cache and handle
//! table from [`crate::context`]) plus its own inode table, the one piece
//! of state that belongs to the FUSE binding rather than the core: kernel
//! filesystem calls address files by inode, the core's operations address
//! them by path, and something has to hold the mapping between the two.
//!
//! Each callback below is a thin `match`-and-delegate into one of the
//! submodules (`attr`, `read`, `write`, `create`, `delete`, `rename`),
//! which hold the actual translation to FTP adapter / cache / handle-store
//! calls. `RemoteFs`'s own methods never touch the FTP connection or the
//! handle table directly; they only resolve inode <-> path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fuser::{Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow};

use crate::context::Core;

pub mod prelude;

mod attr;
mod create;
mod delete;
mod read;
mod rename;
mod write;

pub const ROOT_INO: u64 = 1;
/// TTL the kernel is told it may cache attribute/entry replies for. This is
/// independent of `Core`'s own directory-listing cache timeout: it bounds
/// how long the *kernel* will skip calling back into us at all, so it is
/// kept short regardless of the configured `cache_timeout`.
pub const ENTRY_TTL: Duration = Duration::from_secs(1);

/// Joins a directory path (root is `"/"`) with a bare child name.
pub(crate) fn join_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Splits an absolute path into (parent, name). Never called with `"/"`
/// itself, since the root has no parent to list.
pub(crate) fn split_path(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((p, name)) if p.is_empty() => ("/".to_string(), name.to_string()),
        Some((p, name)) => (p.to_string(), name.to_string()),
        None => ("/".to_string(), trimmed.to_string()),
    }
}

/// The process-wide inode table: a path-keyed allocator handing out stable
/// small integers for the kernel to hand back on subsequent calls.
///
/// Inodes are never reclaimed (no `forget`-driven eviction): the table
/// grows for the lifetime of the mount. Acceptable for the scope here —
/// a long-lived mount walking millions of distinct paths would eventually
/// exhaust memory, but that is a known, documented limitation rather than
/// an oversight (see DESIGN.md).
struct Inodes {
    next: u64,
    path_to_ino: HashMap<String, u64>,
    ino_to_path: HashMap<u64, String>,
}

impl Inodes {
    fn new() -> Self {
        let mut ino_to_path = HashMap::new();
        let mut path_to_ino = HashMap::new();
        ino_to_path.insert(ROOT_INO, "/".to_string());
        path_to_ino.insert("/".to_string(), ROOT_INO);
        Self { next: ROOT_INO + 1, path_to_ino, ino_to_path }
    }

    fn path_of(&self, ino: u64) -> Option<String> {
        self.ino_to_path.get(&ino).cloned()
    }

    /// Returns the existing inode for `path`, allocating a fresh one if
    /// this is the first time the path has been seen.
    fn ino_for(&mut self, path: &str) -> u64 {
        if let Some(ino) = self.path_to_ino.get(path) {
            return *ino;
        }
        let ino = self.next;
        self.next += 1;
        self.path_to_ino.insert(path.to_string(), ino);
        self.ino_to_path.insert(ino, path.to_string());
        ino
    }
}

pub struct RemoteFs {
    core: Arc<Core>,
    inodes: Mutex<Inodes>,
}

impl RemoteFs {
    pub fn new(core: Arc<Core>) -> Self {
        Self { core, inodes: Mutex::new(Inodes::new()) }
    }

    fn path_for(&self, ino: u64) -> Option<String> {
        self.inodes.lock().unwrap().path_of(ino)
    }

    fn ino_for_path(&self, path: &str) -> u64 {
        self.inodes.lock().unwrap().ino_for(path)
    }

    fn inodes_mut(&self) -> std::sync::MutexGuard<'_, Inodes> {
        self.inodes.lock().unwrap()
    }
}

impl Filesystem for RemoteFs {
    fn getattr(&mut self, req: &Request, ino: u64, reply: ReplyAttr) {
        attr::getattr(self, req, ino, reply);
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        ctime: Option<std::time::SystemTime>,
        fh: Option<u64>,
        crtime: Option<std::time::SystemTime>,
        chgtime: Option<std::time::SystemTime>,
        bkuptime: Option<std::time::SystemTime>,
        flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        attr::setattr(
            self, req, ino, mode, uid, gid, size, atime, mtime, ctime, fh, crtime, chgtime,
            bkuptime, flags, reply,
        );
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &std::ffi::OsStr, reply: ReplyEntry) {
        read::lookup(self, req, parent, name, reply);
    }

    fn statfs(&mut self, req: &Request<'_>, ino: u64, reply: fuser::ReplyStatfs) {
        attr::statfs(self, req, ino, reply);
    }

    fn readdir(&mut self, req: &Request, ino: u64, fh: u64, offset: i64, reply: ReplyDirectory) {
        read::readdir(self, req, ino, fh, offset, reply);
    }

    fn open(&mut self, req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        read::open(self, req, ino, flags, reply);
    }

    fn read(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        read::read(self, req, ino, fh, offset, size, flags, lock_owner, reply);
    }

    fn write(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        write_flags: u32,
        flags: i32,
        lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        write::write(self, req, ino, fh, offset, data, write_flags, flags, lock_owner, reply);
    }

    fn flush(&mut self, req: &Request<'_>, ino: u64, fh: u64, lock_owner: u64, reply: ReplyEmpty) {
        write::flush(self, req, ino, fh, lock_owner, reply);
    }

    fn fsync(&mut self, req: &Request<'_>, ino: u64, fh: u64, datasync: bool, reply: ReplyEmpty) {
        write::fsync(self, req, ino, fh, datasync, reply);
    }

    fn release(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        fh: u64,
        flags: i32,
        lock_owner: Option<u64>,
        flush: bool,
        reply: ReplyEmpty,
    ) {
        write::release(self, req, ino, fh, flags, lock_owner, flush, reply);
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        flags: i32,
        reply: ReplyCreate,
    ) {
        create::create(self, req, parent, name, mode, umask, flags, reply);
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        create::mkdir(self, req, parent, name, mode, umask, reply);
    }

    fn unlink(&mut self, req: &Request<'_>, parent: u64, name: &std::ffi::OsStr, reply: ReplyEmpty) {
        delete::unlink(self, req, parent, name, reply);
    }

    fn rmdir(&mut self, req: &Request<'_>, parent: u64, name: &std::ffi::OsStr, reply: ReplyEmpty) {
        delete::rmdir(self, req, parent, name, reply);
    }

    fn rename(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        newparent: u64,
        newname: &std::ffi::OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        rename::rename(self, req, parent, name, newparent, newname, flags, reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_core, FakeTransport};

    #[test]
    fn join_path_from_root_and_nested_parent() {
        assert_eq!(join_path("/", "a"), "/a");
        assert_eq!(join_path("/a", "b"), "/a/b");
    }

    #[test]
    fn split_path_nested_and_top_level() {
        assert_eq!(split_path("/a/b/c"), ("/a/b".to_string(), "c".to_string()));
        assert_eq!(split_path("/a"), ("/".to_string(), "a".to_string()));
    }

    #[test]
    fn inode_table_reuses_ino_for_same_path_and_starts_at_root() {
        let mut inodes = Inodes::new();
        assert_eq!(inodes.path_of(ROOT_INO), Some("/".to_string()));
        let a = inodes.ino_for("/a");
        let again = inodes.ino_for("/a");
        assert_eq!(a, again);
        assert_ne!(a, ROOT_INO);
    }

    #[test]
    fn remote_fs_resolves_root_and_allocates_child_inodes() {
        let core = Arc::new(test_core(FakeTransport::new().with_dir("/docs")));
        let fs = RemoteFs::new(core);
        assert_eq!(fs.path_for(ROOT_INO), Some("/".to_string()));
        let ino = fs.ino_for_path("/docs");
        assert_eq!(fs.path_for(ino), Some("/docs".to_string()));
    }
}
