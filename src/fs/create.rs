//! `create` and `mkdir`.
//!
//! `create` is "open with the same flags" per the operation contract: it
//! goes through the same handle-store path as `open`, just always with
//! `O_CREAT` set and a fresh inode, rather than a separate upload call.

use super::attr::entry_to_attr;
use super::prelude::*;
use super::read::open_for_write;
use super::{join_path, RemoteFs};
use crate::parser::{Entry, EntryKind};

#[allow(clippy::too_many_arguments)]
pub fn create(
    fs: &mut RemoteFs,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    mode: u32,
    _umask: u32,
    flags: i32,
    reply: ReplyCreate,
) {
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
    let full_path = join_path(&parent_path, name_str);

    match open_for_write(&fs.core, full_path.clone(), flags | libc::O_CREAT) {
        Ok(fh) => {
            let ino = fs.ino_for_path(&full_path);
            let entry = Entry {
                name: name_str.to_string(),
                kind: EntryKind::File,
                size: 0,
                mtime: 0,
                mode: mode & 0o777,
            };
            let attr = entry_to_attr(&entry, ino, req.uid(), req.gid());
            reply.created(&ENTRY_TTL, &attr, 0, fh, 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn mkdir(
    fs: &mut RemoteFs,
    req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    mode: u32,
    _umask: u32,
    reply: ReplyEntry,
) {
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
    let full_path = join_path(&parent_path, name_str);

    match fs.core.mkdir(&full_path) {
        Ok(()) => {
            let ino = fs.ino_for_path(&full_path);
            let entry = Entry {
                name: name_str.to_string(),
                kind: EntryKind::Directory,
                size: 0,
                mtime: 0,
                mode: mode & 0o777,
            };
            reply.entry(&ENTRY_TTL, &entry_to_attr(&entry, ino, req.uid(), req.gid()), 0);
        }
        Err(e) => reply.error(e.to_errno()),
    }
}
