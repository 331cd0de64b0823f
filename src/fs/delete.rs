//! `unlink` and `rmdir`. Each is one FTP command plus a parent-directory
//! cache invalidation; unlike the teacher's HTTP `DELETE`, FTP's `DELE` and
//! `RMD` are distinct commands so the two callbacks do not collapse into
//! one shared deletion path.

use super::prelude::*;
use super::{join_path, RemoteFs};

pub fn unlink(fs: &mut RemoteFs, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    match fs.core.delete(&full_path) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}

pub fn rmdir(fs: &mut RemoteFs, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
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
    match fs.core.rmdir(&full_path) {
        Ok(()) => reply.ok(),
        Err(e) => reply.error(e.to_errno()),
    }
}
