//! `rename`: a single `RNFR`+`RNTO` pair against the FTP adapter, with the
//! conservative whole-cache invalidation `Core::rename` performs (see its
//! doc comment). No client-side recursive copy+delete is needed here,
//! unlike an HTTP backend without a native rename verb.

use super::prelude::*;
use super::{join_path, RemoteFs};

#[allow(clippy::too_many_arguments)]
pub fn rename(
    fs: &mut RemoteFs,
    _req: &Request<'_>,
    parent: u64,
    name: &OsStr,
    newparent: u64,
    newname: &OsStr,
    _flags: u32,
    reply: ReplyEmpty,
) {
    let old_parent_path = match fs.path_for(parent) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let new_parent_path = match fs.path_for(newparent) {
        Some(p) => p,
        None => {
            reply.error(ENOENT);
            return;
        }
    };
    let (old_name, new_name) = match (name.to_str(), newname.to_str()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            reply.error(ENOENT);
            return;
        }
    };

    let old_path = join_path(&old_parent_path, old_name);
    let new_path = join_path(&new_parent_path, new_name);

    match fs.core.rename(&old_path, &new_path) {
        Ok(()) => {
            let mut inodes = fs.inodes_mut();
            if let Some(ino) = inodes.path_to_ino.remove(&old_path) {
                inodes.ino_to_path.insert(ino, new_path.clone());
                inodes.path_to_ino.insert(new_path, ino);
            }
            reply.ok();
        }
        Err(e) => reply.error(e.to_errno()),
    }
}
