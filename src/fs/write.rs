//! `write`, `flush`, `fsync`, `release`.
//!
//! `flush` and `fsync` are no-ops: the upload only happens once, in
//! `release`, matching the whole-file `STOR` model. `release` uploads iff
//! the handle was ever written to or was never primed with a download,
//! then tears the spill file down regardless of the upload outcome.

use super::prelude::*;
use super::RemoteFs;

#[allow(clippy::too_many_arguments)]
pub fn write(
    fs: &mut RemoteFs,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    offset: i64,
    data: &[u8],
    _write_flags: u32,
    _flags: i32,
    _lock_owner: Option<u64>,
    reply: ReplyWrite,
) {
    if fh == 0 {
        reply.error(EBADF);
        return;
    }
    match fs.core.handles.get((fh - 1) as usize) {
        Some(handle) => match handle.write_at(offset.max(0) as u64, data) {
            Ok(n) => reply.written(n),
            Err(e) => reply.error(e.to_errno()),
        },
        None => reply.error(EBADF),
    }
}

pub fn flush(_fs: &mut RemoteFs, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
    reply.ok();
}

pub fn fsync(_fs: &mut RemoteFs, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
    reply.ok();
}

pub fn release(
    fs: &mut RemoteFs,
    _req: &Request<'_>,
    _ino: u64,
    fh: u64,
    _flags: i32,
    _lock_owner: Option<u64>,
    _flush: bool,
    reply: ReplyEmpty,
) {
    if fh == 0 {
        reply.ok();
        return;
    }
    let idx = (fh - 1) as usize;
    let handle = match fs.core.handles.release(idx) {
        Some(h) => h,
        None => {
            reply.ok();
            return;
        }
    };

    if handle.is_dirty() || handle.is_new() {
        if let Err(e) = fs.core.upload(&handle.spill_path, &handle.remote_path) {
            log::error!("release: upload of {} failed: {e}", handle.remote_path);
            let _ = std::fs::remove_file(&handle.spill_path);
            reply.error(e.to_errno());
            return;
        }
    }
    let _ = std::fs::remove_file(&handle.spill_path);
    reply.ok();
}
