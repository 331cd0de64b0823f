//! Common imports shared by the `fs` submodules.
//!
//! Every FUSE callback lives in one of `attr`, `read`, `write`, `create`,
//! `delete`, or `rename`; all of them need the same handful of `fuser`
//! types, `libc` errno constants, and the core context type, so they are
//! gathered here instead of repeated per file.

pub use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};

pub use libc::{EBADF, EIO, ENOENT};

pub use std::ffi::OsStr;
pub use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub use crate::context::Core;
pub use crate::parser::EntryKind;

pub use super::{RemoteFs, ENTRY_TTL, ROOT_INO};
