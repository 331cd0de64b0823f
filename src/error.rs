//! Sum-typed error model for the filesystem core.
//!
//! Every fallible operation below the `fuser::Filesystem` boundary returns
//! `FsError`. Exactly one place (`FsError::to_errno`) turns that into a
//! POSIX errno; no other module should know about `libc::E*` constants.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("ftp transport error: {0}")]
    Transport(String),

    #[error("ftp protocol error: {0}")]
    Protocol(String),

    #[error("no such file or directory")]
    NotFound,

    #[error("local i/o error: {0}")]
    LocalIO(#[from] std::io::Error),

    #[error("too many open files")]
    Capacity,

    #[error("bad file descriptor")]
    BadHandle,
}

impl FsError {
    pub fn to_errno(&self) -> i32 {
        match self {
            FsError::Transport(_) => libc::EIO,
            FsError::Protocol(_) => libc::EIO,
            FsError::NotFound => libc::ENOENT,
            FsError::LocalIO(e) => e.raw_os_error().unwrap_or(libc::EIO),
            FsError::Capacity => libc::EMFILE,
            FsError::BadHandle => libc::EBADF,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
