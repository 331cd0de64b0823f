//! The FTP operation adapter: a narrow, synchronous interface over a single
//! control connection, implemented against `suppaftp::FtpStream`.
//!
//! Every method here is a direct counterpart of one row in the FTP adapter
//! table: `list_dir` walks into the directory (MULTICWD-equivalent) before
//! issuing `LIST`; `download` issues `RETR` against an absolute path
//! without walking (NOCWD-equivalent). Connection-class failures drop the
//! stream so the next call reconnects transparently.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use socket2::{SockRef, TcpKeepalive};
use suppaftp::{FtpError, FtpStream};

use crate::error::{FsError, FsResult};
use crate::parser::{self, Entry};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const OP_TIMEOUT: Duration = Duration::from_secs(300);
const KEEPALIVE_IDLE: Duration = Duration::from_secs(120);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(60);

/// Applies the per-operation read/write timeout and TCP keepalive tuning to
/// a freshly connected control socket. `suppaftp` exposes no timeout/
/// keepalive knobs of its own beyond the initial connect, so both are set
/// directly on the underlying `TcpStream` via `get_ref()`.
fn tune_socket(tcp: &TcpStream) -> std::io::Result<()> {
    tcp.set_read_timeout(Some(OP_TIMEOUT))?;
    tcp.set_write_timeout(Some(OP_TIMEOUT))?;
    let keepalive =
        TcpKeepalive::new().with_time(KEEPALIVE_IDLE).with_interval(KEEPALIVE_INTERVAL);
    SockRef::from(tcp).set_tcp_keepalive(&keepalive)?;
    Ok(())
}

/// Characters a path component must not carry unescaped in a `ftp://`-shaped
/// display URI. Used only for logging: the raw component strings are what
/// actually go over the wire to `suppaftp`, which expects literal bytes,
/// not percent-encoded ones.
const COMPONENT_ENCODE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b'%').add(b'?').add(b'#');

/// Percent-encodes each `/`-separated component of `path` for display
/// purposes (log lines below), preserving the separators and any leading
/// empty component. Mirrors the reference's per-component
/// `curl_easy_escape` encoding, retained here as a diagnostic aid since
/// `suppaftp` is a command-based client rather than a URL-fetching one: the
/// raw component strings are what actually go over the wire, not the
/// percent-encoded form.
pub fn display_encode_path(path: &str) -> String {
    path.split('/')
        .map(|seg| utf8_percent_encode(seg, COMPONENT_ENCODE_SET).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

pub trait FtpTransport: Send {
    fn connect(&mut self) -> FsResult<()>;
    fn disconnect(&mut self);
    fn list_dir(&mut self, path: &str) -> FsResult<Vec<Entry>>;
    fn download(&mut self, remote: &str, local: &Path) -> FsResult<()>;
    fn upload(&mut self, local: &Path, remote: &str) -> FsResult<()>;
    fn delete(&mut self, path: &str) -> FsResult<()>;
    fn mkdir(&mut self, path: &str) -> FsResult<()>;
    fn rmdir(&mut self, path: &str) -> FsResult<()>;
    fn rename(&mut self, from: &str, to: &str) -> FsResult<()>;
}

pub struct SuppaFtpTransport {
    host: String,
    port: u16,
    user: String,
    password: String,
    stream: Option<FtpStream>,
}

impl SuppaFtpTransport {
    pub fn new(host: String, port: u16, user: String, password: String) -> Self {
        Self { host, port, user, password, stream: None }
    }

    fn ensure_connected(&mut self) -> FsResult<&mut FtpStream> {
        if self.stream.is_none() {
            self.connect()?;
        }
        Ok(self.stream.as_mut().expect("connected above"))
    }

    /// Classifies a `suppaftp` error as connection-fatal (drop and
    /// reconnect next call) or a plain protocol rejection (keep the
    /// connection, surface the error).
    fn classify(&mut self, err: FtpError) -> FsError {
        match &err {
            FtpError::ConnectionError(_) => {
                log::warn!("ftp: connection error, dropping session: {err}");
                self.stream = None;
                FsError::Transport(err.to_string())
            }
            _ => FsError::Protocol(err.to_string()),
        }
    }
}

impl FtpTransport for SuppaFtpTransport {
    fn connect(&mut self) -> FsResult<()> {
        log::debug!("ftp: connecting to {}:{}", self.host, self.port);
        let addr = format!("{}:{}", self.host, self.port);
        let mut stream = FtpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| FsError::Transport(e.to_string()))?;
        if let Err(e) = tune_socket(stream.get_ref()) {
            log::warn!("ftp: failed to apply socket timeout/keepalive tuning: {e}");
        }
        stream
            .login(&self.user, &self.password)
            .map_err(|e| FsError::Transport(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.quit();
        }
    }

    fn list_dir(&mut self, path: &str) -> FsResult<Vec<Entry>> {
        log::debug!("ftp: LIST {}", display_encode_path(path));
        let stream = self.ensure_connected()?;
        let target = if path.is_empty() { "/" } else { path };
        if let Err(e) = stream.cwd(target) {
            let err = self.classify(e);
            return Err(err);
        }
        let stream = self.ensure_connected()?;
        let lines = stream.list(None).map_err(|e| self.classify(e))?;
        Ok(lines.iter().filter_map(|l| parser::parse_line(l)).collect())
    }

    fn download(&mut self, remote: &str, local: &Path) -> FsResult<()> {
        log::debug!("ftp: RETR {} -> {}", display_encode_path(remote), local.display());
        let mut file = std::fs::File::create(local)?;
        let stream = self.ensure_connected()?;
        let result = stream.retr(remote, |reader: &mut dyn Read| {
            std::io::copy(reader, &mut file).map_err(suppaftp::FtpError::ConnectionError)
        });
        result.map(|_| ()).map_err(|e| self.classify(e))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> FsResult<()> {
        log::debug!("ftp: STOR {} <- {}", display_encode_path(remote), local.display());
        if let Some(parent) = parent_dir(remote) {
            let _ = self.mkdir_parents(&parent);
        }
        let mut file = std::fs::File::open(local)?;
        let stream = self.ensure_connected()?;
        stream
            .put_file(remote, &mut file)
            .map(|_| ())
            .map_err(|e| self.classify(e))
    }

    fn delete(&mut self, path: &str) -> FsResult<()> {
        log::debug!("ftp: DELE {}", display_encode_path(path));
        let stream = self.ensure_connected()?;
        stream.rm(path).map_err(|e| self.classify(e))
    }

    fn mkdir(&mut self, path: &str) -> FsResult<()> {
        log::debug!("ftp: MKD {}", display_encode_path(path));
        if let Some(parent) = parent_dir(path) {
            self.mkdir_parents(&parent)?;
        }
        let stream = self.ensure_connected()?;
        stream.mkdir(path).map_err(|e| self.classify(e))
    }

    fn rmdir(&mut self, path: &str) -> FsResult<()> {
        log::debug!("ftp: RMD {}", display_encode_path(path));
        let stream = self.ensure_connected()?;
        stream.rmdir(path).map_err(|e| self.classify(e))
    }

    fn rename(&mut self, from: &str, to: &str) -> FsResult<()> {
        log::debug!(
            "ftp: RNFR {} / RNTO {}",
            display_encode_path(from),
            display_encode_path(to)
        );
        let stream = self.ensure_connected()?;
        stream.rename(from, to).map_err(|e| self.classify(e))
    }
}

impl SuppaFtpTransport {
    /// Best-effort ancestor creation ahead of an upload/mkdir, matching the
    /// reference's `CURLOPT_FTP_CREATE_MISSING_DIRS` behavior. Failures here
    /// (most commonly "already exists") are not fatal; only the final
    /// operation's own result is reported to the caller.
    fn mkdir_parents(&mut self, path: &str) -> FsResult<()> {
        let mut acc = String::new();
        for component in path.split('/').filter(|c| !c.is_empty()) {
            acc.push('/');
            acc.push_str(component);
            if let Ok(stream) = self.ensure_connected() {
                let _ = stream.mkdir(&acc);
            }
        }
        Ok(())
    }
}

fn parent_dir(path: &str) -> Option<String> {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit_once('/').map(|(p, _)| {
        if p.is_empty() {
            "/".to_string()
        } else {
            p.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_encode_preserves_separators() {
        assert_eq!(display_encode_path("/a b/c"), "/a%20b/c");
        assert_eq!(display_encode_path(""), "");
        assert_eq!(display_encode_path("/"), "/");
    }

    #[test]
    fn parent_dir_of_nested_path() {
        assert_eq!(parent_dir("/a/b/c"), Some("/a/b".to_string()));
        assert_eq!(parent_dir("/a"), Some("/".to_string()));
        assert_eq!(parent_dir("a"), None);
    }
}
