//! Shared test doubles for the `context` and `fs` unit tests.
//!
//! `FakeTransport` is an in-memory stand-in for a real FTP server: a flat
//! path-keyed map of files and directories, implementing [`FtpTransport`]
//! directly rather than opening a socket. A real mount-and-drive test would
//! need an actual FUSE mount and FTP server (see the other example repos'
//! `tests/integration_test.rs` for what that looks like); this crate's
//! dispatcher is thin enough that exercising `Core` through the fake covers
//! the same logic without either dependency.

#![cfg(test)]

use std::collections::HashMap;
use std::path::Path;

use crate::config::Config;
use crate::context::Core;
use crate::error::{FsError, FsResult};
use crate::ftp::FtpTransport;
use crate::parser::{Entry, EntryKind};

#[derive(Clone)]
enum Node {
    File { content: Vec<u8>, mtime: i64 },
    Dir,
}

pub(crate) struct FakeTransport {
    nodes: HashMap<String, Node>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self { nodes }
    }

    pub(crate) fn with_file(mut self, path: &str, content: &[u8], mtime: i64) -> Self {
        self.nodes.insert(path.to_string(), Node::File { content: content.to_vec(), mtime });
        self
    }

    pub(crate) fn with_dir(mut self, path: &str) -> Self {
        self.nodes.insert(path.to_string(), Node::Dir);
        self
    }

    fn children_of(&self, path: &str) -> Vec<Entry> {
        let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
        let mut out = Vec::new();
        for (p, node) in &self.nodes {
            if p == path {
                continue;
            }
            if let Some(rest) = p.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains('/') {
                    let (kind, size, mode) = match node {
                        Node::Dir => (EntryKind::Directory, 0, 0o040755),
                        Node::File { content, .. } => (EntryKind::File, content.len() as u64, 0o100644),
                    };
                    let mtime = match node {
                        Node::File { mtime, .. } => *mtime,
                        Node::Dir => 0,
                    };
                    out.push(Entry { name: rest.to_string(), kind, size, mtime, mode });
                }
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

impl FtpTransport for FakeTransport {
    fn connect(&mut self) -> FsResult<()> {
        Ok(())
    }

    fn disconnect(&mut self) {}

    fn list_dir(&mut self, path: &str) -> FsResult<Vec<Entry>> {
        if !self.nodes.contains_key(path) {
            return Err(FsError::NotFound);
        }
        Ok(self.children_of(path))
    }

    fn download(&mut self, remote: &str, local: &Path) -> FsResult<()> {
        match self.nodes.get(remote) {
            Some(Node::File { content, .. }) => {
                std::fs::write(local, content)?;
                Ok(())
            }
            _ => Err(FsError::NotFound),
        }
    }

    fn upload(&mut self, local: &Path, remote: &str) -> FsResult<()> {
        let content = std::fs::read(local)?;
        self.nodes.insert(remote.to_string(), Node::File { content, mtime: 1 });
        Ok(())
    }

    fn delete(&mut self, path: &str) -> FsResult<()> {
        self.nodes.remove(path).ok_or(FsError::NotFound)?;
        Ok(())
    }

    fn mkdir(&mut self, path: &str) -> FsResult<()> {
        self.nodes.insert(path.to_string(), Node::Dir);
        Ok(())
    }

    fn rmdir(&mut self, path: &str) -> FsResult<()> {
        self.nodes.remove(path).ok_or(FsError::NotFound)?;
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> FsResult<()> {
        let node = self.nodes.remove(from).ok_or(FsError::NotFound)?;
        self.nodes.insert(to.to_string(), node);
        Ok(())
    }
}

pub(crate) fn test_config() -> Config {
    Config {
        host: "ftp.example.com".into(),
        port: 21,
        user: "anonymous".into(),
        password: String::new(),
        encoding: "utf-8".into(),
        cache_timeout: 30,
        debug: false,
        foreground: true,
        mountpoint: "/mnt/ftp".into(),
    }
}

pub(crate) fn test_core(transport: FakeTransport) -> Core {
    Core::for_test(test_config(), Box::new(transport)).unwrap()
}
