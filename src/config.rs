//! Command-line surface and the runtime configuration it produces.
//!
//! There is no on-disk config file: the reference program takes all of its
//! settings from argv, and this rewrite keeps that single source of truth
//! rather than layering a `toml`-based config file underneath it (see
//! DESIGN.md for the dependency this displaced).

use clap::Parser;

const CACHE_TIMEOUT_MIN: u64 = 5;
const CACHE_TIMEOUT_MAX: u64 = 300;
const CACHE_TIMEOUT_DEFAULT: u64 = 30;
const VSCODE_CACHE_TIMEOUT: u64 = 60;

/// Mount a remote FTP server as a local POSIX filesystem.
#[derive(Parser, Debug)]
#[command(name = "cftpfs-rs", version, about, long_about = None)]
pub struct Args {
    /// FTP server hostname or address
    pub host: String,

    /// Local directory to mount the filesystem at
    pub mountpoint: String,

    /// FTP port
    #[arg(short = 'p', long = "port", default_value_t = 21)]
    pub port: u16,

    /// FTP username
    #[arg(short = 'u', long = "user", default_value = "anonymous")]
    pub user: String,

    /// FTP password
    #[arg(short = 'P', long = "password", default_value = "")]
    pub password: String,

    /// Filename encoding (recorded, not transcoded)
    #[arg(short = 'e', long = "encoding", default_value = "utf-8")]
    pub encoding: String,

    /// Directory listing cache TTL in seconds, clamped to [5, 300]
    #[arg(short = 'c', long = "cache-timeout", default_value_t = CACHE_TIMEOUT_DEFAULT)]
    pub cache_timeout: u64,

    /// Shorthand for a cache timeout tuned for editor workloads (60s)
    #[arg(long = "vscode", default_value_t = false)]
    pub vscode: bool,

    /// Verbose logging
    #[arg(short = 'd', long = "debug", default_value_t = false)]
    pub debug: bool,

    /// Do not daemonize; run attached to the terminal
    #[arg(short = 'f', long = "foreground", default_value_t = false)]
    pub foreground: bool,
}

/// The runtime configuration derived from `Args` after defaults, presets,
/// and clamps have been applied. This is what `Context` actually carries.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub encoding: String,
    pub cache_timeout: u64,
    pub debug: bool,
    pub foreground: bool,
    pub mountpoint: String,
}

impl Config {
    pub fn from_args(args: Args) -> Self {
        let mut cache_timeout = args.cache_timeout.clamp(CACHE_TIMEOUT_MIN, CACHE_TIMEOUT_MAX);
        if args.vscode {
            cache_timeout = VSCODE_CACHE_TIMEOUT;
        }
        Config {
            host: args.host,
            port: args.port,
            user: args.user,
            password: args.password,
            encoding: args.encoding,
            cache_timeout,
            debug: args.debug,
            foreground: args.foreground,
            mountpoint: args.mountpoint,
        }
    }
}
