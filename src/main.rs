mod cache;
mod config;
mod context;
mod error;
mod fs;
mod ftp;
mod handles;
mod parser;
mod read_cache;
#[cfg(test)]
mod test_support;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use daemonize::Daemonize;
use fuser::MountOption;

use config::{Args, Config};
use context::Core;
use fs::RemoteFs;

fn main() -> ExitCode {
    let args = Args::parse();
    let config = Config::from_args(args);

    if !config.foreground {
        let daemonize = Daemonize::new().working_directory(".");
        if let Err(e) = daemonize.start() {
            eprintln!("cftpfs-rs: failed to daemonize: {e}");
            return ExitCode::FAILURE;
        }
    }

    let level = if config.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new().filter_level(level).init();

    let mountpoint = config.mountpoint.clone();
    let host = config.host.clone();

    let core = match Core::new(config) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            log::error!("cftpfs-rs: failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    log::info!("cftpfs-rs: mounting ftp://{host} at {mountpoint}");

    let options = vec![
        MountOption::FSName("cftpfs-rs".to_string()),
        MountOption::AutoUnmount,
    ];
    let result = fuser::mount2(RemoteFs::new(core.clone()), &mountpoint, &options);
    core.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("cftpfs-rs: mount failed: {e}");
            ExitCode::FAILURE
        }
    }
}
