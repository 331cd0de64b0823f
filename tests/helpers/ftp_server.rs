//! Spins up a throwaway, in-process FTP server backed by a real directory
//! on disk, so the integration test can drive the compiled binary against
//! an actual `suppaftp`-speaking endpoint instead of a mock transport.

use std::error::Error;
use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use unftp_sbe_fs::ServerExt;

pub fn spawn_ftp_server(serve_dir: &Path, port: u16) -> std::thread::JoinHandle<()> {
    let rt = Runtime::new().unwrap();
    let serve_dir = serve_dir.to_owned();
    std::thread::spawn(move || {
        rt.block_on(async {
            if let Err(e) = run_ftp_server(&serve_dir, port).await {
                eprintln!("ftp server error: {e}");
            }
        });
    })
}

async fn run_ftp_server(serve_dir: &Path, port: u16) -> Result<(), Box<dyn Error + Send + Sync>> {
    let serve_dir = PathBuf::from(serve_dir);
    let server = libunftp::Server::with_fs(serve_dir)
        .greeting("cftpfs-rs test server")
        .passive_ports(50000..50100)
        .build()
        .unwrap();
    server.listen(format!("127.0.0.1:{port}")).await?;
    Ok(())
}
