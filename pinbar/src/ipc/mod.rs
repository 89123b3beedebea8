mod client;
mod server;

pub use client::IpcClient;
pub use server::IpcServer;

pub const SOCKET_PATH: &str = "/tmp/pinbar.sock";

pub fn remove_socket() {
    if let Err(e) = std::fs::remove_file(SOCKET_PATH) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove {}: {}", SOCKET_PATH, e);
        }
    }
}
