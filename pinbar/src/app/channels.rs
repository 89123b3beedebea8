use std::sync::mpsc as std_mpsc;

use tokio::sync::mpsc;

use crate::event::Event;
use crate::ipc::IpcServer;
use crate::macos::AXUIElement;
use pinbar_ipc::{Command, Response};

pub type IpcCommandWithResponse = (Command, mpsc::Sender<Response>);

pub struct TokioChannels {
    cmd_tx: std_mpsc::Sender<IpcCommandWithResponse>,
    server_tx: mpsc::Sender<IpcCommandWithResponse>,
    server_rx: mpsc::Receiver<IpcCommandWithResponse>,
}

pub struct MainChannels {
    pub ipc_cmd_rx: std_mpsc::Receiver<IpcCommandWithResponse>,
    /// Worker results and OS callbacks (resize, hotkey, anchor click).
    pub event_tx: std_mpsc::Sender<Event<AXUIElement>>,
    pub event_rx: std_mpsc::Receiver<Event<AXUIElement>>,
}

pub fn create_channels() -> (TokioChannels, MainChannels) {
    // IPC commands (tokio -> main thread)
    let (cmd_tx, ipc_cmd_rx) = std_mpsc::channel::<IpcCommandWithResponse>();

    // IPC server -> relay (tokio internal)
    let (server_tx, server_rx) = mpsc::channel::<IpcCommandWithResponse>(256);

    let (event_tx, event_rx) = std_mpsc::channel::<Event<AXUIElement>>();

    (
        TokioChannels {
            cmd_tx,
            server_tx,
            server_rx,
        },
        MainChannels {
            ipc_cmd_rx,
            event_tx,
            event_rx,
        },
    )
}

pub async fn run_async(channels: TokioChannels) {
    let TokioChannels {
        cmd_tx,
        server_tx,
        mut server_rx,
    } = channels;

    tracing::info!("Tokio runtime started");

    let ipc_server = IpcServer::new(server_tx);
    tokio::spawn(async move {
        if let Err(e) = ipc_server.run().await {
            tracing::error!("IPC server error: {}", e);
        }
    });

    while let Some((cmd, resp_tx)) = server_rx.recv().await {
        if cmd_tx.send((cmd, resp_tx)).is_err() {
            tracing::error!("Failed to forward IPC command to main thread");
            break;
        }
    }

    tracing::info!("Tokio runtime exiting");
}
