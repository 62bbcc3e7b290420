// src/preview/hub.rs

//! WebSocket hub that tells connected browsers to reload.

use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, warn};
use tungstenite::WebSocket;

use crate::errors::{Result, RigError};

use super::ReloadBroadcaster;

/// Message sent to clients on reload.
pub const RELOAD_MESSAGE: &str = "reload";

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Accepts WebSocket clients on a dedicated thread and broadcasts reload
/// messages to all of them.
pub struct WebSocketHub {
    port: u16,
    clients: Clients,
    _accept: JoinHandle<()>,
}

impl std::fmt::Debug for WebSocketHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketHub")
            .field("port", &self.port)
            .field("clients", &self.client_count())
            .finish()
    }
}

impl WebSocketHub {
    pub fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .map_err(|source| RigError::PreviewBind { port, source })?;
        let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let accept = spawn_accept(listener, Arc::clone(&clients));

        debug!(port, "reload hub listening");
        Ok(Self {
            port,
            clients,
            _accept: accept,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().map(|c| c.len()).unwrap_or(0)
    }
}

fn spawn_accept(listener: TcpListener, clients: Clients) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(err) => {
                    warn!(error = %err, "reload hub accept failed");
                    continue;
                }
            };
            match tungstenite::accept(stream) {
                Ok(socket) => {
                    let mut clients = clients.lock().unwrap_or_else(|e| e.into_inner());
                    clients.push(socket);
                    debug!(clients = clients.len(), "reload client connected");
                }
                Err(err) => warn!(error = %err, "reload client handshake failed"),
            }
        }
    })
}

impl ReloadBroadcaster for WebSocketHub {
    fn broadcast(&self) -> usize {
        let mut clients = self.clients.lock().unwrap_or_else(|e| e.into_inner());
        let mut broken = Vec::new();

        for (idx, socket) in clients.iter_mut().enumerate() {
            if let Err(err) = socket.send(RELOAD_MESSAGE.into()) {
                debug!(error = %err, "dropping reload client");
                broken.push(idx);
            }
        }
        for idx in broken.into_iter().rev() {
            clients.remove(idx);
        }
        clients.len()
    }
}
