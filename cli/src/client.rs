use std::cell::RefCell;
use std::io;
use std::net::SocketAddr;
use std::rc::{Rc, Weak};

use idlereap_core::TimerId;
use tokio::sync::oneshot;

pub type ClientId = u64;

/// Shared handle to a client, owned by the server's connection table.
pub type ClientHandle = Rc<RefCell<Client>>;

/// Non-owning handle stored as a timer's context.
pub type ClientRef = Weak<RefCell<Client>>;

/// Why a connection task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerClosed,
    IdleTimeout,
    ServerShutdown,
    Io(io::ErrorKind),
}

/// Messages from connection tasks back to the server loop
#[derive(Debug)]
pub enum ConnEvent {
    /// Bytes were read (and echoed) on the connection
    Data { id: ClientId, data: Vec<u8> },
    Closed { id: ClientId, reason: CloseReason },
}

/// Per-connection state the idle timer acts upon.
/// Lives in the server's table; timers only hold a `Weak` to it.
#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub address: SocketAddr,
    /// Most recent bytes received, truncated to the configured buffer size
    pub buf: Vec<u8>,
    buffer_size: usize,
    /// Back-reference to this client's idle timer. Cleared when it fires.
    pub timer: Option<TimerId>,
    close_tx: Option<oneshot::Sender<CloseReason>>,
}

impl Client {
    pub fn new(
        id: ClientId,
        address: SocketAddr,
        buffer_size: usize,
        close_tx: oneshot::Sender<CloseReason>,
    ) -> Self {
        Self {
            id,
            address,
            buf: Vec::with_capacity(buffer_size),
            buffer_size,
            timer: None,
            close_tx: Some(close_tx),
        }
    }

    /// Keep the latest chunk, bounded by the buffer size
    pub fn record(&mut self, data: &[u8]) {
        let keep = data.len().min(self.buffer_size);
        self.buf.clear();
        self.buf.extend_from_slice(&data[..keep]);
    }

    /// Ask the connection task to shut down. Returns false if already asked.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        match self.close_tx.take() {
            Some(tx) => tx.send(reason).is_ok(),
            None => false,
        }
    }
}
