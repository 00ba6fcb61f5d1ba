//! Single-threaded echo server that reaps idle connections
//!
//! The loop owns every piece of mutable state: the connection table and the
//! idle timers. Connection tasks only read, echo, and report back over a
//! channel, so timer callbacks always run on the loop between I/O events.
//!
//! ```text
//!   accept ──▶ Client + idle timer ──▶ spawn connection task
//!   Data   ──▶ touch(timer)
//!   Closed ──▶ cancel(timer), drop Client
//!   sleep(poll_timeout) ──▶ tick ──▶ expire_idle ──▶ close signal to task
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use hashbrown::HashMap;
use idlereap_core::{IdleTimeouts, ServerConfig, SystemClock, TimerList};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::{Client, ClientHandle, ClientId, ClientRef, CloseReason, ConnEvent};
use crate::error::ServerError;

const TOO_MANY_USERS: &[u8] = b"too many users\n";

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr.clone(),
                source,
            })?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener.local_addr().map_err(ServerError::LocalAddr)
    }

    /// Serve until `shutdown` completes, then close every connection
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let local_addr = self.local_addr()?;
        let Server { listener, config } = self;

        let mut timeouts: IdleTimeouts<ClientRef> =
            IdleTimeouts::new(SystemClock, config.idle_timeout()).with_max_wait(config.max_wait());
        let mut clients: HashMap<ClientId, ClientHandle> = HashMap::new();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut next_id: ClientId = 0;

        info!(
            addr = %local_addr,
            idle_timeout = ?timeouts.idle_timeout(),
            max_connections = config.max_connections,
            "listening"
        );

        tokio::pin!(shutdown);
        loop {
            let wait = timeouts.poll_timeout();

            tokio::select! {
                _ = &mut shutdown => break,

                accepted = listener.accept() => {
                    let (stream, address) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    if clients.len() >= config.max_connections {
                        info!(%address, "too many users, rejecting connection");
                        tokio::spawn(reject(stream));
                        continue;
                    }

                    next_id += 1;
                    let id = next_id;
                    let (close_tx, close_rx) = oneshot::channel();
                    let client = Rc::new(RefCell::new(Client::new(
                        id,
                        address,
                        config.read_buffer_size,
                        close_tx,
                    )));

                    let timer = timeouts.register(Rc::downgrade(&client), expire_idle);
                    client.borrow_mut().timer = Some(timer);
                    clients.insert(id, client);

                    tokio::spawn(serve_connection(
                        id,
                        stream,
                        config.read_buffer_size,
                        events_tx.clone(),
                        close_rx,
                    ));
                    info!(client = id, %address, connected = clients.len(), "new connection");
                }

                Some(event) = events_rx.recv() => match event {
                    ConnEvent::Data { id, data } => {
                        if let Some(handle) = clients.get(&id) {
                            let mut client = handle.borrow_mut();
                            client.record(&data);
                            timeouts.touch(client.timer);
                            debug!(
                                client = id,
                                bytes = data.len(),
                                data = %String::from_utf8_lossy(&client.buf),
                                "activity, idle deadline extended"
                            );
                        }
                    }
                    ConnEvent::Closed { id, reason } => {
                        if let Some(handle) = clients.remove(&id) {
                            // Already None if the idle timer is what closed it
                            let timer = handle.borrow_mut().timer.take();
                            timeouts.cancel(timer);
                            info!(client = id, ?reason, connected = clients.len(), "connection closed");
                        }
                    }
                },

                _ = sleep_for(wait) => {
                    timeouts.tick();
                }
            }
        }

        info!(connected = clients.len(), "shutting down");
        for handle in clients.values() {
            handle.borrow_mut().close(CloseReason::ServerShutdown);
        }
        Ok(())
    }
}

/// Idle timer callback: the timer is already gone, so drop the back-reference
/// and tell the connection task to hang up.
fn expire_idle(_timers: &mut TimerList<ClientRef>, client: ClientRef) {
    let Some(handle) = client.upgrade() else {
        return;
    };
    let mut client = handle.borrow_mut();
    client.timer = None;
    info!(client = client.id, address = %client.address, "idle timeout, closing connection");
    client.close(CloseReason::IdleTimeout);
}

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending().await,
    }
}

async fn reject(mut stream: TcpStream) {
    if let Err(e) = stream.write_all(TOO_MANY_USERS).await {
        debug!(error = %e, "failed to send rejection");
    }
}

/// Read, echo and report until the peer leaves or the loop asks us to close
async fn serve_connection(
    id: ClientId,
    mut stream: TcpStream,
    buffer_size: usize,
    events: mpsc::UnboundedSender<ConnEvent>,
    mut close_rx: oneshot::Receiver<CloseReason>,
) {
    let mut buf = vec![0u8; buffer_size];

    let reason = loop {
        tokio::select! {
            reason = &mut close_rx => break reason.unwrap_or(CloseReason::ServerShutdown),

            read = stream.read(&mut buf) => match read {
                Ok(0) => break CloseReason::PeerClosed,
                Ok(n) => {
                    if let Err(e) = stream.write_all(&buf[..n]).await {
                        break CloseReason::Io(e.kind());
                    }
                    let data = buf[..n].to_vec();
                    if events.send(ConnEvent::Data { id, data }).is_err() {
                        return;
                    }
                }
                Err(e) => break CloseReason::Io(e.kind()),
            },
        }
    };

    drop(stream);
    let _ = events.send(ConnEvent::Closed { id, reason });
}
