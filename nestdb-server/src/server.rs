//! TCP accept loop, worker pool and graceful drain
//!
//! The server moves through an explicit state machine:
//! `Starting -> Accepting -> Draining -> Stopped`. While accepting, each
//! connection is spawned as a handler task that first queues for one of N
//! worker permits; saturation shows up as latency for accepted-but-unserved
//! connections, never as a rejection. An `exit` request served by any
//! handler flips the server into draining: the listener is dropped, no new
//! connections are accepted and in-flight handlers run to completion.

use anyhow::Result;
use nestdb_core::connection::{self, Outcome};
use nestdb_core::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Lifecycle of the accept loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Starting,
    Accepting,
    Draining,
    Stopped,
}

/// TCP server for nestdb.
pub struct Server {
    listener: TcpListener,
    store: Arc<Store>,
    workers: Arc<Semaphore>,
    state: watch::Sender<ServerState>,
}

impl Server {
    /// Bind the listening socket with a pool of `workers` handler slots.
    pub async fn bind(addr: impl ToSocketAddrs, store: Arc<Store>, workers: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, workers, "listening");
        let (state, _) = watch::channel(ServerState::Starting);
        Ok(Self {
            listener,
            store,
            workers: Arc::new(Semaphore::new(workers)),
            state,
        })
    }

    /// Address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Watch lifecycle transitions. The receiver starts at the current
    /// state and keeps observing after [`Server::run`] consumes the server.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Run until an `exit` request has been served and all in-flight
    /// connections have drained.
    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            store,
            workers,
            state,
        } = self;
        let (exit_tx, mut exit_rx) = mpsc::channel::<()>(1);
        let mut handlers = JoinSet::new();

        transition(&state, ServerState::Accepting);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            debug!(%peer, "connection accepted");
                            let workers = workers.clone();
                            let store = store.clone();
                            let exit_tx = exit_tx.clone();
                            handlers.spawn(async move {
                                // queue for a worker slot before serving
                                let Ok(_permit) = workers.acquire_owned().await else {
                                    return;
                                };
                                let mut stream = stream;
                                match connection::serve(&mut stream, &store).await {
                                    Ok(Outcome::Exit) => {
                                        let _ = exit_tx.try_send(());
                                    }
                                    Ok(Outcome::Continue) => {}
                                    Err(e) => warn!(%peer, error = %e, "connection failed"),
                                }
                            });
                        }
                        Err(e) => error!(error = %e, "accept failed"),
                    }
                }
                _ = exit_rx.recv() => {
                    transition(&state, ServerState::Draining);
                    break;
                }
                // reap finished handlers so the set does not grow unbounded
                Some(finished) = handlers.join_next() => {
                    if let Err(e) = finished {
                        error!(error = %e, "handler task panicked");
                    }
                }
            }
        }

        // close the listening socket, nothing new gets in
        drop(listener);

        while let Some(finished) = handlers.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "handler task panicked");
            }
        }

        transition(&state, ServerState::Stopped);
        Ok(())
    }
}

fn transition(state: &watch::Sender<ServerState>, next: ServerState) {
    let prev = state.send_replace(next);
    info!(from = ?prev, to = ?next, "state transition");
}
