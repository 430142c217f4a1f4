//! Deferred connection teardown
//!
//! The engine forbids releasing a connection from inside one of its own
//! callbacks, so observers hand terminal connections to this queue. A single
//! worker task drains it in order: deregister first, then close.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::PeerConnection;
use crate::registry::{Handle, ObjectRepository};

/// One connection scheduled for release
pub struct TeardownRequest {
    pub handle: Handle,
    pub connection: Arc<dyn PeerConnection>,
}

/// Sending side of the teardown queue
#[derive(Clone)]
pub struct TeardownQueue {
    tx: mpsc::UnboundedSender<TeardownRequest>,
}

impl TeardownQueue {
    /// Create the queue and spawn its worker on the current runtime
    pub fn spawn(repository: Arc<ObjectRepository>) -> (Self, JoinHandle<()>) {
        let (queue, rx) = Self::channel();
        let worker = tokio::spawn(run_worker(rx, repository));
        (queue, worker)
    }

    /// Create the queue without a worker. The receiver must be drained with
    /// [`run_worker`] or inspected directly.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TeardownRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Hand a connection to the worker. Never blocks.
    pub fn schedule(&self, handle: Handle, connection: Arc<dyn PeerConnection>) {
        debug!("Scheduling teardown of connection {}", handle);
        if self.tx.send(TeardownRequest { handle, connection }).is_err() {
            tracing::warn!("Teardown worker is gone, connection left open");
        }
    }
}

/// Drain teardown requests until every queue handle is dropped
pub async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<TeardownRequest>,
    repository: Arc<ObjectRepository>,
) {
    while let Some(request) = rx.recv().await {
        tear_down(&repository, request);
    }
    debug!("Teardown worker stopped");
}

fn tear_down(repository: &ObjectRepository, request: TeardownRequest) {
    if let Some(entry) = repository.connections.remove_by_handle(&request.handle) {
        entry.observer.unbind();
    }
    request.connection.close();
    info!("Connection {} torn down", request.handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryPeerConnection;

    #[tokio::test]
    async fn test_worker_closes_in_order() {
        let repository = Arc::new(ObjectRepository::new());
        let (queue, worker) = TeardownQueue::spawn(repository.clone());

        let first = MemoryPeerConnection::new();
        let second = MemoryPeerConnection::new();
        queue.schedule(Handle::from("a"), first.clone());
        queue.schedule(Handle::from("b"), second.clone());
        drop(queue);

        worker.await.unwrap();
        assert!(first.is_closed());
        assert!(second.is_closed());
    }
}
