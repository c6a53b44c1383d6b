//! Handle to the session transport.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{InboundEvent, OutboundEvent};
use super::transport;
use crate::config::SessionConfig;

/// How long [`SessionChannel::close`] waits for the farewell packet.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Owner of the single backend connection.
///
/// Created once by the application root and dropped at teardown; dropping
/// the handle cancels the transport.
pub struct SessionChannel {
    outbound_tx: mpsc::UnboundedSender<OutboundEvent>,
    inbound_rx: mpsc::UnboundedReceiver<InboundEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
    endpoint: String,
}

impl SessionChannel {
    /// Spawns the transport task and starts connecting.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: &SessionConfig) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(transport::run(
            config.clone(),
            outbound_rx,
            inbound_tx,
            cancel.clone(),
        ));

        Self {
            outbound_tx,
            inbound_rx,
            cancel,
            task: Some(task),
            endpoint: config.endpoint.clone(),
        }
    }

    /// Queues an event for the backend. Fire-and-forget.
    pub fn emit(&self, event: OutboundEvent) {
        if let Err(e) = self.outbound_tx.send(event) {
            debug!(event = e.0.name(), "Session channel stopped, emit dropped");
        }
    }

    /// Next inbound event, if one is ready.
    pub fn try_recv(&mut self) -> Option<InboundEvent> {
        self.inbound_rx.try_recv().ok()
    }

    /// Waits for the next inbound event; `None` once the transport stopped.
    pub async fn recv(&mut self) -> Option<InboundEvent> {
        self.inbound_rx.recv().await
    }

    /// Asks the transport to close the connection and stop.
    pub fn disconnect(&self) {
        self.cancel.cancel();
    }

    /// Disconnects and waits briefly for the transport to finish.
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take()
            && tokio::time::timeout(CLOSE_GRACE, task).await.is_err()
        {
            debug!("Session transport did not stop in time");
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for SessionChannel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
