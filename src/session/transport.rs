use std::sync::OnceLock;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

use crate::error::SessionError;

/// Buffered server-initiated messages per session.
const EVENT_CAPACITY: usize = 64;

/// Per-session transport.
///
/// Carries the session id once initialization confirms it, fans out
/// server-initiated messages to event streams, and signals closure.
pub struct SessionTransport {
    session_id: OnceLock<String>,
    events: broadcast::Sender<Value>,
    closed: CancellationToken,
}

impl SessionTransport {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            session_id: OnceLock::new(),
            events,
            closed: CancellationToken::new(),
        }
    }

    /// Confirm the id this transport serves. Only the first call takes effect.
    pub fn bind(&self, session_id: &str) -> bool {
        self.session_id.set(session_id.to_string()).is_ok()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.get().map(String::as_str)
    }

    /// Handle the protocol handler uses to push notifications.
    pub fn notifier(&self) -> Notifier {
        Notifier {
            events: self.events.clone(),
        }
    }

    /// New receiver for the session's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.events.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the transport has closed.
    pub fn closed(&self) -> WaitForCancellationFutureOwned {
        self.closed.clone().cancelled_owned()
    }

    /// Mark the transport closed.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!(session_id = self.session_id().unwrap_or("-"), "transport closed");
            self.closed.cancel();
        }
    }

    /// Process a termination request: close, failing if already closed.
    pub fn terminate(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(
                self.session_id().unwrap_or_default().to_string(),
            ));
        }
        self.close();
        Ok(())
    }
}

impl Default for SessionTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Sends server-initiated JSON-RPC notifications on one session.
#[derive(Clone)]
pub struct Notifier {
    events: broadcast::Sender<Value>,
}

impl Notifier {
    /// Returns how many event streams received the message.
    pub fn notify(&self, method: &str, params: Option<Value>) -> usize {
        let mut message = json!({ "jsonrpc": "2.0", "method": method });
        if let Some(params) = params {
            message["params"] = params;
        }
        // No listener is not an error; the notification is dropped.
        self.events.send(message).unwrap_or(0)
    }
}
