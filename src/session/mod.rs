//! Session lifecycle.
//!
//! A session pairs one [`NoteHandler`] with one [`SessionTransport`]. The
//! pair is created together, registered together once initialization has
//! succeeded, and released together when the transport closes or the
//! session is terminated. A closed id is never reactivated.

mod transport;

pub use transport::{Notifier, SessionTransport};

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::SessionError;
use crate::handlers::{NoteHandler, ToolContext};
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};

pub struct Session {
    id: String,
    handler: Mutex<NoteHandler>,
    transport: SessionTransport,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    /// Handle one request. Requests on the same session run one at a time,
    /// in arrival order.
    pub async fn handle(&self, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.handler.lock().await.handle(req).await
    }
}

type SessionMap = Arc<RwLock<HashMap<String, Arc<Session>>>>;

/// Process-wide registry of live sessions.
pub struct SessionRegistry {
    ctx: Arc<ToolContext>,
    sessions: SessionMap,
}

impl SessionRegistry {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self {
            ctx,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn context(&self) -> &Arc<ToolContext> {
        &self.ctx
    }

    /// Create a session from an `initialize` request.
    ///
    /// Handler and transport are built under a fresh id; they enter the live
    /// map only after the handler accepted the request and the transport
    /// confirmed the id. On rejection nothing is registered.
    pub async fn create(
        &self,
        init: &JsonRpcRequest,
    ) -> Result<(Arc<Session>, JsonRpcResponse), SessionError> {
        if !init.is_initialize() {
            return Err(SessionError::MissingSessionId);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let transport = SessionTransport::new();
        let mut handler = NoteHandler::new(self.ctx.clone(), transport.notifier());

        let response = match handler.handle(init).await {
            Some(resp) if !resp.is_error() => resp,
            Some(resp) => {
                let reason = resp
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_default();
                debug!(%reason, "initialize rejected; no session created");
                return Err(SessionError::InitializeRejected(reason));
            }
            None => return Err(SessionError::InitializeRejected("no response".into())),
        };

        if !transport.bind(&id) {
            return Err(SessionError::InitializeRejected("session id already bound".into()));
        }

        let session = Arc::new(Session {
            id: id.clone(),
            handler: Mutex::new(handler),
            transport,
        });

        self.sessions.write().await.insert(id.clone(), session.clone());
        self.watch_closure(&session);
        info!(session_id = %id, "session created");

        Ok((session, response))
    }

    /// Remove the session as soon as its transport reports closure.
    fn watch_closure(&self, session: &Arc<Session>) {
        let sessions = self.sessions.clone();
        let closed = session.transport.closed();
        let id = session.id.clone();
        tokio::spawn(async move {
            closed.await;
            if sessions.write().await.remove(&id).is_some() {
                info!(session_id = %id, "session closed by transport");
            }
        });
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Terminate a live session.
    ///
    /// The transport processes the termination first; handler and transport
    /// are released whether or not that succeeded.
    pub async fn terminate(&self, id: &str) -> Result<(), SessionError> {
        let session = self
            .get(id)
            .await
            .ok_or_else(|| SessionError::UnknownSession(id.to_string()))?;

        if let Err(e) = session.transport.terminate() {
            warn!(session_id = %id, "termination failed, releasing anyway: {e}");
        }
        self.sessions.write().await.remove(id);
        info!(session_id = %id, "session terminated");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Close every live session.
    pub async fn shutdown(&self) {
        let drained: Vec<Arc<Session>> = self.sessions.write().await.drain().map(|(_, s)| s).collect();
        for session in &drained {
            session.transport.close();
        }
        info!(count = drained.len(), "session registry shut down");
    }
}
