use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::auth::{authorize, extract_token, TOKEN_FIELD};
use crate::config::ServerConfig;
use crate::error::{SessionError, StoreError};
use crate::handlers::ToolContext;
use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
use crate::session::{Session, SessionRegistry};
use crate::store::{HttpNoteStore, NoteStore};

/// Maximum bytes per JSON-RPC message (1 MiB).
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub const SESSION_HEADER: HeaderName = HeaderName::from_static("mcp-session-id");

pub const MCP_PATH: &str = "/mcp";

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
struct AppState {
    registry: Arc<SessionRegistry>,
    auth_token: Arc<str>,
}

/// MCP server speaking JSON-RPC 2.0 over streamable HTTP.
pub struct McpServer {
    config: ServerConfig,
    registry: Arc<SessionRegistry>,
}

impl McpServer {
    /// Server backed by the HTTP note store named in `config`.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let store = HttpNoteStore::new(&config.store_url, config.store_token.clone())?;
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: ServerConfig, store: Arc<dyn NoteStore>) -> Self {
        let ctx = Arc::new(ToolContext::new(store, &config));
        Self {
            registry: Arc::new(SessionRegistry::new(ctx)),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            auth_token: Arc::from(self.config.auth_token.as_str()),
        };

        Router::new()
            .route(MCP_PATH, get(get_mcp).post(post_mcp).delete(delete_mcp))
            .route("/health", get(health))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "MCP server listening on {MCP_PATH}");

        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for ctrl_c: {e}");
                std::future::pending::<()>().await;
            }
            info!("ctrl_c received; shutting down");
        })
        .await
    }

    /// Serve on `listener` until `shutdown` resolves.
    ///
    /// Live sessions are closed as soon as the signal fires, which ends their
    /// event streams and lets the open connections drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let registry = self.registry.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                registry.shutdown().await;
            })
            .await?;
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn post_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if body.len() > MAX_MESSAGE_BYTES {
        warn!("Message too large: {} bytes (limit {MAX_MESSAGE_BYTES})", body.len());
        return rpc_error(StatusCode::PAYLOAD_TOO_LARGE, None, JsonRpcError::parse_error());
    }

    let parsed: Option<Value> = serde_json::from_slice(&body).ok();

    let token = extract_token(&headers, query.get(TOKEN_FIELD).map(String::as_str), parsed.as_ref());
    if let Err(e) = authorize(&state.auth_token, token) {
        return rpc_error(StatusCode::UNAUTHORIZED, None, JsonRpcError::unauthorized(e.to_string()));
    }

    let Some(value) = parsed else {
        debug!("Parse error on POST body");
        return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::parse_error());
    };

    let req: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(e) => {
            debug!("Invalid JSON-RPC envelope: {e}");
            return rpc_error(StatusCode::BAD_REQUEST, None, JsonRpcError::invalid_request());
        }
    };

    if let Some(id) = session_id(&headers) {
        if let Some(session) = state.registry.get(id).await {
            return handle_in_session(&session, &req).await;
        }
        debug!(session_id = id, "unknown session id");
    }

    match state.registry.create(&req).await {
        Ok((session, resp)) => json_response(StatusCode::OK, Some(session.id()), &resp),
        Err(SessionError::InitializeRejected(reason)) => rpc_error(
            StatusCode::BAD_REQUEST,
            req.id,
            JsonRpcError::invalid_request_with(reason),
        ),
        Err(e) => rpc_error(
            StatusCode::BAD_REQUEST,
            req.id,
            JsonRpcError::session_error(e.to_string()),
        ),
    }
}

async fn handle_in_session(session: &Session, req: &JsonRpcRequest) -> Response {
    let resp = session.handle(req).await;

    // Closed while in flight: the result has nowhere to go.
    if session.transport().is_closed() {
        return rpc_error(
            StatusCode::NOT_FOUND,
            req.id.clone(),
            JsonRpcError::session_error(SessionError::Closed(session.id().to_string()).to_string()),
        );
    }

    match resp {
        Some(resp) => json_response(StatusCode::OK, Some(session.id()), &resp),
        None => with_session_header(StatusCode::ACCEPTED.into_response(), session.id()),
    }
}

/// Server-initiated event stream for an existing session.
async fn get_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let session = match authorized_session(&state, &headers, &query).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    let events = BroadcastStream::new(session.transport().subscribe())
        .filter_map(|msg| msg.ok())
        .map(|msg| SseEvent::default().event("message").json_data(msg));
    // The stream ends with the session's transport.
    let stream = futures_util::StreamExt::take_until(events, session.transport().closed());

    let resp = Sse::new(stream).keep_alive(KeepAlive::default()).into_response();
    with_session_header(resp, session.id())
}

async fn delete_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let session = match authorized_session(&state, &headers, &query).await {
        Ok(session) => session,
        Err(resp) => return resp,
    };

    match state.registry.terminate(session.id()).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => rpc_error(StatusCode::NOT_FOUND, None, JsonRpcError::session_error(e.to_string())),
    }
}

/// Auth check plus session lookup for the bodiless verbs.
async fn authorized_session(
    state: &AppState,
    headers: &HeaderMap,
    query: &HashMap<String, String>,
) -> Result<Arc<Session>, Response> {
    let token = extract_token(headers, query.get(TOKEN_FIELD).map(String::as_str), None);
    authorize(&state.auth_token, token).map_err(|e| {
        rpc_error(StatusCode::UNAUTHORIZED, None, JsonRpcError::unauthorized(e.to_string()))
    })?;

    let id = session_id(headers).ok_or_else(|| {
        rpc_error(
            StatusCode::BAD_REQUEST,
            None,
            JsonRpcError::session_error(SessionError::MissingSessionId.to_string()),
        )
    })?;

    state.registry.get(id).await.ok_or_else(|| {
        rpc_error(
            StatusCode::NOT_FOUND,
            None,
            JsonRpcError::session_error(SessionError::UnknownSession(id.to_string()).to_string()),
        )
    })
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(&SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn with_session_header(mut resp: Response, id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(id) {
        resp.headers_mut().insert(SESSION_HEADER, value);
    }
    resp
}

fn json_response<T: Serialize>(status: StatusCode, session: Option<&str>, body: &T) -> Response {
    let resp = (status, Json(body)).into_response();
    match session {
        Some(id) => with_session_header(resp, id),
        None => resp,
    }
}

fn rpc_error(status: StatusCode, id: Option<RpcId>, error: JsonRpcError) -> Response {
    json_response(status, None, &JsonRpcResponse::error(id, error))
}
