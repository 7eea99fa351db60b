//! Integration tests for the note tools and the per-session handler.
//!
//! Tests exercise the handler functions directly with an in-memory store,
//! and verify the full dispatch flow for tool calls.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{tool_context, MemoryStore};
use mcp_note_bridge::handlers::{self, NoteHandler};
use mcp_note_bridge::protocol::{
    DeleteNoteParams, JsonRpcRequest, ListNotesParams, ReadNoteParams, RpcId, ToolResult,
    WriteNoteParams,
};
use mcp_note_bridge::session::SessionTransport;
use serde_json::{json, Value};

fn text_json(result: &ToolResult) -> Value {
    serde_json::from_str(&result.content[0].text).unwrap()
}

fn error_code(result: &ToolResult) -> String {
    assert!(result.is_error, "expected a tool error");
    text_json(result)["error"]["code"].as_str().unwrap().to_string()
}

fn request(id: i64, method: &str, params: Option<Value>) -> JsonRpcRequest {
    JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: Some(RpcId::Number(id)),
        method: method.into(),
        params,
    }
}

fn initialize() -> JsonRpcRequest {
    request(
        0,
        "initialize",
        Some(json!({
            "protocolVersion": "2025-03-26",
            "clientInfo": { "name": "test-agent", "version": "1.0" }
        })),
    )
}

async fn initialized_handler(store: Arc<MemoryStore>) -> (NoteHandler, SessionTransport) {
    let transport = SessionTransport::new();
    let mut handler = NoteHandler::new(tool_context(store), transport.notifier());
    let resp = handler.handle(&initialize()).await.unwrap();
    assert!(!resp.is_error());
    (handler, transport)
}

// ---------------------------------------------------------------------------
// list_notes tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_notes_only_reports_markdown() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    store.put("image.png", "binary", 2);
    store.put_with_perm("b.md", "beta", 3, "r");
    let ctx = tool_context(store);

    let result = handlers::list_notes::handle(ListNotesParams::default(), &ctx).await;
    assert!(!result.is_error);

    let value = text_json(&result);
    assert_eq!(
        value["notes"],
        json!([
            { "name": "a.md", "permission": "read-write" },
            { "name": "b.md", "permission": "read-only" }
        ])
    );
}

#[tokio::test]
async fn list_notes_content_filter_skips_unreadable_notes() {
    let store = MemoryStore::new();
    store.put("a.md", "contains TODO item", 1);
    store.put("b.md", "done", 2);
    store.put("c.md", "TODO too", 3);
    store.fail_reads_of("c.md");
    let ctx = tool_context(store);

    let params = ListNotesParams {
        content_filter: Some("todo".into()),
        ..Default::default()
    };
    let result = handlers::list_notes::handle(params, &ctx).await;
    assert!(!result.is_error, "per-note failures must not fail the listing");

    let value = text_json(&result);
    assert_eq!(value["notes"], json!([{ "name": "a.md", "permission": "read-write" }]));
    assert_eq!(value["errors"][0]["filename"], "c.md");
}

// ---------------------------------------------------------------------------
// single-note tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn read_note_reads_directly_by_default() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    let ctx = tool_context(store.clone());

    let params = ReadNoteParams {
        name: "a".into(),
        use_cache: false,
    };
    let result = handlers::read_note::handle(params, &ctx).await;
    assert_eq!(text_json(&result), json!({ "name": "a.md", "content": "alpha" }));
    assert_eq!(store.list_calls(), 0);
    assert!(ctx.cache.is_empty().await);
}

#[tokio::test]
async fn read_note_missing_is_not_found() {
    let ctx = tool_context(MemoryStore::new());
    let params = ReadNoteParams {
        name: "ghost.md".into(),
        use_cache: false,
    };
    let result = handlers::read_note::handle(params, &ctx).await;
    assert_eq!(error_code(&result), "note_not_found");
}

#[tokio::test]
async fn create_note_appends_suffix_and_refuses_duplicates() {
    let store = MemoryStore::new();
    let ctx = tool_context(store.clone());

    let params = WriteNoteParams {
        name: "journal".into(),
        content: "day one".into(),
    };
    let result = handlers::create_note::handle(params.clone(), &ctx).await;
    assert!(!result.is_error);
    assert_eq!(text_json(&result)["name"], "journal.md");
    assert_eq!(store.content_of("journal.md").as_deref(), Some("day one"));

    let again = handlers::create_note::handle(params, &ctx).await;
    assert_eq!(error_code(&again), "note_exists");
    assert_eq!(store.write_calls(), 1);
}

#[tokio::test]
async fn update_note_requires_existing_writable_note() {
    let store = MemoryStore::new();
    store.put("rw.md", "old", 1);
    store.put_with_perm("ro.md", "locked", 2, "r");
    let ctx = tool_context(store.clone());

    let update = |name: &str| WriteNoteParams {
        name: name.into(),
        content: "new".into(),
    };

    let ok = handlers::update_note::handle(update("rw.md"), &ctx).await;
    assert!(!ok.is_error);
    assert_eq!(store.content_of("rw.md").as_deref(), Some("new"));

    let missing = handlers::update_note::handle(update("nope.md"), &ctx).await;
    assert_eq!(error_code(&missing), "note_not_found");

    let read_only = handlers::update_note::handle(update("ro.md"), &ctx).await;
    assert_eq!(error_code(&read_only), "read_only");
    assert_eq!(store.content_of("ro.md").as_deref(), Some("locked"));
}

#[tokio::test]
async fn delete_note_removes_writable_note() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    store.put_with_perm("ro.md", "locked", 2, "r");
    let ctx = tool_context(store.clone());

    let result = handlers::delete_note::handle(DeleteNoteParams { name: "a.md".into() }, &ctx).await;
    assert_eq!(text_json(&result)["status"], "deleted");
    assert!(store.content_of("a.md").is_none());

    let ro = handlers::delete_note::handle(DeleteNoteParams { name: "ro.md".into() }, &ctx).await;
    assert_eq!(error_code(&ro), "read_only");
}

// ---------------------------------------------------------------------------
// Dispatch integration tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn requests_before_initialize_are_rejected() {
    let transport = SessionTransport::new();
    let mut handler = NoteHandler::new(tool_context(MemoryStore::new()), transport.notifier());

    let resp = handler.handle(&request(1, "tools/list", None)).await.unwrap();
    assert_eq!(resp.error.unwrap().code, -32600);
    assert!(!handler.is_initialized());

    let notification = JsonRpcRequest {
        jsonrpc: "2.0".into(),
        id: None,
        method: "notifications/initialized".into(),
        params: None,
    };
    assert!(handler.handle(&notification).await.is_none());
}

#[tokio::test]
async fn initialize_records_client_and_capabilities() {
    let (handler, _transport) = initialized_handler(MemoryStore::new()).await;
    assert!(handler.is_initialized());
    assert_eq!(handler.client().unwrap().name.as_deref(), Some("test-agent"));
}

#[tokio::test]
async fn dispatch_tools_list_advertises_all_tools() {
    let (mut handler, _transport) = initialized_handler(MemoryStore::new()).await;

    let response = handler.handle(&request(1, "tools/list", None)).await.unwrap();
    let result = response.result.unwrap();
    let tools = result["tools"].as_array().unwrap();

    let tool_names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    for expected in [
        "list_notes",
        "read_note",
        "create_note",
        "update_note",
        "delete_note",
        "search_notes",
    ] {
        assert!(tool_names.contains(&expected), "Should advertise {expected}");
    }
    assert_eq!(tools.len(), 6, "Should advertise exactly 6 tools");
}

#[tokio::test]
async fn dispatch_search_via_tools_call() {
    let store = MemoryStore::new();
    store.put("a.md", "Foo bar\nbaz foo", 1);
    let (mut handler, _transport) = initialized_handler(store).await;

    let req = request(
        2,
        "tools/call",
        Some(json!({
            "name": "search_notes",
            "arguments": { "query": "foo", "search_type": "content" }
        })),
    );
    let response = handler.handle(&req).await.unwrap();
    let result = response.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();

    assert_eq!(parsed["totalResults"], 1);
    assert_eq!(parsed["results"][0]["score"], 2);
    assert_eq!(parsed["results"][0]["matches"][1]["lineNumber"], 2);
}

#[tokio::test]
async fn tool_argument_schema_is_enforced() {
    let (mut handler, _transport) = initialized_handler(MemoryStore::new()).await;

    let req = request(
        3,
        "tools/call",
        Some(json!({ "name": "read_note", "arguments": { "use_cache": true } })),
    );
    let response = handler.handle(&req).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let err: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(err["error"]["code"], "invalid_arguments");
}

#[tokio::test]
async fn store_failure_is_a_tool_error_not_a_protocol_error() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    store.fail_reads_of("a.md");
    let (mut handler, _transport) = initialized_handler(store).await;

    let req = request(
        4,
        "tools/call",
        Some(json!({ "name": "read_note", "arguments": { "name": "a.md" } })),
    );
    let response = handler.handle(&req).await.unwrap();
    assert!(response.error.is_none());
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    assert!(handler.is_initialized(), "handler state survives tool failures");
}

#[tokio::test]
async fn create_and_delete_notify_resource_listeners() {
    let (mut handler, transport) = initialized_handler(MemoryStore::new()).await;
    let mut events = transport.subscribe();

    let create = request(
        5,
        "tools/call",
        Some(json!({ "name": "create_note", "arguments": { "name": "x", "content": "y" } })),
    );
    handler.handle(&create).await.unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event["method"], "notifications/resources/list_changed");
}

#[tokio::test]
async fn resources_list_and_read() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    let (mut handler, _transport) = initialized_handler(store.clone()).await;

    let list = handler.handle(&request(6, "resources/list", None)).await.unwrap();
    let resources = list.result.unwrap()["resources"].clone();
    assert_eq!(resources[0]["uri"], "note:///a.md");

    let read = request(7, "resources/read", Some(json!({ "uri": "note:///a.md" })));
    let resp = handler.handle(&read).await.unwrap();
    assert_eq!(resp.result.unwrap()["contents"][0]["text"], "alpha");

    let bad = request(8, "resources/read", Some(json!({ "uri": "file:///etc/passwd" })));
    let resp = handler.handle(&bad).await.unwrap();
    assert_eq!(resp.error.unwrap().code, -32602);
}

#[tokio::test]
async fn unknown_method_and_bad_version() {
    let (mut handler, _transport) = initialized_handler(MemoryStore::new()).await;

    let resp = handler.handle(&request(9, "does/not/exist", None)).await.unwrap();
    assert_eq!(resp.error.unwrap().code, -32601);

    let mut old = request(10, "ping", None);
    old.jsonrpc = "1.0".into();
    let resp = handler.handle(&old).await.unwrap();
    assert_eq!(resp.error.unwrap().code, -32600);
}

#[tokio::test]
async fn unknown_tool_uses_the_structured_error_shape() {
    let (mut handler, _transport) = initialized_handler(MemoryStore::new()).await;

    let req = request(
        11,
        "tools/call",
        Some(json!({ "name": "rename_note", "arguments": {} })),
    );
    let response = handler.handle(&req).await.unwrap();
    let result = response.result.unwrap();
    assert_eq!(result["isError"], true);
    let err: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(err["error"]["code"], "invalid_arguments");
    assert!(err["error"]["message"].as_str().unwrap().contains("rename_note"));
}

#[tokio::test(start_paused = true)]
async fn slow_store_calls_run_to_completion() {
    let store = MemoryStore::new();
    store.put("a.md", "alpha", 1);
    store.delay_reads(Duration::from_secs(300));
    let (mut handler, _transport) = initialized_handler(store.clone()).await;

    let req = request(
        12,
        "tools/call",
        Some(json!({ "name": "search_notes", "arguments": { "query": "alpha", "search_type": "content" } })),
    );
    let response = handler.handle(&req).await.unwrap();
    let result = response.result.unwrap();
    assert!(result.get("isError").is_none(), "a slow search is not cut short");
    let page: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(page["totalResults"], 1);
    assert_eq!(store.read_calls(), 1);
}
