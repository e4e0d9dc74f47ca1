//! Unit tests for JSON-RPC framing and the line loop.

use super::*;
use crate::explorer::{Explorer, PerVariant};
use crate::server::AppState;
use crate::storage::MemoryStore;
use crate::tree::{Node, NodeOption, Tree};
use serde_json::json;
use std::sync::Arc;

fn tree() -> Tree {
    Tree::new("t", "Test", "root")
        .with_node(
            Node::new("root", "Start").with_option(NodeOption::new("a", "Go").with_next("next")),
        )
        .with_node(Node::new("next", "Then"))
}

async fn server() -> RpcServer<MemoryStore> {
    let trees = PerVariant::new(tree(), tree());
    let explorer = Explorer::with_trees(trees, MemoryStore::new(), 10).await;
    RpcServer::new(Arc::new(AppState::new(explorer)))
}

fn request(value: Value) -> JsonRpcRequest {
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// JsonRpcResponse tests
// ============================================================================

#[test]
fn test_jsonrpc_response_success_with_id() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({"result": "ok"}));

    assert_eq!(response.jsonrpc, "2.0");
    assert_eq!(response.id, json!(1));
    assert!(response.error.is_none());
    assert_eq!(response.result.unwrap()["result"], "ok");
}

#[test]
fn test_jsonrpc_response_error_without_id() {
    let response = JsonRpcResponse::error(None, -32700, "Parse error");

    assert_eq!(response.id, Value::Null);
    assert!(response.result.is_none());
    assert_eq!(response.error.unwrap().code, -32700);
}

#[test]
fn test_jsonrpc_response_serialization_omits_error() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({"test": true}));
    let serialized = serde_json::to_string(&response).unwrap();

    assert!(serialized.contains("\"jsonrpc\":\"2.0\""));
    assert!(serialized.contains("\"id\":1"));
    assert!(!serialized.contains("\"error\""));
}

#[test]
fn test_request_params_default_to_none() {
    let req = request(json!({"jsonrpc": "2.0", "id": 1, "method": "ping"}));
    assert!(req.params.is_none());
    assert_eq!(req.method, "ping");
}

// ============================================================================
// Request handling
// ============================================================================

#[tokio::test]
async fn test_ping() {
    let server = server().await;
    let response = server
        .handle_request(request(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"})))
        .await
        .unwrap();

    assert_eq!(response.id, json!(7));
    assert_eq!(response.result, Some(json!({})));
}

#[tokio::test]
async fn test_notification_gets_no_response() {
    let server = server().await;
    let response = server
        .handle_request(request(json!({"jsonrpc": "2.0", "method": "session.create"})))
        .await;

    assert!(response.is_none());
}

#[tokio::test]
async fn test_unknown_method() {
    let server = server().await;
    let response = server
        .handle_request(request(json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})))
        .await
        .unwrap();

    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert!(error.message.contains("tools/list"));
}

#[tokio::test]
async fn test_wrong_version_rejected() {
    let server = server().await;
    let response = server
        .handle_request(request(json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})))
        .await
        .unwrap();

    assert_eq!(response.error.unwrap().code, -32600);
}

#[tokio::test]
async fn test_serve_lines() {
    let server = server().await;
    let input = concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"variant.get\"}\n",
        "\n",
        "not json\n",
        "{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"node.decide\",",
        "\"params\":{\"node_id\":\"root\",\"option_id\":\"a\"}}\n",
    );
    let mut output = Vec::new();

    server.serve(input.as_bytes(), &mut output).await.unwrap();

    let lines: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["result"]["variant"], "linux");
    assert_eq!(lines[1]["error"]["code"], -32700);
    assert_eq!(lines[1]["id"], Value::Null);
    assert_eq!(lines[2]["id"], 2);
    assert_eq!(lines[2]["result"]["result"]["outcome"], "expanded");
}
