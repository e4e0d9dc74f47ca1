use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::info;

use super::SharedState;
use crate::error::{ProtocolError, ProtocolResult};
use crate::explorer::{Explorer, Variant};
use crate::storage::KeyValueStore;

/// Route a method call to its handler
pub async fn handle_method<S: KeyValueStore>(
    state: &SharedState<S>,
    method: &str,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let start = Instant::now();
    let mut guard = state.explorer.lock().await;
    let explorer = &mut *guard;

    let result = match method {
        "ping" => Ok(json!({})),
        // Tree and variant
        "tree.get" => Ok(json!({
            "variant": explorer.variant(),
            "tree": explorer.tree(),
        })),
        "variant.get" => Ok(json!({ "variant": explorer.variant() })),
        "variant.set" => handle_variant_set(explorer, params).await,
        // Sessions
        "session.list" => Ok(manager_view(explorer)),
        "session.create" => handle_session_create(explorer).await,
        "session.delete" => handle_session_delete(explorer, params).await,
        "session.switch" => handle_session_switch(explorer, params).await,
        "session.rename" => handle_session_rename(explorer, params).await,
        "session.reset" => handle_session_reset(explorer, params).await,
        // Nodes
        "node.select" => handle_node_select(explorer, params).await,
        "node.toggle_hint" => handle_node_toggle_hint(explorer, params).await,
        "node.toggle_tried" => handle_node_toggle_tried(explorer, params).await,
        "node.decide" => handle_node_decide(explorer, params).await,
        // Derived views
        "path.get" => handle_path_get(explorer),
        "levels.get" => Ok(levels_view(explorer)),
        _ => Err(ProtocolError::UnknownMethod {
            method: method.to_string(),
        }),
    };

    info!(
        method = %method,
        ok = result.is_ok(),
        latency_ms = start.elapsed().as_millis(),
        "Method handled"
    );
    result
}

#[derive(Deserialize)]
struct VariantParams {
    variant: String,
}

#[derive(Deserialize)]
struct SessionParams {
    session_id: String,
}

#[derive(Deserialize)]
struct RenameParams {
    session_id: String,
    name: String,
}

#[derive(Deserialize)]
struct ResetParams {
    confirm_variant: String,
}

#[derive(Deserialize)]
struct NodeParams {
    node_id: String,
}

#[derive(Deserialize)]
struct SelectParams {
    node_id: String,
    option_id: String,
}

#[derive(Deserialize)]
struct DecideParams {
    node_id: String,
    #[serde(default)]
    option_id: Option<String>,
}

fn parse_params<T: serde::de::DeserializeOwned>(
    method: &str,
    params: Option<Value>,
) -> ProtocolResult<T> {
    match params {
        Some(params) => {
            serde_json::from_value(params).map_err(|e| ProtocolError::InvalidParameters {
                method: method.to_string(),
                message: e.to_string(),
            })
        }
        None => Err(ProtocolError::InvalidParameters {
            method: method.to_string(),
            message: "Missing params".to_string(),
        }),
    }
}

fn parse_variant(method: &str, raw: &str) -> ProtocolResult<Variant> {
    raw.parse::<Variant>()
        .map_err(|message| ProtocolError::InvalidParameters {
            method: method.to_string(),
            message,
        })
}

fn refused(message: impl Into<String>) -> ProtocolError {
    ProtocolError::Refused {
        message: message.into(),
    }
}

/// Tabs of the current variant plus the active tab id
fn manager_view<S: KeyValueStore>(explorer: &Explorer<S>) -> Value {
    let manager = explorer.manager();
    json!({
        "variant": explorer.variant(),
        "tabs": explorer.sessions(),
        "activeTabId": manager.active_id(),
        "maxSessions": manager.max_sessions(),
    })
}

fn active_view<S: KeyValueStore>(explorer: &Explorer<S>) -> Value {
    json!({
        "variant": explorer.variant(),
        "session": explorer.active_session(),
    })
}

fn levels_view<S: KeyValueStore>(explorer: &Explorer<S>) -> Value {
    let levels: Vec<Value> = explorer
        .levels()
        .into_iter()
        .map(|(level, nodes)| json!({ "level": level, "nodes": nodes }))
        .collect();
    json!({ "levels": levels })
}

async fn handle_variant_set<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: VariantParams = parse_params("variant.set", params)?;
    let variant = parse_variant("variant.set", &params.variant)?;
    explorer.set_variant(variant).await;
    Ok(manager_view(explorer))
}

async fn handle_session_create<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
) -> ProtocolResult<Value> {
    let id = explorer.create_session().await.ok_or_else(|| {
        refused(format!(
            "Session limit of {} reached",
            explorer.manager().max_sessions()
        ))
    })?;
    let mut view = manager_view(explorer);
    view["sessionId"] = json!(id);
    Ok(view)
}

async fn handle_session_delete<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: SessionParams = parse_params("session.delete", params)?;
    if !explorer.delete_session(&params.session_id).await {
        return Err(refused(format!(
            "Cannot delete session {}: unknown or last remaining",
            params.session_id
        )));
    }
    Ok(manager_view(explorer))
}

async fn handle_session_switch<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: SessionParams = parse_params("session.switch", params)?;
    if !explorer.switch_session(&params.session_id).await {
        return Err(refused(format!("Unknown session: {}", params.session_id)));
    }
    Ok(active_view(explorer))
}

async fn handle_session_rename<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: RenameParams = parse_params("session.rename", params)?;
    if !explorer.rename_session(&params.session_id, &params.name).await {
        return Err(refused(format!(
            "Cannot rename session {}: unknown session or blank name",
            params.session_id
        )));
    }
    Ok(manager_view(explorer))
}

async fn handle_session_reset<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: ResetParams = parse_params("session.reset", params)?;
    let confirmed = parse_variant("session.reset", &params.confirm_variant)?;
    let active = explorer.variant();

    if !explorer.reset_active_variant(|_| confirmed == active).await {
        return Err(refused(format!(
            "Reset not confirmed: active variant is {}",
            active
        )));
    }
    Ok(manager_view(explorer))
}

async fn handle_node_select<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: SelectParams = parse_params("node.select", params)?;
    if !explorer.select_option(&params.node_id, &params.option_id).await {
        return Err(refused(format!("Unknown node: {}", params.node_id)));
    }
    Ok(active_view(explorer))
}

async fn handle_node_toggle_hint<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: NodeParams = parse_params("node.toggle_hint", params)?;
    let visible = explorer.toggle_hint(&params.node_id).await;
    Ok(json!({ "nodeId": params.node_id, "visible": visible }))
}

async fn handle_node_toggle_tried<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: NodeParams = parse_params("node.toggle_tried", params)?;
    let tried = explorer.toggle_tried(&params.node_id).await;
    Ok(json!({ "nodeId": params.node_id, "tried": tried }))
}

/// Refusals are reported in the result, not as errors: they are guarded no-ops.
async fn handle_node_decide<S: KeyValueStore>(
    explorer: &mut Explorer<S>,
    params: Option<Value>,
) -> ProtocolResult<Value> {
    let params: DecideParams = parse_params("node.decide", params)?;
    let outcome = explorer
        .decide(&params.node_id, params.option_id.as_deref())
        .await;

    let mut view = active_view(explorer);
    view["result"] = serde_json::to_value(&outcome)?;
    Ok(view)
}

fn handle_path_get<S: KeyValueStore>(explorer: &Explorer<S>) -> ProtocolResult<Value> {
    let steps = explorer.resolved_path();
    let completed = steps
        .last()
        .and_then(|step| step.option)
        .map(|option| option.is_completion())
        .unwrap_or(false);

    Ok(json!({
        "variant": explorer.variant(),
        "steps": serde_json::to_value(&steps)?,
        "completed": completed,
    }))
}
