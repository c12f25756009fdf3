//! Control endpoint request handlers

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{ConfigLoader, GeneralPatch, GeneralSettings};
use crate::controller::error::{ControllerError, ControllerResult};
use crate::engine::Engine;

/// Collaborators shared by all handlers
#[derive(Clone)]
pub struct ControllerState {
    pub engine: Arc<dyn Engine>,
    pub loader: Arc<dyn ConfigLoader>,
    /// File reloaded by `PUT /configs` when the request names none
    pub config_path: PathBuf,
    /// Serializes reloads with bootstrap and update calls
    pub guard: Arc<Mutex<()>>,
}

/// Body of `PUT /configs`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateConfigRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub payload: String,
}

pub async fn hello() -> Json<Value> {
    Json(json!({ "hello": "clash" }))
}

pub async fn version() -> Json<Value> {
    Json(json!({ "version": crate::VERSION }))
}

pub async fn get_configs(State(state): State<ControllerState>) -> Json<GeneralSettings> {
    Json(state.engine.general())
}

pub async fn patch_configs(
    State(state): State<ControllerState>,
    Json(patch): Json<GeneralPatch>,
) -> ControllerResult<StatusCode> {
    if patch.is_empty() {
        return Ok(StatusCode::NO_CONTENT);
    }

    state.engine.patch_general(&patch)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reload from an inline payload, a path, or the core's configuration file
pub async fn put_configs(
    State(state): State<ControllerState>,
    Json(request): Json<UpdateConfigRequest>,
) -> ControllerResult<StatusCode> {
    tokio::task::spawn_blocking(move || {
        let _guard = state.guard.lock().unwrap_or_else(PoisonError::into_inner);

        let config = if !request.payload.is_empty() {
            state.loader.parse_bytes(request.payload.as_bytes())
        } else if !request.path.is_empty() {
            state.loader.parse_path(&PathBuf::from(&request.path))
        } else {
            state.loader.parse_path(&state.config_path)
        }
        .map_err(|e| ControllerError::BadRequest(e.to_string()))?;

        state.engine.apply(config, false)?;
        log::info!("Configuration reloaded through the controller");
        Ok::<_, ControllerError>(())
    })
    .await
    .map_err(|e| ControllerError::Internal(e.to_string()))??;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_proxies(State(state): State<ControllerState>) -> Json<Value> {
    let mut proxies = Map::new();
    proxies.insert("DIRECT".to_string(), json!({ "name": "DIRECT", "type": "Direct" }));
    proxies.insert("REJECT".to_string(), json!({ "name": "REJECT", "type": "Reject" }));
    proxies.insert("GLOBAL".to_string(), json!({ "name": "GLOBAL", "type": "Selector" }));

    for proxy in state.engine.proxies() {
        proxies.insert(proxy.name.clone(), json!({ "name": proxy.name, "type": proxy.kind }));
    }

    Json(json!({ "proxies": proxies }))
}
