//! Namespaced App API serving the v2 view over hub-form storage.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use kubebuild_core::{
    AppV1, AppV2, ObjectKey, V2_API_VERSION, apply_defaults, check, downgrade, upgrade,
};
use kubebuild_storage::{ListParams, StoreExt, UpdateOptions};
use serde_json::{Value, json};

use crate::error::ApiError;
use crate::state::AppState;

pub const APPS_PATH: &str = "/apis/buildcrd.k8s.example.io/v2/namespaces/{namespace}/apps";
pub const APP_PATH: &str = "/apis/buildcrd.k8s.example.io/v2/namespaces/{namespace}/apps/{name}";

/// Decode a PUT body, filling namespace and name from the path.
fn app_from_body(body: Value, key: &ObjectKey) -> Result<AppV2, ApiError> {
    let mut app: AppV2 = serde_json::from_value(body)
        .map_err(|e| ApiError::bad_request(format!("malformed App: {e}")))?;

    if app.api_version != V2_API_VERSION {
        return Err(ApiError::bad_request(format!(
            "apiVersion must be {V2_API_VERSION}, got {}",
            app.api_version
        )));
    }

    let meta = &mut app.metadata;
    if meta.namespace.is_empty() {
        meta.namespace = key.namespace.clone();
    }
    if meta.name.is_empty() {
        meta.name = key.name.clone();
    }
    if meta.key() != *key {
        return Err(ApiError::bad_request(format!(
            "object {} does not match request path {key}",
            meta.key()
        )));
    }
    Ok(app)
}

/// Create or replace an App.
pub async fn put_app(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<AppV2>), ApiError> {
    let key = ObjectKey::new(namespace, name);
    let mut app = app_from_body(body, &key)?;

    apply_defaults(&mut app);
    check(&app)?;

    let mut hub = upgrade(&app);
    let existing = state.store.try_get_as::<AppV1>(&key).await?;

    let (status, stored) = match existing {
        None => {
            let stored = state.store.create_typed(&hub).await?;
            tracing::info!(app = %key, "App created");
            (StatusCode::CREATED, stored)
        }
        Some(current) => {
            if hub.metadata.resource_version.is_none() {
                hub.metadata.resource_version = current.metadata.resource_version.clone();
            }
            let options =
                UpdateOptions::with_field_manager(state.config.controller.field_manager.clone());
            let stored = state.store.update_typed(&hub, &options).await?;
            tracing::info!(app = %key, "App updated");
            (StatusCode::OK, stored)
        }
    };

    state.controller.enqueue(key).await;
    Ok((status, Json(downgrade(&stored))))
}

pub async fn get_app(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<AppV2>, ApiError> {
    let key = ObjectKey::new(namespace, name);
    let hub = state.store.get_as::<AppV1>(&key).await?;
    Ok(Json(downgrade(&hub)))
}

pub async fn list_apps(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let items: Vec<AppV2> = state
        .store
        .list_as::<AppV1>(&namespace, &ListParams::new())
        .await?
        .iter()
        .map(downgrade)
        .collect();

    Ok(Json(json!({
        "apiVersion": V2_API_VERSION,
        "kind": "AppList",
        "items": items,
    })))
}
