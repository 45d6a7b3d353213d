//! `admission.k8s.io/v1` AdmissionReview handling for v2 Apps.

use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kubebuild_core::{AppV2, ValidationError, apply_defaults, check, validate_update};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ApiError;

pub const ADMISSION_API_VERSION: &str = "admission.k8s.io/v1";
pub const ADMISSION_KIND: &str = "AdmissionReview";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReview {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

fn default_api_version() -> String {
    ADMISSION_API_VERSION.into()
}
fn default_kind() -> String {
    ADMISSION_KIND.into()
}

impl AdmissionReview {
    pub fn respond(response: AdmissionResponse) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            request: None,
            response: Some(response),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Connect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionRequest {
    pub uid: String,
    pub operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_object: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionStatus {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdmissionStatus>,
    /// Base64-encoded RFC 6902 patch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

impl AdmissionResponse {
    pub fn allowed(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            status: None,
            patch: None,
            patch_type: None,
        }
    }

    pub fn denied(uid: impl Into<String>, code: u16, reason: &str, message: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: false,
            status: Some(AdmissionStatus {
                code,
                message: message.into(),
                reason: Some(reason.to_string()),
            }),
            patch: None,
            patch_type: None,
        }
    }

    fn invalid(uid: &str, err: &ValidationError) -> Self {
        Self::denied(uid, 403, "Invalid", err.to_string())
    }
}

/// Decode the App carried by a request, filling the namespace from the request.
fn decode_app(object: &Value, request: &AdmissionRequest) -> Result<AppV2, String> {
    let mut app: AppV2 =
        serde_json::from_value(object.clone()).map_err(|e| format!("malformed App: {e}"))?;
    if app.metadata.namespace.is_empty() {
        if let Some(ns) = &request.namespace {
            app.metadata.namespace = ns.clone();
        }
    }
    if app.metadata.name.is_empty() {
        if let Some(name) = &request.name {
            app.metadata.name = name.clone();
        }
    }
    Ok(app)
}

/// Apply defaults and answer with the patch that produces them.
pub fn mutate(request: &AdmissionRequest) -> AdmissionResponse {
    let Some(original) = &request.object else {
        return AdmissionResponse::denied(&request.uid, 400, "BadRequest", "request has no object");
    };
    let mut app = match decode_app(original, request) {
        Ok(app) => app,
        Err(message) => return AdmissionResponse::denied(&request.uid, 400, "BadRequest", message),
    };

    apply_defaults(&mut app);

    // Only the defaulted fields are patched; everything else stays as sent
    let mut patched = original.clone();
    if original["spec"]["replicas"].as_i64() != Some(i64::from(app.spec.replicas)) {
        patched["spec"]["replicas"] = json!(app.spec.replicas);
    }
    if original["spec"]["image"].as_str() != Some(app.spec.image.as_str()) {
        patched["spec"]["image"] = json!(app.spec.image);
    }

    let patch = json_patch::diff(original, &patched);
    if patch.0.is_empty() {
        return AdmissionResponse::allowed(&request.uid);
    }

    let encoded = match serde_json::to_vec(&patch) {
        Ok(bytes) => STANDARD.encode(bytes),
        Err(e) => {
            return AdmissionResponse::denied(&request.uid, 500, "InternalError", e.to_string());
        }
    };
    tracing::debug!(uid = %request.uid, ops = patch.0.len(), "defaulted App");

    AdmissionResponse {
        patch: Some(encoded),
        patch_type: Some("JSONPatch".into()),
        ..AdmissionResponse::allowed(&request.uid)
    }
}

/// Check an App against its field constraints.
pub fn validate(request: &AdmissionRequest) -> AdmissionResponse {
    let decode = |object: &Option<Value>| -> Result<AppV2, AdmissionResponse> {
        let object = object.as_ref().ok_or_else(|| {
            AdmissionResponse::denied(&request.uid, 400, "BadRequest", "request has no object")
        })?;
        decode_app(object, request)
            .map_err(|message| AdmissionResponse::denied(&request.uid, 400, "BadRequest", message))
    };

    let result = match request.operation {
        Operation::Create => decode(&request.object).map(|app| check(&app)),
        Operation::Update => decode(&request.object).and_then(|new| {
            let old = decode(&request.old_object)?;
            let violations = validate_update(&old, &new);
            Ok(if violations.is_empty() {
                Ok(())
            } else {
                Err(ValidationError {
                    name: new.metadata.name.clone(),
                    violations,
                })
            })
        }),
        Operation::Delete | Operation::Connect => Ok(Ok(())),
    };

    match result {
        Ok(Ok(())) => AdmissionResponse::allowed(&request.uid),
        Ok(Err(err)) => AdmissionResponse::invalid(&request.uid, &err),
        Err(response) => response,
    }
}

pub async fn mutate_handler(
    Json(review): Json<AdmissionReview>,
) -> Result<Json<AdmissionReview>, ApiError> {
    let request = review
        .request
        .ok_or_else(|| ApiError::bad_request("AdmissionReview has no request"))?;
    Ok(Json(AdmissionReview::respond(mutate(&request))))
}

pub async fn validate_handler(
    Json(review): Json<AdmissionReview>,
) -> Result<Json<AdmissionReview>, ApiError> {
    let request = review
        .request
        .ok_or_else(|| ApiError::bad_request("AdmissionReview has no request"))?;
    let response = validate(&request);
    if !response.allowed {
        tracing::info!(uid = %request.uid, name = ?request.name, "App denied");
    }
    Ok(Json(AdmissionReview::respond(response)))
}
