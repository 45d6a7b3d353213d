//! `apiextensions.k8s.io/v1` ConversionReview handling.

use axum::Json;
use kubebuild_core::convert;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

pub const CONVERSION_API_VERSION: &str = "apiextensions.k8s.io/v1";
pub const CONVERSION_KIND: &str = "ConversionReview";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionReview {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ConversionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ConversionResponse>,
}

fn default_api_version() -> String {
    CONVERSION_API_VERSION.into()
}
fn default_kind() -> String {
    CONVERSION_KIND.into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRequest {
    pub uid: String,
    #[serde(rename = "desiredAPIVersion")]
    pub desired_api_version: String,
    #[serde(default)]
    pub objects: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    pub uid: String,
    #[serde(default)]
    pub converted_objects: Vec<Value>,
    pub result: ConversionResult,
}

/// Convert every object in the request, or none of them.
pub fn convert_review(request: ConversionRequest) -> ConversionResponse {
    let uid = request.uid;
    let desired = request.desired_api_version;

    let converted: Result<Vec<Value>, _> = request
        .objects
        .into_iter()
        .map(|object| convert(object, &desired))
        .collect();

    match converted {
        Ok(converted_objects) => {
            tracing::debug!(%uid, %desired, count = converted_objects.len(), "converted Apps");
            ConversionResponse {
                uid,
                converted_objects,
                result: ConversionResult {
                    status: "Success".into(),
                    message: String::new(),
                },
            }
        }
        Err(e) => {
            tracing::warn!(%uid, %desired, error = %e, "conversion failed");
            ConversionResponse {
                uid,
                converted_objects: Vec::new(),
                result: ConversionResult {
                    status: "Failure".into(),
                    message: e.to_string(),
                },
            }
        }
    }
}

pub async fn convert_handler(
    Json(review): Json<ConversionReview>,
) -> Result<Json<ConversionReview>, ApiError> {
    let request = review
        .request
        .ok_or_else(|| ApiError::bad_request("ConversionReview has no request"))?;

    Ok(Json(ConversionReview {
        api_version: default_api_version(),
        kind: default_kind(),
        request: None,
        response: Some(convert_review(request)),
    }))
}
