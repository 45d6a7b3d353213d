//! Admission rules for `App` objects.
//!
//! Defaulting runs first, then validation. The reconciler trusts that both
//! have run and never re-validates.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::app::{API_GROUP, APP_KIND, AppV2};

pub const DEFAULT_REPLICAS: i32 = 2;
pub const DEFAULT_IMAGE: &str = "nginx:latest";
pub const MIN_REPLICAS: i32 = 1;
pub const MAX_REPLICAS: i32 = 2;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub path: String,
    pub value: Value,
    pub message: String,
}

impl FieldViolation {
    pub fn invalid(path: impl Into<String>, value: impl Into<Value>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: Invalid value: {}: {}", self.path, self.value, self.message)
    }
}

/// All violations found on one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub name: String,
    pub violations: Vec<FieldViolation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{APP_KIND}.{API_GROUP} \"{}\" is invalid: ", self.name)?;
        let details: Vec<String> = self.violations.iter().map(|v| v.to_string()).collect();
        write!(f, "[{}]", details.join(", "))
    }
}

impl std::error::Error for ValidationError {}

/// Fill unset fields with their defaults.
pub fn apply_defaults(app: &mut AppV2) {
    tracing::debug!(name = %app.metadata.name, "defaulting App");

    if app.spec.replicas == 0 {
        app.spec.replicas = DEFAULT_REPLICAS;
    }

    if app.spec.image.is_empty() {
        app.spec.image = DEFAULT_IMAGE.to_string();
    }
}

/// Check an App against its field constraints.
pub fn validate(app: &AppV2) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if !(MIN_REPLICAS..=MAX_REPLICAS).contains(&app.spec.replicas) {
        violations.push(FieldViolation::invalid(
            "spec.replicas",
            app.spec.replicas,
            format!("replicas must be between {MIN_REPLICAS} to {MAX_REPLICAS}"),
        ));
    }

    if app.spec.image.is_empty() {
        violations.push(FieldViolation::invalid(
            "spec.image",
            app.spec.image.as_str(),
            "image must be specified",
        ));
    }

    violations
}

/// Update validation applies the same rules to the new object.
pub fn validate_update(_old: &AppV2, new: &AppV2) -> Vec<FieldViolation> {
    validate(new)
}

/// [`validate`] folded into a `Result`.
///
/// # Errors
///
/// Returns a `ValidationError` listing every violation.
pub fn check(app: &AppV2) -> Result<(), ValidationError> {
    let violations = validate(app);
    if violations.is_empty() {
        return Ok(());
    }

    tracing::info!(
        name = %app.metadata.name,
        violations = violations.len(),
        "App rejected"
    );
    Err(ValidationError {
        name: app.metadata.name.clone(),
        violations,
    })
}
