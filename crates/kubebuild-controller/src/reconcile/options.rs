use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_REQUEUE_AFTER: Duration = Duration::from_secs(3);
pub const DEFAULT_POD_GRACE_PERIOD_SECONDS: i64 = 10;
pub const DEFAULT_FIELD_MANAGER: &str = "app-resource-controller";

/// What to do when the App named by a trigger no longer exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingAppPolicy {
    /// Treat as a deleted App and finish successfully.
    Ignore,
    /// Return the fetch error to the caller.
    Propagate,
}

/// Named option sets. A process registers exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Dependent resources only.
    Minimal,
    /// Dependent resources, toggle sync and the failed pod sweep.
    #[default]
    Full,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Minimal => write!(f, "minimal"),
            Preset::Full => write!(f, "full"),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Preset::Minimal),
            "full" => Ok(Preset::Full),
            other => Err(format!("unknown controller preset '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub missing_app: MissingAppPolicy,
    /// Force `enableIngress` to follow `enableService` on the App itself.
    pub sync_toggles: bool,
    pub sweep_failed_pods: bool,
    pub requeue_after: Duration,
    pub pod_grace_period_seconds: i64,
    pub field_manager: String,
}

impl ReconcileOptions {
    pub fn minimal() -> Self {
        Self {
            missing_app: MissingAppPolicy::Propagate,
            sync_toggles: false,
            sweep_failed_pods: false,
            requeue_after: DEFAULT_REQUEUE_AFTER,
            pod_grace_period_seconds: DEFAULT_POD_GRACE_PERIOD_SECONDS,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        }
    }

    pub fn full() -> Self {
        Self {
            missing_app: MissingAppPolicy::Ignore,
            sync_toggles: true,
            sweep_failed_pods: true,
            ..Self::minimal()
        }
    }

    pub fn from_preset(preset: Preset) -> Self {
        match preset {
            Preset::Minimal => Self::minimal(),
            Preset::Full => Self::full(),
        }
    }

    pub fn with_requeue_after(mut self, requeue_after: Duration) -> Self {
        self.requeue_after = requeue_after;
        self
    }

    pub fn with_pod_grace_period(mut self, seconds: i64) -> Self {
        self.pod_grace_period_seconds = seconds;
        self
    }

    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self::full()
    }
}
