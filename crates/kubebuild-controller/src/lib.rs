//! # kubebuild-controller
//!
//! Keeps the dependents of every `App` converged with its desired state.
//!
//! - [`render`]: template-driven definitions for Deployment, Service and
//!   Ingress
//! - [`reconcile`]: the per-App reconciliation engine
//! - [`runtime`]: work queue, workers and periodic resync that trigger it

pub mod error;
pub mod reconcile;
pub mod render;
pub mod runtime;

pub use error::{ReconcileError, Result};
pub use reconcile::{
    Action, MissingAppPolicy, Preset, Reconcile, ReconcileOptions, ReconcileReport, Reconciler,
    Step, StepOutcome,
};
pub use render::{
    BuiltinTemplateSource, DirectoryTemplateSource, RenderError, Renderer, TemplateSource,
};
pub use runtime::{Controller, ControllerConfig, ControllerHandle};
