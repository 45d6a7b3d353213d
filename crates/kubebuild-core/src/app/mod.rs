//! The `App` entity.
//!
//! `v1` is the hub: every `App` is stored in that shape and every other
//! version converts through it. `v2` adds the `enablePod` toggle, which the
//! hub carries as an annotation (see [`crate::conversion`]).

mod v1;
mod v2;

pub use v1::{AppSpecV1, AppV1};
pub use v2::{AppSpecV2, AppV2};

pub const API_GROUP: &str = "buildcrd.k8s.example.io";
pub const V1_API_VERSION: &str = "buildcrd.k8s.example.io/v1";
pub const V2_API_VERSION: &str = "buildcrd.k8s.example.io/v2";
pub const APP_KIND: &str = "App";

fn default_kind() -> String {
    APP_KIND.to_string()
}
