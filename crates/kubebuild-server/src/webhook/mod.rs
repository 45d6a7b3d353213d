//! Webhook endpoints called by the API server: admission (defaulting and
//! validation of v2 Apps) and version conversion.

pub mod admission;
pub mod conversion;

pub const MUTATE_PATH: &str = "/mutate-buildcrd-k8s-example-io-v2-app";
pub const VALIDATE_PATH: &str = "/validate-buildcrd-k8s-example-io-v2-app";
pub const CONVERT_PATH: &str = "/convert";
