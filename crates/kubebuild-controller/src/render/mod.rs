//! Resource rendering from templates.
//!
//! A template is YAML with `{{field.path}}` placeholders resolved against the
//! hub form of an App. String values go through `{{quote field "suffix"}}`,
//! which writes one escaped double-quoted scalar. Plain placeholders are
//! substituted verbatim. Rendering re-reads the template on every call; there
//! is no cache to invalidate.

mod renderer;
mod source;

pub use renderer::Renderer;
pub use source::{BuiltinTemplateSource, DirectoryTemplateSource, TemplateSource, template_name};

use kubebuild_core::ResourceKind;
use std::path::PathBuf;

/// Errors that can occur while rendering a dependent resource.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no template for {kind} in {location}")]
    TemplateNotFound { kind: ResourceKind, location: String },

    #[error("template error for {kind}: {message}")]
    Template { kind: ResourceKind, message: String },

    #[error("rendered {kind} is not valid: {message}")]
    Parse { kind: ResourceKind, message: String },

    #[error("failed to read template {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn parse(kind: ResourceKind, message: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TemplateNotFound { .. })
    }
}
