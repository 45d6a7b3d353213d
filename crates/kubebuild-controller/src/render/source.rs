use kubebuild_core::ResourceKind;
use std::path::{Path, PathBuf};

use super::RenderError;

/// File stem of the template for `kind`, e.g. `deployment`.
pub fn template_name(kind: ResourceKind) -> String {
    kind.as_str().to_ascii_lowercase()
}

/// Where templates come from.
pub trait TemplateSource: Send + Sync {
    /// Returns the raw template text for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::TemplateNotFound` if no template exists for `kind`.
    fn load(&self, kind: ResourceKind) -> Result<String, RenderError>;

    /// Human-readable location, used in logs and errors.
    fn describe(&self) -> String;
}

/// Templates compiled into the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplateSource;

const DEPLOYMENT_TEMPLATE: &str = include_str!("../../templates/deployment.yaml");
const SERVICE_TEMPLATE: &str = include_str!("../../templates/service.yaml");
const INGRESS_TEMPLATE: &str = include_str!("../../templates/ingress.yaml");

impl TemplateSource for BuiltinTemplateSource {
    fn load(&self, kind: ResourceKind) -> Result<String, RenderError> {
        let text = match kind {
            ResourceKind::Deployment => DEPLOYMENT_TEMPLATE,
            ResourceKind::Service => SERVICE_TEMPLATE,
            ResourceKind::Ingress => INGRESS_TEMPLATE,
            ResourceKind::App | ResourceKind::Pod => {
                return Err(RenderError::TemplateNotFound {
                    kind,
                    location: self.describe(),
                });
            }
        };
        Ok(text.to_string())
    }

    fn describe(&self) -> String {
        "built-in templates".to_string()
    }
}

/// Templates read from `<dir>/<kind>.yaml` on every load.
#[derive(Debug, Clone)]
pub struct DirectoryTemplateSource {
    dir: PathBuf,
}

impl DirectoryTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, kind: ResourceKind) -> PathBuf {
        self.dir.join(format!("{}.yaml", template_name(kind)))
    }
}

impl TemplateSource for DirectoryTemplateSource {
    fn load(&self, kind: ResourceKind) -> Result<String, RenderError> {
        let path = self.path_for(kind);
        std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                RenderError::TemplateNotFound {
                    kind,
                    location: self.describe(),
                }
            } else {
                RenderError::Io { path, source }
            }
        })
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
