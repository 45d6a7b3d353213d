use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use kubebuild_core::{AppV1, Resource, ResourceKind};
use serde_json::Value;
use std::sync::Arc;

use super::RenderError;
use super::source::{BuiltinTemplateSource, TemplateSource, template_name};

/// `{{quote a b ...}}`: joins its arguments and writes them as one
/// double-quoted scalar, so names like `123` or `true` stay strings.
fn quote(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let mut joined = String::new();
    for param in h.params() {
        match param.value() {
            Value::String(s) => joined.push_str(s),
            other => joined.push_str(&other.to_string()),
        }
    }
    // JSON string escapes are valid inside a YAML double-quoted scalar
    out.write(&Value::String(joined).to_string())?;
    Ok(())
}

/// Renders dependent resource definitions for an App.
#[derive(Clone)]
pub struct Renderer {
    source: Arc<dyn TemplateSource>,
    handlebars: Arc<Handlebars<'static>>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("source", &self.source.describe())
            .finish()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Arc::new(BuiltinTemplateSource))
    }
}

impl Renderer {
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        let mut handlebars = Handlebars::new();
        // A missing field is a template bug, not an empty string
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.register_helper("quote", Box::new(quote));
        Self {
            source,
            handlebars: Arc::new(handlebars),
        }
    }

    pub fn source(&self) -> &dyn TemplateSource {
        self.source.as_ref()
    }

    /// Render the `kind` definition for `app` as a JSON object.
    ///
    /// # Errors
    ///
    /// - `TemplateNotFound` / `Io` if the template cannot be loaded
    /// - `Template` if substitution fails
    /// - `Parse` if the output is not a YAML mapping of the requested kind
    pub fn render(&self, kind: ResourceKind, app: &AppV1) -> Result<Value, RenderError> {
        let template = self.source.load(kind)?;
        let context = serde_json::to_value(app).map_err(|e| RenderError::Template {
            kind,
            message: e.to_string(),
        })?;

        let rendered = self
            .handlebars
            .render_template(&template, &context)
            .map_err(|e| RenderError::Template {
                kind,
                message: e.to_string(),
            })?;

        let object: Value = serde_yaml::from_str(&rendered)
            .map_err(|e| RenderError::parse(kind, e.to_string()))?;

        if !object.is_object() {
            return Err(RenderError::parse(kind, "expected a mapping at the top level"));
        }
        match object.get("kind").and_then(Value::as_str) {
            Some(found) if found == kind.as_str() => {}
            Some(found) => {
                return Err(RenderError::parse(
                    kind,
                    format!("template {} produced kind {found}", template_name(kind)),
                ));
            }
            None => return Err(RenderError::parse(kind, "missing kind field")),
        }

        tracing::trace!(kind = %kind, app = %app.metadata.key(), "rendered resource");
        Ok(object)
    }

    /// Render and decode into a typed resource.
    pub fn render_as<T: Resource>(&self, app: &AppV1) -> Result<T, RenderError> {
        let object = self.render(T::KIND, app)?;
        T::from_value(object).map_err(|e| RenderError::parse(T::KIND, e.to_string()))
    }
}
