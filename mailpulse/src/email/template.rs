//! Named email templates
//!
//! Templates are minijinja files looked up by name under the configured
//! template directory. The caller's context is exposed to the template under
//! the single key `data`, so `{{ data.name }}` reads the `name` field.

use minijinja::{context, path_loader, Environment, ErrorKind};
use serde_json::Value;
use std::path::Path;
use tracing::error;

use super::EmailError;

/// Template lookup and rendering
#[derive(Debug)]
pub struct TemplateStore {
    env: Environment<'static>,
}

impl TemplateStore {
    /// Load templates lazily from `template_dir`
    ///
    /// Files are read on first use, so a missing directory only surfaces as
    /// [`EmailError::TemplateNotFound`] at render time.
    #[must_use]
    pub fn from_dir(template_dir: impl AsRef<Path>) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(template_dir.as_ref()));
        Self { env }
    }

    /// Build a store from in-memory `(name, source)` pairs
    ///
    /// # Errors
    ///
    /// Returns [`EmailError::Render`] if a source does not parse.
    pub fn from_sources<I>(sources: I) -> Result<Self, EmailError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut env = Environment::new();
        for (name, source) in sources {
            env.add_template_owned(name.clone(), source).map_err(|e| {
                error!(template = %name, error = ?e, "Failed to parse email template");
                EmailError::Render
            })?;
        }
        Ok(Self { env })
    }

    /// Render `template_name` with `context` bound to `data`
    ///
    /// # Errors
    ///
    /// - [`EmailError::Validation`] for an empty name
    /// - [`EmailError::TemplateNotFound`] when no such template exists
    /// - [`EmailError::Render`] for any other failure, logged in full
    pub fn render(&self, template_name: &str, context: &Value) -> Result<String, EmailError> {
        if template_name.trim().is_empty() {
            return Err(EmailError::validation("template name is required"));
        }

        let template = self.env.get_template(template_name).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                EmailError::TemplateNotFound(template_name.to_string())
            } else {
                error!(template = %template_name, error = ?e, "Failed to load email template");
                EmailError::Render
            }
        })?;

        template.render(context! { data => context }).map_err(|e| {
            error!(template = %template_name, error = ?e, "Failed to render email template");
            EmailError::Render
        })
    }
}
