//! Template Resolution and Rendering
//!
//! Each document type owns a directory of HTML templates:
//! `header.html`, `footer.html`, `entrant<class>.html` and the generic
//! `entrant.html`.

use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const HEADER_TEMPLATE: &str = "header.html";
pub const FOOTER_TEMPLATE: &str = "footer.html";
pub const GENERIC_TEMPLATE: &str = "entrant.html";

const CERTIFICATES: &str = "certs";

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Template not found: {0}")]
    NotFound(PathBuf),

    #[error("Malformed template {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Render failed for {path}: {message}")]
    Render { path: PathBuf, message: String },
}

/// The `-doc` selector: disclaimers (`legal`), receipt logs (`rlogs`),
/// certificates (`certs`) or any other template directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentType(String);

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn certificates() -> Self {
        Self::new(CERTIFICATES)
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// Certificates are printed once per named person.
    pub fn is_certificates(&self) -> bool {
        self.0 == CERTIFICATES
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps a class to its template file, falling back to the generic one.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    dir: PathBuf,
}

impl TemplateResolver {
    pub fn new(root: &Path, doc: &DocumentType) -> Self {
        Self { dir: root.join(doc.name()) }
    }

    pub fn header(&self) -> PathBuf {
        self.dir.join(HEADER_TEMPLATE)
    }

    pub fn footer(&self) -> PathBuf {
        self.dir.join(FOOTER_TEMPLATE)
    }

    pub fn category_template(&self, category: i64) -> PathBuf {
        self.dir.join(format!("entrant{category}.html"))
    }

    pub fn generic_template(&self) -> PathBuf {
        self.dir.join(GENERIC_TEMPLATE)
    }

    /// `None` when neither the class template nor the generic one exists.
    pub fn resolve(&self, category: i64) -> Option<PathBuf> {
        [self.category_template(category), self.generic_template()]
            .into_iter()
            .find(|path| path.is_file())
    }
}

/// Renders a template file against a JSON context.
pub trait TemplateEngine {
    fn render(&self, template: &Path, data: &serde_json::Value) -> Result<String, TemplateError>;
}

/// Handlebars-backed engine; each file is parsed once and cached by path.
pub struct HandlebarsEngine {
    registry: RefCell<Handlebars<'static>>,
}

impl HandlebarsEngine {
    pub fn new() -> Self {
        Self { registry: RefCell::new(Handlebars::new()) }
    }

    fn ensure_registered(&self, template: &Path) -> Result<String, TemplateError> {
        let name = template.to_string_lossy().into_owned();
        if self.registry.borrow().has_template(&name) {
            return Ok(name);
        }
        if !template.is_file() {
            return Err(TemplateError::NotFound(template.to_path_buf()));
        }
        self.registry
            .borrow_mut()
            .register_template_file(&name, template)
            .map_err(|e| TemplateError::Malformed {
                path: template.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(name)
    }
}

impl TemplateEngine for HandlebarsEngine {
    fn render(&self, template: &Path, data: &serde_json::Value) -> Result<String, TemplateError> {
        let name = self.ensure_registered(template)?;
        self.registry
            .borrow()
            .render(&name, data)
            .map_err(|e| TemplateError::Render {
                path: template.to_path_buf(),
                message: e.to_string(),
            })
    }
}

impl Default for HandlebarsEngine {
    fn default() -> Self {
        Self::new()
    }
}
