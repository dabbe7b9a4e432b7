//! Template rendering boundary.
//!
//! Templates are user-supplied files under `templates/` resolved by logical
//! name: `page` → `templates/page.html`, `index` → `templates/index.html`,
//! and so on for `home`, `cooking`, and `recipe`. Rendering is delegated to
//! [Tera](https://keats.github.io/tera/); this module maps logical names and
//! owns the engine instance for a build session.
//!
//! HTML fragments (page content, listings, breadcrumbs) are passed to
//! templates as strings; templates opt in to raw insertion with `| safe`.

use std::path::Path;
use tera::Tera;
use thiserror::Error;

pub use tera::Context;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template error: {0}")]
    Tera(#[from] tera::Error),
}

/// Tera engine loaded once from the site's `templates/` directory.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    /// Load every `.html` file under `templates_dir`.
    pub fn load(templates_dir: &Path) -> Result<Self, TemplateError> {
        let glob = format!("{}/**/*.html", templates_dir.display());
        Ok(Self {
            tera: Tera::new(&glob)?,
        })
    }

    /// Render the template with logical name `name` (e.g. `"page"`).
    pub fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        Ok(self.tera.render(&format!("{name}.html"), context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn renders_by_logical_name() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("page.html"), "<h1>{{ title }}</h1>").unwrap();

        let engine = TemplateEngine::load(tmp.path()).unwrap();
        let mut ctx = Context::new();
        ctx.insert("title", "Hello");

        assert_eq!(engine.render("page", &ctx).unwrap(), "<h1>Hello</h1>");
    }

    #[test]
    fn unknown_template_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("page.html"), "x").unwrap();

        let engine = TemplateEngine::load(tmp.path()).unwrap();
        assert!(engine.render("missing", &Context::new()).is_err());
    }

    #[test]
    fn safe_filter_passes_html_through() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("index.html"), "{{ content | safe }}").unwrap();

        let engine = TemplateEngine::load(tmp.path()).unwrap();
        let mut ctx = Context::new();
        ctx.insert("content", "<ul><li>x</li></ul>");

        assert_eq!(
            engine.render("index", &ctx).unwrap(),
            "<ul><li>x</li></ul>"
        );
    }
}
