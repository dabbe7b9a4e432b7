//! HTML render pass over the content tree.
//!
//! Depth-first walk: each directory's output folder is created, its children
//! rendered first, then its index page; each document is rendered through its
//! frontmatter-selected template if the staleness check warrants it.
//!
//! Recipe-templated documents are split work: the HTML page renders
//! synchronously here, while the companion PDF is enqueued as a pipeline job
//! and typeset by the worker pool. The PDF path baked into the page is
//! therefore a promise that the post-join build fulfils.
//!
//! Every written file is reported on stdout, one path per line.

use crate::frontmatter::Document;
use crate::pipeline::{PdfJob, Pipeline};
use crate::templates::{Context, TemplateEngine};
use crate::tree::{Node, NodeId, NodeKind, Tree};
use crate::{freshness, markdown, recipe};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Template(#[from] crate::templates::TemplateError),
    #[error("Failed to parse recipe: {0}")]
    RecipeParse(PathBuf),
    #[error("Malformed metadata file {path}: {source}")]
    BadMeta {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Write `contents` only if the file is missing or differs, so an unchanged
/// rebuild leaves mtimes alone. Returns whether a write happened.
///
/// Index, homepage, and gallery pages have no single source to compare
/// mtimes against, so they render every run and rely on this instead.
pub(crate) fn write_if_changed(path: &Path, contents: &str) -> std::io::Result<bool> {
    if let Ok(existing) = std::fs::read(path) {
        if existing == contents.as_bytes() {
            return Ok(false);
        }
    }
    std::fs::write(path, contents)?;
    Ok(true)
}

/// Optional per-directory metadata, from `meta.json` alongside the documents.
#[derive(Debug, Default, serde::Deserialize)]
struct DirectoryMeta {
    #[serde(default)]
    description: String,
}

/// One render pass over the tree. Borrows the session's shared pieces and is
/// discarded when the pass completes.
pub struct Renderer<'a> {
    tree: &'a Tree,
    templates: &'a TemplateEngine,
    pipeline: &'a Pipeline,
    pages_dir: &'a Path,
    output_dir: &'a Path,
    force: bool,
}

impl<'a> Renderer<'a> {
    pub fn new(
        tree: &'a Tree,
        templates: &'a TemplateEngine,
        pipeline: &'a Pipeline,
        pages_dir: &'a Path,
        output_dir: &'a Path,
        force: bool,
    ) -> Self {
        Self {
            tree,
            templates,
            pipeline,
            pages_dir,
            output_dir,
            force,
        }
    }

    /// Render every directory index and document page. The root's own index
    /// is the homepage, rendered separately after this pass.
    pub fn render_tree(&self) -> Result<(), RenderError> {
        for &child in self.tree.children(self.tree.root()) {
            self.render_node(child)?;
        }
        Ok(())
    }

    fn render_node(&self, id: NodeId) -> Result<(), RenderError> {
        let node = self.tree.node(id);
        match &node.kind {
            NodeKind::Directory { children } => {
                let dir_path = self.output_dir.join(&node.formatted_path);
                std::fs::create_dir_all(&dir_path)?;
                for &child in children {
                    self.render_node(child)?;
                }
                self.render_index(id, node, &dir_path)
            }
            NodeKind::File {
                document,
                updated_on,
            } => {
                let source = self.pages_dir.join(&node.original_path);
                let output = self
                    .output_dir
                    .join(&node.formatted_path)
                    .with_extension("html");
                if !freshness::should_rebuild(&source, &output, self.force)? {
                    return Ok(());
                }
                self.render_page(id, node, document, updated_on, &output)
            }
        }
    }

    // =========================================================================
    // Index pages
    // =========================================================================

    fn render_index(&self, id: NodeId, node: &Node, dir_path: &Path) -> Result<(), RenderError> {
        let meta = self.directory_meta(node)?;

        let mut context = Context::new();
        context.insert("title", &node.name);
        context.insert("content", &self.listing(id));
        context.insert("breadcrumbs", &self.breadcrumbs(id));
        context.insert("description", &meta.description);

        let html = self.templates.render("index", &context)?;
        let output = dir_path.join("index.html");
        if write_if_changed(&output, &html)? {
            println!("{}", output.display());
        }
        Ok(())
    }

    fn directory_meta(&self, node: &Node) -> Result<DirectoryMeta, RenderError> {
        let path = self.pages_dir.join(&node.original_path).join("meta.json");
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|source| RenderError::BadMeta { path, source })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DirectoryMeta::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Nested `<ul>` listing of a directory's contents. Featured documents
    /// get a `featured` class, subtitles a trailing span.
    fn listing(&self, id: NodeId) -> String {
        let mut html = String::from("<ul>");
        for &child_id in self.tree.children(id) {
            let child = self.tree.node(child_id);
            match &child.kind {
                NodeKind::Directory { .. } => {
                    html.push_str(&format!(
                        "<li class=\"dir\"><h2><a href=\"/{}/index.html\">{}</a></h2>{}</li>",
                        child.formatted_path,
                        child.name,
                        self.listing(child_id)
                    ));
                }
                NodeKind::File { document, .. } => {
                    let page_path = child.formatted_path.replace(".md", ".html");
                    let class = if document.is_featured() {
                        " class=\"featured\""
                    } else {
                        ""
                    };
                    html.push_str(&format!(
                        "<li{class}><a href=\"/{page_path}\">{}</a>",
                        child.name
                    ));
                    if let Some(subtitle) = document.frontmatter.get("subtitle") {
                        html.push_str(&format!("<span>{subtitle}</span>"));
                    }
                    html.push_str("</li>");
                }
            }
        }
        html.push_str("</ul>");
        html
    }

    /// Ancestor links joined with a separator, ending in the node's own name.
    fn breadcrumbs(&self, id: NodeId) -> String {
        let mut parts: Vec<String> = self
            .tree
            .ancestors(id)
            .iter()
            .map(|&ancestor_id| {
                let ancestor = self.tree.node(ancestor_id);
                format!(
                    "<a href=\"/{}\">{}</a>",
                    ancestor.formatted_path, ancestor.name
                )
            })
            .collect();
        parts.push(self.tree.node(id).name.clone());
        parts.join(" <span class=\"separator\">/</span> ")
    }

    // =========================================================================
    // Document pages
    // =========================================================================

    fn render_page(
        &self,
        id: NodeId,
        node: &Node,
        document: &Document,
        updated_on: &str,
        output: &Path,
    ) -> Result<(), RenderError> {
        let template_name = document.template();

        let mut context = Context::new();
        for (key, value) in &document.frontmatter {
            context.insert(key, value);
        }
        context.insert("breadcrumbs", &self.breadcrumbs(id));
        context.insert("updated_on", updated_on);

        if template_name == "recipe" {
            self.prepare_recipe(node, document, updated_on, &mut context)?;
        } else {
            context.insert("content", &markdown::to_html(&document.body));
        }

        let html = self.templates.render(template_name, &context)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, html)?;
        println!("{}", output.display());
        Ok(())
    }

    /// Parse the recipe, enqueue its PDF job, and extend the template context.
    fn prepare_recipe(
        &self,
        node: &Node,
        document: &Document,
        updated_on: &str,
        context: &mut Context,
    ) -> Result<(), RenderError> {
        let parsed = recipe::parse(&document.body)
            .ok_or_else(|| RenderError::RecipeParse(PathBuf::from(&node.original_path)))?;

        let pdf_path = PathBuf::from(format!(
            "static/{}",
            node.formatted_path.replace(".md", ".pdf")
        ));
        let source_date_epoch = NaiveDateTime::parse_from_str(updated_on, "%Y-%m-%d %H:%M:%S")
            .map(|t| t.and_utc().timestamp().max(0) as u64)
            .unwrap_or(0);

        self.pipeline.pdf_jobs.push(PdfJob {
            recipe: parsed.clone(),
            pdf_path: pdf_path.clone(),
            source_date_epoch,
        });

        context.insert("recipe", &parsed);
        context.insert("pdf_path", &pdf_path.to_string_lossy());
        Ok(())
    }

}
