//! Homepage aggregation.
//!
//! The homepage is the root `index.html`, rendered once after the tree pass.
//! It lists only the top-level sections that contain at least one featured
//! document anywhere below them; a section with no featured content is left
//! off the homepage entirely. Each qualifying section also carries a flag for
//! whether its direct documents are a mix of featured and non-featured, which
//! templates use for styling.

use crate::render::RenderError;
use crate::templates::{Context, TemplateEngine};
use crate::tree::{NodeId, NodeKind, Tree};
use serde::Serialize;
use std::path::Path;

/// A top-level section as exposed to the `home` template.
#[derive(Debug, Serialize, PartialEq)]
pub struct HomeSection {
    pub name: String,
    /// Output-relative path of the section directory.
    pub path: String,
    /// True when the section's direct documents mix featured and
    /// non-featured entries.
    pub mixed: bool,
}

/// Collect the sections that qualify for the homepage, in tree order.
pub fn sections(tree: &Tree) -> Vec<HomeSection> {
    tree.children(tree.root())
        .iter()
        .filter_map(|&id| {
            let node = tree.node(id);
            if !node.is_directory() || !has_featured(tree, id) {
                return None;
            }
            Some(HomeSection {
                name: node.name.clone(),
                path: node.formatted_path.clone(),
                mixed: direct_children_mixed(tree, id),
            })
        })
        .collect()
}

/// Render the homepage into `<output_dir>/index.html`.
pub fn render(
    tree: &Tree,
    templates: &TemplateEngine,
    output_dir: &Path,
) -> Result<(), RenderError> {
    let mut context = Context::new();
    context.insert("sections", &sections(tree));

    let html = templates.render("home", &context)?;
    let output = output_dir.join("index.html");
    if crate::render::write_if_changed(&output, &html)? {
        println!("{}", output.display());
    }
    Ok(())
}

/// Does any document at or below `id` carry the featured flag?
fn has_featured(tree: &Tree, id: NodeId) -> bool {
    tree.children(id).iter().any(|&child| {
        let node = tree.node(child);
        match &node.kind {
            NodeKind::Directory { .. } => has_featured(tree, child),
            NodeKind::File { document, .. } => document.is_featured(),
        }
    })
}

/// Do the *direct* documents of `id` mix featured and non-featured?
fn direct_children_mixed(tree: &Tree, id: NodeId) -> bool {
    let mut saw_featured = false;
    let mut saw_plain = false;
    for &child in tree.children(id) {
        if let NodeKind::File { document, .. } = &tree.node(child).kind {
            if document.is_featured() {
                saw_featured = true;
            } else {
                saw_plain = true;
            }
        }
    }
    saw_featured && saw_plain
}
