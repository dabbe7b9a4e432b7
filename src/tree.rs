//! The in-memory content tree.
//!
//! The builder walks `pages/` once and assembles every directory and document
//! into a single ordered tree that the render pass, the homepage aggregator,
//! and the breadcrumb generator all read from. The tree is built
//! single-threaded, sorted, and never mutated again.
//!
//! ## Arena representation
//!
//! Nodes live in one `Vec` inside [`Tree`] and reference each other by
//! [`NodeId`] index: children are owned `Vec<NodeId>` lists on the directory
//! variant, and the parent back-reference is a plain `Option<NodeId>`. This
//! keeps ownership a clean acyclic graph (no `Rc` cycles) while still giving
//! cheap upward traversal for breadcrumbs.
//!
//! ## Inclusion rules
//!
//! - Directories always become nodes and are recursed into.
//! - Only `.md` files become document nodes.
//! - A document whose frontmatter marks it `draft: true` (case-insensitive)
//!   is excluded entirely — not rendered, not listed.
//! - A malformed metadata block fails the whole build
//!   (see [`frontmatter`](crate::frontmatter)).
//!
//! ## Ordering
//!
//! Within a directory, children sort by `(order, prefixed name)` where the
//! name is prefixed `"0"` for directories and `"1"` for files, so directories
//! sort before files at equal name. The sort runs after each directory's
//! children are fully populated and is deterministic across builds.

use crate::frontmatter::{self, Document, FrontmatterError};
use chrono::{DateTime, Local};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Frontmatter(#[from] FrontmatterError),
}

/// Index of a node within its owning [`Tree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A directory or document in the content tree.
#[derive(Debug)]
pub struct Node {
    /// Display label: directory filename formatted, or frontmatter title.
    pub name: String,
    /// Output-relative path, slash-separated. Empty for the root.
    pub formatted_path: String,
    /// Source-relative path under `pages/`. Empty for the root.
    pub original_path: String,
    /// Explicit sort key (frontmatter `order`, default 0).
    pub order: i64,
    /// Back-reference for upward traversal. `None` only for the root.
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
}

/// The two node kinds. Closed set — matched exhaustively everywhere.
#[derive(Debug)]
pub enum NodeKind {
    Directory { children: Vec<NodeId> },
    File { document: Document, updated_on: String },
}

impl Node {
    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory { .. })
    }

    /// The wrapped document, for file nodes.
    pub fn document(&self) -> Option<&Document> {
        match &self.kind {
            NodeKind::Directory { .. } => None,
            NodeKind::File { document, .. } => Some(document),
        }
    }

    /// Comparison key implementing the directories-before-files rule.
    fn sort_name(&self) -> String {
        let prefix = if self.is_directory() { '0' } else { '1' };
        format!("{prefix}{}", self.name)
    }
}

/// The assembled content tree. Immutable once [`Tree::build`] returns.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Walk `pages_dir` and assemble the full, sorted tree.
    pub fn build(pages_dir: &Path) -> Result<Self, TreeError> {
        let mut tree = Self {
            nodes: vec![Node {
                name: "Home".to_string(),
                formatted_path: String::new(),
                original_path: String::new(),
                order: 0,
                parent: None,
                kind: NodeKind::Directory { children: vec![] },
            }],
        };
        let root = tree.root();
        tree.build_directory(root, pages_dir, pages_dir)?;
        Ok(tree)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Child ids of a directory node. Empty for file nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.nodes[id.0].kind {
            NodeKind::Directory { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    /// Ancestors of `id`, root first, excluding `id` itself.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.nodes[parent.0].parent;
        }
        chain.reverse();
        chain
    }

    /// All file nodes, in depth-first document order.
    pub fn files(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_files(self.root(), &mut out);
        out
    }

    fn collect_files(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            match self.nodes[child.0].kind {
                NodeKind::Directory { .. } => self.collect_files(child, out),
                NodeKind::File { .. } => out.push(child),
            }
        }
    }

    fn build_directory(
        &mut self,
        dir_id: NodeId,
        dir_path: &Path,
        pages_dir: &Path,
    ) -> Result<(), TreeError> {
        for entry in std::fs::read_dir(dir_path)? {
            let entry = entry?;
            let path = entry.path();
            let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
                continue;
            };

            let original_path = path
                .strip_prefix(pages_dir)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");

            if path.is_dir() {
                let child = self.attach(
                    dir_id,
                    Node {
                        name: format_display_name(&stem),
                        formatted_path: original_path.clone(),
                        original_path,
                        order: 0,
                        parent: Some(dir_id),
                        kind: NodeKind::Directory { children: vec![] },
                    },
                );
                self.build_directory(child, &path, pages_dir)?;
            } else if path.extension().is_some_and(|e| e == "md") {
                let document = frontmatter::parse_file(&path)?;
                if document.is_draft() {
                    continue;
                }
                let modified = std::fs::metadata(&path)?.modified()?;
                let updated_on = DateTime::<Local>::from(modified)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string();
                self.attach(
                    dir_id,
                    Node {
                        name: document.title().to_string(),
                        formatted_path: original_path.clone(),
                        original_path,
                        order: document.order(),
                        parent: Some(dir_id),
                        kind: NodeKind::File {
                            document,
                            updated_on,
                        },
                    },
                );
            }
        }

        self.sort_children(dir_id);
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        match &mut self.nodes[parent.0].kind {
            NodeKind::Directory { children } => children.push(id),
            NodeKind::File { .. } => unreachable!("files never own children"),
        }
        id
    }

    fn sort_children(&mut self, dir_id: NodeId) {
        let mut ids = match &mut self.nodes[dir_id.0].kind {
            NodeKind::Directory { children } => std::mem::take(children),
            NodeKind::File { .. } => return,
        };
        ids.sort_by_key(|id| {
            let node = &self.nodes[id.0];
            (node.order, node.sort_name())
        });
        match &mut self.nodes[dir_id.0].kind {
            NodeKind::Directory { children } => *children = ids,
            NodeKind::File { .. } => unreachable!(),
        }
    }
}

/// Format a filename stem for display: hyphens become spaces and each word
/// is capitalized. `braised-leeks` → "Braised Leeks".
pub fn format_display_name(stem: &str) -> String {
    stem.replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
