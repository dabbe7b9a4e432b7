//! Build orchestration: one `SiteBuilder` per build run.
//!
//! The input root contains `pages/`, `templates/`, and `static/`; the output
//! root receives the rendered mirror. A build session owns the pipeline and
//! worker pool for its duration:
//!
//! 1. assemble the content tree (single-threaded),
//! 2. spawn the worker pool,
//! 3. render all pages and indexes (PDF jobs enqueue as recipes are found),
//! 4. render the homepage,
//! 5. copy `static/` (except the reserved `cooking/` gallery source),
//! 6. assemble the gallery, join its image jobs, render the gallery page,
//! 7. join the PDF queue, signal stop, drain the workers,
//! 8. fail the build if any job failed.
//!
//! No partial-success mode: the first recorded job failure makes the whole
//! run exit non-zero, though files already written stay on disk.

use crate::gallery::{self, GalleryError};
use crate::imaging::{ImageBackend, MagickBackend};
use crate::pdf::{PdfBackend, TypstBackend};
use crate::pipeline::{JobFailure, Pipeline, WorkerContext, WorkerPool};
use crate::render::{RenderError, Renderer};
use crate::templates::{TemplateEngine, TemplateError};
use crate::tree::{Tree, TreeError};
use crate::{freshness, homepage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error("{} artifact job(s) failed; first: {}: {}",
        .0.len(), .0[0].path.display(), .0[0].detail)]
    Jobs(Vec<JobFailure>),
}

pub struct SiteBuilder {
    pages_dir: PathBuf,
    templates_dir: PathBuf,
    static_dir: PathBuf,
    output_dir: PathBuf,
    force: bool,
    workers: usize,
}

impl SiteBuilder {
    pub fn new(input_dir: &Path, output_dir: &Path, force: bool) -> Self {
        Self {
            pages_dir: input_dir.join("pages"),
            templates_dir: input_dir.join("templates"),
            static_dir: input_dir.join("static"),
            output_dir: output_dir.to_path_buf(),
            force,
            workers: WorkerPool::default_size(),
        }
    }

    /// Run a full build with the production backends (Typst, ImageMagick).
    pub fn build(&self) -> Result<(), BuildError> {
        self.build_with_backends(Arc::new(TypstBackend), Arc::new(MagickBackend))
    }

    /// Run a full build with injected backends.
    pub fn build_with_backends(
        &self,
        pdf_backend: Arc<dyn PdfBackend>,
        image_backend: Arc<dyn ImageBackend>,
    ) -> Result<(), BuildError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let tree = Tree::build(&self.pages_dir)?;
        let templates = TemplateEngine::load(&self.templates_dir)?;

        let pipeline = Arc::new(Pipeline::new());
        let pool = WorkerPool::spawn(
            Arc::clone(&pipeline),
            self.workers,
            WorkerContext {
                output_dir: self.output_dir.clone(),
                pdf_backend,
                image_backend: Arc::clone(&image_backend),
            },
        );

        let result = self.run_phases(&tree, &templates, &pipeline, image_backend.as_ref());

        // Workers must always be drained, even on a failed render pass,
        // or their threads outlive the session.
        pipeline.pdf_jobs.join();
        pipeline.image_jobs.join();
        pipeline.stop();
        pool.join();
        result?;

        let failures = pipeline.take_failures();
        if !failures.is_empty() {
            return Err(BuildError::Jobs(failures));
        }
        Ok(())
    }

    fn run_phases(
        &self,
        tree: &Tree,
        templates: &TemplateEngine,
        pipeline: &Pipeline,
        image_backend: &dyn ImageBackend,
    ) -> Result<(), BuildError> {
        Renderer::new(
            tree,
            templates,
            pipeline,
            &self.pages_dir,
            &self.output_dir,
            self.force,
        )
        .render_tree()?;

        homepage::render(tree, templates, &self.output_dir)?;
        self.copy_static()?;

        let gallery_source = self.static_dir.join("cooking");
        if gallery_source.is_dir() {
            let images =
                gallery::assemble(&gallery_source, &self.output_dir, pipeline, image_backend)?;
            // The gallery template links derivative paths, so they must
            // exist before the page renders.
            pipeline.image_jobs.join();
            gallery::render_page(&images, templates, &self.output_dir)?;
        }

        pipeline.pdf_jobs.join();
        Ok(())
    }

    /// Copy `static/` into the output, skipping the reserved gallery source.
    /// Unchanged files are left alone so their mtimes survive rebuilds.
    fn copy_static(&self) -> Result<(), BuildError> {
        if !self.static_dir.is_dir() {
            return Ok(());
        }
        let cooking = self.static_dir.join("cooking");
        let target_root = self.output_dir.join("static");

        for entry in WalkDir::new(&self.static_dir) {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            if entry.path().starts_with(&cooking) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.static_dir)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            let target = target_root.join(relative);
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(&target)?;
            } else if freshness::should_rebuild(entry.path(), &target, self.force)? {
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::copy(entry.path(), &target)?;
                println!("{}", target.display());
            }
        }
        Ok(())
    }
}
