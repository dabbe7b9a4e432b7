//! Photo gallery assembly.
//!
//! `static/cooking/` is a reserved flat folder of full-resolution source
//! photos. Assembly gives every photo a canonical identity — its capture
//! timestamp — and ensures two webp derivatives exist under the output's
//! `static/cooking/` tree (full-size, and `thumbnails/` square crops).
//!
//! Identity assignment mutates the source folder: a photo whose filename stem
//! is not already a plain timestamp gets its capture date read from embedded
//! metadata and is renamed to `<timestamp>.<ext>`. The rename is skipped when
//! the canonical name is already taken, and the folder is re-scanned after
//! renaming so the final listing reflects what is actually on disk.
//!
//! Derivative generation is deferred to the pipeline's image queue. The
//! gallery page itself renders only after those jobs join, because its
//! template links the derivative paths.

use crate::imaging::{BackendError, ImageBackend};
use crate::pipeline::{ImageJob, Pipeline};
use crate::templates::{Context, TemplateEngine};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported gallery source file: {0}")]
    UnsupportedSource(PathBuf),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Template(#[from] crate::templates::TemplateError),
}

/// One gallery entry as exposed to the `cooking` template. Paths are
/// site-root-relative.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GalleryImage {
    pub timestamp: i64,
    pub full: String,
    pub thumbnail: String,
}

/// Scan `source_dir`, canonicalize identities, and enqueue derivative jobs
/// for anything missing under `output_dir`.
///
/// Returns the full gallery listing, newest first, regardless of how much
/// work was queued. A missing `source_dir` yields an empty listing.
pub fn assemble(
    source_dir: &Path,
    output_dir: &Path,
    pipeline: &Pipeline,
    backend: &dyn ImageBackend,
) -> Result<Vec<GalleryImage>, GalleryError> {
    if !source_dir.is_dir() {
        return Ok(Vec::new());
    }

    assign_identities(source_dir, backend)?;

    let mut images: Vec<(i64, PathBuf)> = Vec::new();
    for (path, stem) in scan(source_dir)? {
        // A non-numeric stem after the identity pass means its rename was
        // skipped to avoid clobbering: a duplicate capture. Leave it out.
        let Ok(timestamp) = stem.parse::<i64>() else {
            continue;
        };
        images.push((timestamp, path));
    }
    images.sort_by_key(|(timestamp, _)| std::cmp::Reverse(*timestamp));

    let derivatives_dir = output_dir.join("static/cooking");
    let mut listing = Vec::with_capacity(images.len());
    for (timestamp, source) in images {
        let full = derivatives_dir.join(format!("{timestamp}.webp"));
        let thumbnail = derivatives_dir.join(format!("thumbnails/{timestamp}.webp"));

        let full_output = (!full.exists()).then(|| full.clone());
        let thumbnail_output = (!thumbnail.exists()).then(|| thumbnail.clone());
        if full_output.is_some() || thumbnail_output.is_some() {
            pipeline.image_jobs.push(ImageJob {
                source,
                full_output,
                thumbnail_output,
            });
        }

        listing.push(GalleryImage {
            timestamp,
            full: format!("static/cooking/{timestamp}.webp"),
            thumbnail: format!("static/cooking/thumbnails/{timestamp}.webp"),
        });
    }
    Ok(listing)
}

/// Render the gallery page. Call only after the image queue has joined.
pub fn render_page(
    images: &[GalleryImage],
    templates: &TemplateEngine,
    output_dir: &Path,
) -> Result<(), GalleryError> {
    let mut context = Context::new();
    context.insert("images", images);

    let html = templates.render("cooking", &context)?;
    let gallery_dir = output_dir.join("gallery");
    std::fs::create_dir_all(&gallery_dir)?;
    let output = gallery_dir.join("index.html");
    if crate::render::write_if_changed(&output, &html)? {
        println!("{}", output.display());
    }
    Ok(())
}

/// List source files as `(path, stem)` pairs, enforcing the extension
/// whitelist. Subdirectories are ignored.
fn scan(source_dir: &Path) -> Result<Vec<(PathBuf, String)>, GalleryError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(source_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            continue;
        }
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(GalleryError::UnsupportedSource(path));
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        entries.push((path, stem));
    }
    Ok(entries)
}

/// Rename every non-timestamp source to its capture timestamp.
fn assign_identities(source_dir: &Path, backend: &dyn ImageBackend) -> Result<(), GalleryError> {
    for (path, stem) in scan(source_dir)? {
        if stem.parse::<i64>().is_ok() {
            continue;
        }
        let timestamp = backend.capture_timestamp(&path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let target = source_dir.join(format!("{timestamp}.{extension}"));
        // Never clobber an existing canonical file.
        if target.exists() {
            continue;
        }
        std::fs::rename(&path, &target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::tests::{MockBackend, RecordedOp};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        source: PathBuf,
        output: PathBuf,
    }

    fn fixture() -> Fixture {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("static/cooking");
        let output = tmp.path().join("dist");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&output).unwrap();
        Fixture {
            _tmp: tmp,
            source,
            output,
        }
    }

    #[test]
    fn missing_source_directory_is_an_empty_gallery() {
        let f = fixture();
        let pipeline = Pipeline::new();
        let backend = MockBackend::new();
        let images = assemble(
            &f.source.join("nope"),
            &f.output,
            &pipeline,
            &backend,
        )
        .unwrap();
        assert!(images.is_empty());
        assert!(pipeline.image_jobs.is_empty());
    }

    #[test]
    fn numeric_stems_skip_metadata_extraction() {
        let f = fixture();
        fs::write(f.source.join("1700000000.jpg"), "jpg").unwrap();

        let pipeline = Pipeline::new();
        let backend = MockBackend::new();
        let images = assemble(&f.source, &f.output, &pipeline, &backend).unwrap();

        assert_eq!(images.len(), 1);
        assert_eq!(images[0].timestamp, 1700000000);
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn non_numeric_sources_are_renamed_to_capture_timestamp() {
        let f = fixture();
        fs::write(f.source.join("holiday.jpg"), "a").unwrap();
        fs::write(f.source.join("dinner.png"), "b").unwrap();

        let pipeline = Pipeline::new();
        let backend = MockBackend::with_timestamps(vec![
            (f.source.join("holiday.jpg"), 1700000100),
            (f.source.join("dinner.png"), 1700000200),
        ]);
        let images = assemble(&f.source, &f.output, &pipeline, &backend).unwrap();

        assert!(f.source.join("1700000100.jpg").exists());
        assert!(f.source.join("1700000200.png").exists());
        assert!(!f.source.join("holiday.jpg").exists());

        // Newest first, one record per image.
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].timestamp, 1700000200);
        assert_eq!(images[1].timestamp, 1700000100);
    }

    #[test]
    fn rename_skipped_when_canonical_name_taken() {
        let f = fixture();
        fs::write(f.source.join("1700000100.jpg"), "canonical").unwrap();
        fs::write(f.source.join("duplicate.jpg"), "dupe").unwrap();

        let pipeline = Pipeline::new();
        let backend =
            MockBackend::with_timestamps(vec![(f.source.join("duplicate.jpg"), 1700000100)]);
        let images = assemble(&f.source, &f.output, &pipeline, &backend).unwrap();

        // The duplicate keeps its name and is excluded from the listing; the
        // canonical file is untouched.
        assert!(f.source.join("duplicate.jpg").exists());
        assert_eq!(
            fs::read_to_string(f.source.join("1700000100.jpg")).unwrap(),
            "canonical"
        );
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].timestamp, 1700000100);
    }

    #[test]
    fn unsupported_extension_is_fatal() {
        let f = fixture();
        fs::write(f.source.join("clip.gif"), "x").unwrap();

        let pipeline = Pipeline::new();
        let backend = MockBackend::new();
        let err = assemble(&f.source, &f.output, &pipeline, &backend).unwrap_err();
        match err {
            GalleryError::UnsupportedSource(path) => {
                assert!(path.ends_with("clip.gif"));
            }
            other => panic!("expected unsupported source, got {other:?}"),
        }
    }

    #[test]
    fn jobs_enqueued_only_for_missing_derivatives() {
        let f = fixture();
        fs::write(f.source.join("100.jpg"), "a").unwrap();
        fs::write(f.source.join("200.jpg"), "b").unwrap();

        // 200 already has both derivatives; 100 has only the full size.
        let derivatives = f.output.join("static/cooking");
        fs::create_dir_all(derivatives.join("thumbnails")).unwrap();
        fs::write(derivatives.join("200.webp"), "w").unwrap();
        fs::write(derivatives.join("thumbnails/200.webp"), "w").unwrap();
        fs::write(derivatives.join("100.webp"), "w").unwrap();

        let pipeline = Pipeline::new();
        let backend = MockBackend::new();
        let images = assemble(&f.source, &f.output, &pipeline, &backend).unwrap();

        assert_eq!(images.len(), 2);
        let job = pipeline.image_jobs.try_pop().expect("one job for 100");
        assert!(job.source.ends_with("100.jpg"));
        assert!(job.full_output.is_none());
        assert!(job.thumbnail_output.is_some());
        assert!(pipeline.image_jobs.try_pop().is_none());
        // join() must not wait on the popped-but-unacked job in later use.
        pipeline.image_jobs.ack();
    }

    #[test]
    fn listing_paths_are_site_relative() {
        let f = fixture();
        fs::write(f.source.join("100.jpg"), "a").unwrap();

        let pipeline = Pipeline::new();
        let backend = MockBackend::new();
        let images = assemble(&f.source, &f.output, &pipeline, &backend).unwrap();

        assert_eq!(images[0].full, "static/cooking/100.webp");
        assert_eq!(images[0].thumbnail, "static/cooking/thumbnails/100.webp");
    }

    #[test]
    fn renders_gallery_page_after_join() {
        let f = fixture();
        let templates_dir = f._tmp.path().join("templates");
        fs::create_dir_all(&templates_dir).unwrap();
        fs::write(
            templates_dir.join("cooking.html"),
            "{% for i in images %}<img src=\"/{{ i.thumbnail }}\">{% endfor %}",
        )
        .unwrap();

        let templates = TemplateEngine::load(&templates_dir).unwrap();
        let images = vec![GalleryImage {
            timestamp: 100,
            full: "static/cooking/100.webp".to_string(),
            thumbnail: "static/cooking/thumbnails/100.webp".to_string(),
        }];
        render_page(&images, &templates, &f.output).unwrap();

        let html = fs::read_to_string(f.output.join("gallery/index.html")).unwrap();
        assert!(html.contains("<img src=\"/static/cooking/thumbnails/100.webp\">"));
    }
}
