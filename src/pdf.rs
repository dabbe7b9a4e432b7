//! Printable recipe cards via Typst.
//!
//! Each recipe page gets a companion PDF, typeset from a generated Typst
//! document and compiled with the `typst` CLI. The [`PdfBackend`] trait is the
//! seam: the production [`TypstBackend`] shells out, the test mock records
//! calls and writes a stub file, so the pipeline and renderer are testable
//! without Typst installed.
//!
//! Output is reproducible: the source document's modification time is passed
//! through as `SOURCE_DATE_EPOCH`, so rebuilding an unchanged recipe yields a
//! byte-identical PDF.

use crate::recipe::Recipe;
use std::fmt::Write as _;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Typesetting failed for {title}: {detail}")]
    CompileFailed { title: String, detail: String },
    #[error("typst executable not found; install it or check PATH")]
    TypstMissing,
}

/// Typesetting knobs, fixed per build.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub main_font: String,
    pub heading_font: String,
    /// Unix timestamp stamped into the PDF as its creation date.
    pub source_date_epoch: u64,
}

impl PdfOptions {
    pub fn new(source_date_epoch: u64) -> Self {
        Self {
            main_font: "Source Serif Pro".to_string(),
            heading_font: "Source Sans Pro".to_string(),
            source_date_epoch,
        }
    }
}

/// Trait for PDF typesetting backends.
///
/// Implementations must be `Send + Sync`: jobs are executed from pipeline
/// worker threads sharing one backend instance.
pub trait PdfBackend: Send + Sync {
    /// Typeset `recipe` and write the PDF to `output`.
    fn render(&self, recipe: &Recipe, options: &PdfOptions, output: &Path) -> Result<(), PdfError>;
}

/// Production backend driving the `typst` CLI.
///
/// The generated `.typ` source is written next to the output, compiled, and
/// removed again on success or failure.
pub struct TypstBackend;

impl PdfBackend for TypstBackend {
    fn render(&self, recipe: &Recipe, options: &PdfOptions, output: &Path) -> Result<(), PdfError> {
        let source_path = output.with_extension("typ");
        std::fs::write(&source_path, typst_source(recipe, options))?;

        let result = Command::new("typst")
            .arg("compile")
            .arg(&source_path)
            .arg(output)
            .env("SOURCE_DATE_EPOCH", options.source_date_epoch.to_string())
            .output();

        // Best effort; a leftover .typ is harmless but untidy.
        let _ = std::fs::remove_file(&source_path);

        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PdfError::TypstMissing);
            }
            Err(e) => return Err(e.into()),
        };

        if !out.status.success() {
            return Err(PdfError::CompileFailed {
                title: recipe.title.clone(),
                detail: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

/// Generate the Typst document for a recipe.
fn typst_source(recipe: &Recipe, options: &PdfOptions) -> String {
    let mut doc = String::new();
    let _ = writeln!(doc, "#set page(margin: 2cm)");
    let _ = writeln!(
        doc,
        "#set document(title: \"{}\")",
        escape_string(&recipe.title)
    );
    let _ = writeln!(
        doc,
        "#set text(font: \"{}\", size: 11pt)",
        escape_string(&options.main_font)
    );
    let _ = writeln!(
        doc,
        "#show heading: set text(font: \"{}\")",
        escape_string(&options.heading_font)
    );
    let _ = writeln!(doc);
    let _ = writeln!(doc, "= {}", escape_markup(&recipe.title));

    if let Some(description) = &recipe.description {
        let _ = writeln!(doc, "\n{}", escape_markup(description));
    }

    let _ = writeln!(doc, "\n== Ingredients");
    for group in &recipe.ingredient_groups {
        if let Some(name) = &group.name {
            let _ = writeln!(doc, "\n=== {}", escape_markup(name));
        }
        for entry in &group.entries {
            let _ = writeln!(doc, "- {}", escape_markup(entry));
        }
    }

    let _ = writeln!(doc, "\n== Instructions");
    for group in &recipe.instruction_groups {
        if let Some(name) = &group.name {
            let _ = writeln!(doc, "\n=== {}", escape_markup(name));
        }
        for entry in &group.entries {
            let _ = writeln!(doc, "+ {}", escape_markup(entry));
        }
    }

    if !recipe.notes.is_empty() {
        let _ = writeln!(doc, "\n== Notes");
        for note in &recipe.notes {
            let _ = writeln!(doc, "\n{}", escape_markup(note));
        }
    }

    doc
}

/// Escape for use inside a Typst string literal.
fn escape_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Escape Typst markup metacharacters in body text.
fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '#' | '*' | '_' | '[' | ']' | '$' | '@' | '<' | '>' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::recipe::Group;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Mock backend that records render calls and writes a stub PDF.
    #[derive(Default)]
    pub struct MockBackend {
        pub rendered: Mutex<Vec<(String, PathBuf)>>,
        pub fail_titles: Vec<String>,
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_on(titles: &[&str]) -> Self {
            Self {
                rendered: Mutex::new(Vec::new()),
                fail_titles: titles.iter().map(|t| t.to_string()).collect(),
            }
        }

        pub fn get_rendered(&self) -> Vec<(String, PathBuf)> {
            self.rendered.lock().unwrap().clone()
        }
    }

    impl PdfBackend for MockBackend {
        fn render(
            &self,
            recipe: &Recipe,
            _options: &PdfOptions,
            output: &Path,
        ) -> Result<(), PdfError> {
            self.rendered
                .lock()
                .unwrap()
                .push((recipe.title.clone(), output.to_path_buf()));
            if self.fail_titles.contains(&recipe.title) {
                return Err(PdfError::CompileFailed {
                    title: recipe.title.clone(),
                    detail: "mock failure".to_string(),
                });
            }
            std::fs::write(output, b"%PDF-stub")?;
            Ok(())
        }
    }

    fn sample() -> Recipe {
        Recipe {
            title: "Pan Pizza".to_string(),
            description: Some("No stand mixer needed.".to_string()),
            ingredient_groups: vec![
                Group {
                    name: Some("Dough".to_string()),
                    entries: vec!["500g flour".to_string(), "350g water".to_string()],
                },
                Group {
                    name: Some("Topping".to_string()),
                    entries: vec!["crushed tomatoes".to_string()],
                },
            ],
            instruction_groups: vec![Group {
                name: None,
                entries: vec!["Mix.".to_string(), "Proof overnight.".to_string()],
            }],
            notes: vec!["Cast iron works best.".to_string()],
        }
    }

    #[test]
    fn source_carries_fonts_and_sections() {
        let src = typst_source(&sample(), &PdfOptions::new(0));
        assert!(src.contains("#set text(font: \"Source Serif Pro\""));
        assert!(src.contains("#show heading: set text(font: \"Source Sans Pro\")"));
        assert!(src.contains("= Pan Pizza"));
        assert!(src.contains("== Ingredients"));
        assert!(src.contains("=== Dough"));
        assert!(src.contains("- 500g flour"));
        assert!(src.contains("== Instructions"));
        assert!(src.contains("+ Proof overnight."));
        assert!(src.contains("== Notes"));
    }

    #[test]
    fn markup_metacharacters_are_escaped() {
        let mut recipe = sample();
        recipe.ingredient_groups[0].entries = vec!["2 cups flour *unsifted* #1 brand".to_string()];
        let src = typst_source(&recipe, &PdfOptions::new(0));
        assert!(src.contains("- 2 cups flour \\*unsifted\\* \\#1 brand"));
    }

    #[test]
    fn title_quotes_are_escaped_in_metadata() {
        let mut recipe = sample();
        recipe.title = "The \"Best\" Pizza".to_string();
        let src = typst_source(&recipe, &PdfOptions::new(0));
        assert!(src.contains("#set document(title: \"The \\\"Best\\\" Pizza\")"));
    }

    #[test]
    fn mock_records_and_writes_stub() {
        let tmp = tempfile::TempDir::new().unwrap();
        let out = tmp.path().join("pizza.pdf");
        let backend = MockBackend::new();

        backend
            .render(&sample(), &PdfOptions::new(1700000000), &out)
            .unwrap();

        assert_eq!(backend.get_rendered(), vec![("Pan Pizza".to_string(), out.clone())]);
        assert!(out.exists());
    }

    #[test]
    fn mock_failure_is_reported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::failing_on(&["Pan Pizza"]);
        let err = backend
            .render(&sample(), &PdfOptions::new(0), &tmp.path().join("p.pdf"))
            .unwrap_err();
        assert!(matches!(err, PdfError::CompileFailed { .. }));
    }
}
