//! # Griddle
//!
//! A static site generator for a personal cooking site. Markdown documents
//! under `pages/` become an ordered content tree mirrored into HTML output;
//! recipe pages additionally get a typeset PDF, and a photo gallery gets
//! timestamp-canonical filenames plus webp derivatives.
//!
//! # Architecture: One Pass, Two Queues
//!
//! A build is a single deterministic tree walk with slow side-artifacts
//! pushed onto concurrent work queues:
//!
//! ```text
//! pages/     → tree        → HTML pages + indexes     (single-threaded)
//!                ↘ recipe docs → PDF queue   ↘
//! static/cooking/ → gallery → image queue     → worker pool → dist/static/
//! ```
//!
//! The coordinating flow joins each queue before depending on its results
//! (the gallery page links derivative paths; the build verdict needs every
//! PDF acknowledged), then signals stop and drains the pool. See
//! [`pipeline`] for why join and stop are distinct signals.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`frontmatter`] | `key: value` metadata block parsing, draft/featured/order accessors |
//! | [`tree`] | Arena-backed content tree: build, sort, navigate |
//! | [`freshness`] | Per-file mtime staleness check (single-dependency by design) |
//! | [`markdown`] | CommonMark body rendering via pulldown-cmark |
//! | [`templates`] | Tera engine wrapper resolving logical template names |
//! | [`recipe`] | Structured recipe extraction from document markup |
//! | [`render`] | Depth-first HTML render pass, index listings, breadcrumbs |
//! | [`homepage`] | Featured-section aggregation and root index |
//! | [`pipeline`] | Job queues, join barrier, worker pool |
//! | [`pdf`] | Typst typesetting backend for recipe cards |
//! | [`imaging`] | ImageMagick backend: webp derivatives, EXIF capture dates |
//! | [`gallery`] | Gallery identity assignment and page rendering |
//! | [`site`] | Build orchestration tying the phases together |
//! | [`serve`] | Development preview server |
//! | [`watch`] | Debounced rebuild-on-change loop |
//!
//! # Design Decisions
//!
//! ## mtime-Only Staleness
//!
//! A page rebuilds when its own output is missing or older than its own
//! source — nothing else. Template edits do not propagate; `--force` exists
//! for that. This keeps the common case (tweak one recipe, rebuild) fast
//! and the model trivially predictable, at the cost of one known footgun
//! documented in [`freshness`].
//!
//! ## External Tools Behind Traits
//!
//! Typst and ImageMagick are subprocess collaborators behind the
//! [`pdf::PdfBackend`] and [`imaging::ImageBackend`] traits. Tests inject
//! recording mocks, so the whole build — including the concurrent pipeline —
//! runs in CI without either tool installed.
//!
//! ## Fail-Fast, No Rollback
//!
//! Malformed frontmatter, an unparseable recipe, an unsupported gallery
//! source, or a failed job all abort the build naming the offending path.
//! Files already written stay on disk: output is incremental and
//! file-at-a-time, never transactional.

pub mod frontmatter;
pub mod freshness;
pub mod gallery;
pub mod homepage;
pub mod imaging;
pub mod markdown;
pub mod pdf;
pub mod pipeline;
pub mod recipe;
pub mod render;
pub mod serve;
pub mod site;
pub mod templates;
pub mod tree;
pub mod watch;
