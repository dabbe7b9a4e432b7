//! Markup-to-HTML rendering boundary.
//!
//! Document bodies are CommonMark with the usual extras (tables, footnotes,
//! strikethrough, task lists). Rendering is delegated entirely to
//! [pulldown-cmark](https://docs.rs/pulldown-cmark); this module only fixes
//! the option set so every page renders with the same dialect.

use pulldown_cmark::{Options, Parser, html};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Render markup text to an HTML fragment.
pub fn to_html(text: &str) -> String {
    let parser = Parser::new_ext(text, options());
    let mut out = String::with_capacity(text.len() * 2);
    html::push_html(&mut out, parser);
    out
}

/// Parser over the body with the site's option set, for callers that walk
/// events directly (the recipe parser).
pub fn parser(text: &str) -> Parser<'_> {
    Parser::new_ext(text, options())
}
