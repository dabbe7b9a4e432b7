//! Recipe extraction from document markup.
//!
//! Documents rendered with the `recipe` template follow a light structural
//! convention on top of ordinary markup:
//!
//! ```text
//! # Braised Leeks
//!
//! A weeknight side that tastes like more work than it is.
//!
//! ## Ingredients
//!
//! ### Braise
//! - 4 leeks
//! - 2 tbsp butter
//!
//! ## Instructions
//!
//! 1. Trim and halve the leeks.
//! 2. Brown in butter, then braise.
//! ```
//!
//! [`parse`] walks the markup events and lifts this into a [`Recipe`]: the
//! H1 becomes the title, paragraphs before the first H2 become the
//! description, and list items under the `Ingredients` and `Instructions`
//! sections become grouped entries (an H3 opens a named group).
//!
//! Returns `None` when the document is not recognizably a recipe — no title,
//! no ingredients, or no instructions. Callers treat that as fatal for a
//! `recipe`-templated page.

use crate::markdown;
use pulldown_cmark::{Event, HeadingLevel, Tag, TagEnd};
use serde::Serialize;

/// A structured recipe, consumed by the PDF renderer and the recipe template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub title: String,
    /// Intro paragraphs between the title and the first section heading.
    pub description: Option<String>,
    pub ingredient_groups: Vec<Group>,
    pub instruction_groups: Vec<Group>,
    /// Free-form notes from an optional `Notes` section.
    pub notes: Vec<String>,
}

/// A named (or anonymous) run of list entries within a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// H3 group label, `None` for entries directly under the section heading.
    pub name: Option<String>,
    pub entries: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Ingredients,
    Instructions,
    Notes,
    Other,
}

/// Parse a document body into a [`Recipe`], or `None` if the body does not
/// carry the expected structure.
pub fn parse(body: &str) -> Option<Recipe> {
    let mut title: Option<String> = None;
    let mut description: Vec<String> = Vec::new();
    let mut ingredients: Vec<Group> = Vec::new();
    let mut instructions: Vec<Group> = Vec::new();
    let mut notes: Vec<String> = Vec::new();

    let mut section = Section::Preamble;
    let mut heading: Option<HeadingLevel> = None;
    let mut buffer = String::new();
    let mut in_item = false;
    let mut in_paragraph = false;

    for event in markdown::parser(body) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                heading = Some(level);
                buffer.clear();
            }
            Event::End(TagEnd::Heading(level)) => {
                let text = buffer.trim().to_string();
                match level {
                    HeadingLevel::H1 => {
                        if title.is_none() {
                            title = Some(text);
                        }
                    }
                    HeadingLevel::H2 => {
                        section = match text.to_ascii_lowercase().as_str() {
                            "ingredients" => Section::Ingredients,
                            "instructions" | "directions" => Section::Instructions,
                            "notes" => Section::Notes,
                            _ => Section::Other,
                        };
                    }
                    HeadingLevel::H3 => {
                        let target = match section {
                            Section::Ingredients => Some(&mut ingredients),
                            Section::Instructions => Some(&mut instructions),
                            _ => None,
                        };
                        if let Some(groups) = target {
                            groups.push(Group {
                                name: Some(text),
                                entries: Vec::new(),
                            });
                        }
                    }
                    _ => {}
                }
                heading = None;
                buffer.clear();
            }
            Event::Start(Tag::Item) => {
                in_item = true;
                buffer.clear();
            }
            Event::End(TagEnd::Item) => {
                let entry = buffer.trim().to_string();
                if !entry.is_empty() {
                    let target = match section {
                        Section::Ingredients => Some(&mut ingredients),
                        Section::Instructions => Some(&mut instructions),
                        Section::Notes => None,
                        _ => None,
                    };
                    match section {
                        Section::Notes => notes.push(entry),
                        _ => {
                            if let Some(groups) = target {
                                push_entry(groups, entry);
                            }
                        }
                    }
                }
                in_item = false;
                buffer.clear();
            }
            Event::Start(Tag::Paragraph) => {
                if !in_item {
                    in_paragraph = true;
                    buffer.clear();
                }
            }
            Event::End(TagEnd::Paragraph) => {
                if in_paragraph && !in_item {
                    let text = buffer.trim().to_string();
                    if !text.is_empty() {
                        match section {
                            Section::Preamble => description.push(text),
                            Section::Notes => notes.push(text),
                            _ => {}
                        }
                    }
                    in_paragraph = false;
                    buffer.clear();
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if heading.is_some() || in_item || in_paragraph {
                    buffer.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if heading.is_some() || in_item || in_paragraph {
                    buffer.push(' ');
                }
            }
            _ => {}
        }
    }

    let title = title?;
    if ingredients.iter().all(|g| g.entries.is_empty())
        || instructions.iter().all(|g| g.entries.is_empty())
    {
        return None;
    }

    Some(Recipe {
        title,
        description: if description.is_empty() {
            None
        } else {
            Some(description.join("\n\n"))
        },
        ingredient_groups: ingredients,
        instruction_groups: instructions,
        notes,
    })
}

/// Append an entry to the last group, opening an anonymous group when the
/// section has none yet (entries directly under the H2).
fn push_entry(groups: &mut Vec<Group>, entry: String) {
    match groups.last_mut() {
        Some(group) => group.entries.push(entry),
        None => groups.push(Group {
            name: None,
            entries: vec![entry],
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "\
# Miso Soup

Fast and restorative.

## Ingredients

- 4 cups dashi
- 3 tbsp miso

## Instructions

1. Warm the dashi.
2. Whisk in the miso off heat.
";

    #[test]
    fn parses_a_simple_recipe() {
        let r = parse(SIMPLE).unwrap();
        assert_eq!(r.title, "Miso Soup");
        assert_eq!(r.description.as_deref(), Some("Fast and restorative."));
        assert_eq!(r.ingredient_groups.len(), 1);
        assert_eq!(r.ingredient_groups[0].name, None);
        assert_eq!(
            r.ingredient_groups[0].entries,
            vec!["4 cups dashi", "3 tbsp miso"]
        );
        assert_eq!(
            r.instruction_groups[0].entries,
            vec!["Warm the dashi.", "Whisk in the miso off heat."]
        );
    }

    #[test]
    fn named_groups_from_h3() {
        let body = "\
# Layer Cake

## Ingredients

### Cake
- flour
- sugar

### Frosting
- butter

## Instructions

1. Bake.
2. Frost.
";
        let r = parse(body).unwrap();
        assert_eq!(r.ingredient_groups.len(), 2);
        assert_eq!(r.ingredient_groups[0].name.as_deref(), Some("Cake"));
        assert_eq!(r.ingredient_groups[0].entries, vec!["flour", "sugar"]);
        assert_eq!(r.ingredient_groups[1].name.as_deref(), Some("Frosting"));
        assert_eq!(r.ingredient_groups[1].entries, vec!["butter"]);
    }

    #[test]
    fn directions_is_accepted_for_instructions() {
        let body = "# T\n\n## Ingredients\n\n- x\n\n## Directions\n\n1. Go.\n";
        let r = parse(body).unwrap();
        assert_eq!(r.instruction_groups[0].entries, vec!["Go."]);
    }

    #[test]
    fn notes_section_collected() {
        let body = "\
# T

## Ingredients

- x

## Instructions

1. Go.

## Notes

Keeps for a week.

- Freezes well.
";
        let r = parse(body).unwrap();
        assert_eq!(r.notes, vec!["Keeps for a week.", "Freezes well."]);
    }

    #[test]
    fn multiline_description_paragraphs() {
        let body = "# T\n\nFirst.\n\nSecond.\n\n## Ingredients\n\n- x\n\n## Instructions\n\n1. Go.\n";
        let r = parse(body).unwrap();
        assert_eq!(r.description.as_deref(), Some("First.\n\nSecond."));
    }

    // =========================================================================
    // Rejection
    // =========================================================================

    #[test]
    fn missing_title_is_not_a_recipe() {
        assert!(parse("## Ingredients\n\n- x\n\n## Instructions\n\n1. Go.\n").is_none());
    }

    #[test]
    fn missing_ingredients_is_not_a_recipe() {
        assert!(parse("# T\n\n## Instructions\n\n1. Go.\n").is_none());
    }

    #[test]
    fn missing_instructions_is_not_a_recipe() {
        assert!(parse("# T\n\n## Ingredients\n\n- x\n").is_none());
    }

    #[test]
    fn plain_prose_is_not_a_recipe() {
        assert!(parse("Just some notes about dinner.").is_none());
    }
}
