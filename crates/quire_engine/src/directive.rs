//! Header directive processor.
//!
//! Directives live in the comment block at the top of a file:
//!
//! ```text
//! //= require lib/util
//! //= require_tree ./widgets
//! //= depend_on config.json
//! // require_self
//! ```
//!
//! Comment markers `//`, `#`, `/*`, `*` and `*/` are accepted, with or without
//! a `=` after the marker. The header ends at the first line that is neither
//! blank nor a comment. Directive lines are removed from the body; every other
//! line is kept verbatim.

use std::path::Path;

use crate::error::ProcessingError;
use crate::processing::{DirectiveProcessor, Directives, Requirement};

/// The default [`DirectiveProcessor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDirectiveProcessor;

impl DirectiveProcessor for HeaderDirectiveProcessor {
    fn name(&self) -> &str {
        "header-directives/1"
    }

    fn process(&self, source: &str, path: &Path) -> Result<Directives, ProcessingError> {
        let mut directives = Directives::default();
        let mut body = String::with_capacity(source.len());
        let mut in_header = true;

        for line in source.split_inclusive('\n') {
            if in_header {
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    match comment_text(trimmed) {
                        Some(text) => {
                            if let Some((name, arg)) = parse_directive(text) {
                                apply(name, arg, path, &mut directives)?;
                                continue;
                            }
                        }
                        None => in_header = false,
                    }
                }
            }
            body.push_str(line);
        }

        directives.body = body;
        Ok(directives)
    }
}

/// Returns the text of a comment line with its markers stripped, or `None`
/// if the line is not a comment.
fn comment_text(line: &str) -> Option<&str> {
    let text = if let Some(rest) = line.strip_prefix("//") {
        rest
    } else if let Some(rest) = line.strip_prefix("/*") {
        rest
    } else if let Some(rest) = line.strip_prefix("*/") {
        rest
    } else if let Some(rest) = line.strip_prefix('*') {
        rest
    } else if let Some(rest) = line.strip_prefix('#') {
        if !rest.is_empty() && !rest.starts_with([' ', '\t', '=']) {
            return None;
        }
        rest
    } else {
        return None;
    };
    Some(text.trim_end_matches("*/").trim())
}

/// Splits a comment into a directive name and its argument.
fn parse_directive(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('=').unwrap_or(text).trim_start();
    let (name, arg) = match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    };
    match name {
        "require" | "require_self" | "require_tree" | "depend_on" => Some((name, arg)),
        _ => None,
    }
}

fn apply(
    name: &str,
    arg: &str,
    path: &Path,
    directives: &mut Directives,
) -> Result<(), ProcessingError> {
    let needs_arg = || ProcessingError::new(format!("{name} needs a path argument"));
    match name {
        "require" => {
            if arg.is_empty() {
                return Err(needs_arg());
            }
            directives.requires.push(Requirement::File(arg.to_string()));
        }
        "require_self" => {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| ProcessingError::new("require_self on a path without a name"))?;
            directives
                .requires
                .push(Requirement::File(format!("./{file_name}")));
        }
        "require_tree" => {
            if arg.is_empty() {
                return Err(needs_arg());
            }
            directives.requires.push(Requirement::Tree(arg.to_string()));
        }
        "depend_on" => {
            if arg.is_empty() {
                return Err(needs_arg());
            }
            directives.depends_on.push(arg.to_string());
        }
        _ => {}
    }
    Ok(())
}
