//! Markdown section extraction
//!
//! A section runs from its heading to the next heading of the same level.
//! Deeper headings belong to the section.

/// Body of the first section titled `heading` at `level` (1 = `#`, 2 = `##`).
///
/// The heading text is matched after trimming. Returns `None` when the
/// heading is absent or the section has no lines.
pub fn get_section(markdown: &str, heading: &str, level: usize) -> Option<String> {
    let prefix = format!("{} ", "#".repeat(level));
    let mut inside = false;
    let mut collected: Vec<&str> = Vec::new();

    for line in markdown.lines() {
        if let Some(title) = line.strip_prefix(prefix.as_str()) {
            if inside {
                break;
            }
            if title.trim() == heading {
                inside = true;
                continue;
            }
        }
        if inside {
            collected.push(line);
        }
    }

    if collected.is_empty() {
        None
    } else {
        Some(collected.join("\n"))
    }
}

/// First of `headings` present at `level`, for files written with either
/// Russian or English headings
pub fn get_any_section(markdown: &str, headings: &[&str], level: usize) -> Option<String> {
    headings
        .iter()
        .find_map(|heading| get_section(markdown, heading, level))
}
