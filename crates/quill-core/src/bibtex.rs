//! Minimal BibTeX parser for the reference bulk import.
//!
//! Handles the common shape of exported `.bib` files: `@type{key, field =
//! {value}, ...}` with brace- or quote-delimited values. This is not a full
//! BibTeX implementation; cross-references, string macros, and `@preamble`
//! are out of scope; unparseable entries are simply skipped by the importer.

use regex::Regex;

/// One parsed BibTeX entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub title: Option<String>,
    pub authors: Option<String>,
    pub year: Option<String>,
    /// Journal, booktitle, or publisher, whichever is present first.
    pub source: Option<String>,
    pub doi: Option<String>,
    pub url: Option<String>,
}

/// Parse every entry in a `.bib` document.
pub fn parse(input: &str) -> Vec<BibEntry> {
    let header = Regex::new(r"@(\w+)\s*\{\s*([^,\s}]+)\s*,").expect("static regex");
    let mut entries = Vec::new();

    for caps in header.captures_iter(input) {
        let whole = caps.get(0).expect("full match");
        let entry_type = caps[1].to_ascii_lowercase();
        if entry_type == "comment" || entry_type == "preamble" || entry_type == "string" {
            continue;
        }

        // Body runs from just after the header to the brace matching the
        // one the header opened.
        let open = input[..whole.end()].rfind('{').expect("header contains brace");
        let Some(body) = balanced_block(&input[open..]) else {
            continue;
        };
        // Drop the outer braces and the leading "key," the header matched.
        let inner = &body[1..body.len() - 1];
        let inner = inner.split_once(',').map(|(_, rest)| rest).unwrap_or("");

        let mut entry = BibEntry {
            entry_type,
            key: caps[2].to_string(),
            ..Default::default()
        };
        let mut journal = None;
        let mut booktitle = None;
        let mut publisher = None;

        for (name, value) in parse_fields(inner) {
            let value = normalize_whitespace(&value);
            match name.as_str() {
                "title" => entry.title = Some(value),
                "author" => entry.authors = Some(normalize_authors(&value)),
                "year" => entry.year = Some(value),
                "journal" => journal = Some(value),
                "booktitle" => booktitle = Some(value),
                "publisher" => publisher = Some(value),
                "doi" => entry.doi = Some(value),
                "url" => entry.url = Some(value),
                _ => {}
            }
        }
        entry.source = journal.or(booktitle).or(publisher);
        entries.push(entry);
    }

    entries
}

/// Return the substring covering one balanced `{...}` block starting at the
/// first byte of `input` (which must be `{`). `None` when unbalanced.
fn balanced_block(input: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&input[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split an entry body into `(name, value)` field pairs.
fn parse_fields(body: &str) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    let mut rest = body;

    loop {
        // Field name up to '='
        let Some(eq) = rest.find('=') else { break };
        let name = rest[..eq].trim_matches(|c: char| c.is_whitespace() || c == ',');
        let name = name.trim().to_ascii_lowercase();
        rest = rest[eq + 1..].trim_start();

        let (value, consumed) = if rest.starts_with('{') {
            match balanced_block(rest) {
                Some(block) => (block[1..block.len() - 1].to_string(), block.len()),
                None => break,
            }
        } else if rest.starts_with('"') {
            match rest[1..].find('"') {
                Some(end) => (rest[1..=end].to_string(), end + 2),
                None => break,
            }
        } else {
            // Bare value: digits or a macro name, up to comma or end
            let end = rest.find(',').unwrap_or(rest.len());
            (rest[..end].trim().to_string(), end)
        };

        if !name.is_empty() {
            fields.push((name, value));
        }
        rest = &rest[consumed..];
    }

    fields
}

fn normalize_whitespace(value: &str) -> String {
    let cleaned: String = value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    crate::citation::clean_braced(&cleaned).to_string()
}

/// Convert BibTeX `A and B and C` author lists to quill's `A; B; C` form.
fn normalize_authors(value: &str) -> String {
    value
        .split(" and ")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}
