//! Citation formatting for bibliographic references.
//!
//! Builds APA / MLA / Chicago citation strings from a [`Reference`].
//! Author lists are stored as a single `;`-separated string
//! (`"Smith, J.; Lee, K."`), the convention the BibTeX importer also emits.
//!
//! [`Reference`]: crate::models::Reference

use crate::models::Reference;

/// Supported citation styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Apa,
    Mla,
    Chicago,
}

impl CitationStyle {
    /// Parse a style name, case-insensitively. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "APA" => Some(CitationStyle::Apa),
            "MLA" => Some(CitationStyle::Mla),
            "CHICAGO" => Some(CitationStyle::Chicago),
            _ => None,
        }
    }
}

/// Strip a `https://doi.org/` or `DOI:` prefix from a DOI string.
pub fn strip_doi_prefix(doi: &str) -> &str {
    let trimmed = doi.trim();
    for prefix in ["https://doi.org/", "http://doi.org/", "doi.org/"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest;
        }
    }
    if trimmed.len() >= 4 && trimmed[..4].eq_ignore_ascii_case("doi:") {
        return trimmed[4..].trim_start();
    }
    trimmed
}

/// Remove balanced outer braces left over from BibTeX values.
pub fn clean_braced(value: &str) -> &str {
    let mut s = value.trim();
    while s.len() >= 2 && s.starts_with('{') && s.ends_with('}') {
        s = s[1..s.len() - 1].trim();
    }
    s
}

fn split_authors(authors: &str) -> Vec<&str> {
    authors
        .split(';')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .collect()
}

/// APA-style author list: `A, B. & C, D.`
pub fn format_authors_apa(authors: &str) -> String {
    let parts = split_authors(authors);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].to_string(),
        n => format!("{} & {}", parts[..n - 1].join(", "), parts[n - 1]),
    }
}

/// MLA-style author list: second author joined with `and`, three or more
/// collapse to `et al.`
pub fn format_authors_mla(authors: &str) -> String {
    let parts = split_authors(authors);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].to_string(),
        2 => format!("{}, and {}", parts[0], parts[1]),
        _ => format!("{}, et al.", parts[0]),
    }
}

/// Chicago-style author list: all authors, `and` before the last.
pub fn format_authors_chicago(authors: &str) -> String {
    let parts = split_authors(authors);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].to_string(),
        2 => format!("{} and {}", parts[0], parts[1]),
        n => format!("{}, and {}", parts[..n - 1].join(", "), parts[n - 1]),
    }
}

/// Build the citation string for a reference in the given style.
pub fn format_citation(style: CitationStyle, reference: &Reference) -> String {
    let title = clean_braced(&reference.title);
    let source = clean_braced(&reference.source);
    let year = reference.year.trim();

    let mut citation = match style {
        CitationStyle::Apa => format!(
            "{} ({}). {}. {}.",
            format_authors_apa(&reference.authors),
            year,
            title,
            source
        ),
        CitationStyle::Mla => format!(
            "{}. \"{}.\" {}, {}.",
            format_authors_mla(&reference.authors),
            title,
            source,
            year
        ),
        CitationStyle::Chicago => format!(
            "{}. {}. \"{}.\" {}.",
            format_authors_chicago(&reference.authors),
            year,
            title,
            source
        ),
    };

    if let Some(doi) = reference.doi.as_deref() {
        let doi = strip_doi_prefix(doi);
        if !doi.is_empty() {
            citation.push_str(&format!(" https://doi.org/{}", doi));
        }
    }
    citation
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn reference(authors: &str, doi: Option<&str>) -> Reference {
        Reference {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            title: "{Deep Learning in Vision}".to_string(),
            authors: authors.to_string(),
            year: "2022".to_string(),
            source: "CVPR".to_string(),
            doi: doi.map(String::from),
            url: None,
            completed: false,
            created_at_utc: Utc::now(),
        }
    }

    #[test]
    fn clean_braced_strips_nested_braces() {
        assert_eq!(clean_braced("{Hello}"), "Hello");
        assert_eq!(clean_braced("{{A}}"), "A");
        assert_eq!(clean_braced("NoBrace"), "NoBrace");
    }

    #[test]
    fn strip_doi_prefix_variants() {
        assert_eq!(strip_doi_prefix("https://doi.org/10.1000/xyz"), "10.1000/xyz");
        assert_eq!(strip_doi_prefix("DOI:10.1/abc"), "10.1/abc");
        assert_eq!(strip_doi_prefix("10.2/def"), "10.2/def");
    }

    #[test]
    fn apa_authors_two_joined_with_ampersand() {
        assert_eq!(format_authors_apa("A, B.; C, D."), "A, B. & C, D.");
        assert_eq!(format_authors_apa("A, B."), "A, B.");
    }

    #[test]
    fn apa_authors_three_or_more() {
        assert_eq!(format_authors_apa("A; B; C"), "A, B & C");
    }

    #[test]
    fn mla_authors() {
        assert_eq!(format_authors_mla("Smith, J."), "Smith, J.");
        assert_eq!(format_authors_mla("Smith, J.; Lee, K."), "Smith, J., and Lee, K.");
        assert_eq!(format_authors_mla("A; B; C"), "A, et al.");
    }

    #[test]
    fn chicago_authors() {
        assert_eq!(format_authors_chicago("A; B"), "A and B");
        assert_eq!(format_authors_chicago("A; B; C"), "A, B, and C");
    }

    #[test]
    fn apa_citation_strips_braces_and_appends_doi() {
        let r = reference("Smith, J.; Lee, K.", Some("https://doi.org/10.1/x"));
        let cite = format_citation(CitationStyle::Apa, &r);
        assert_eq!(
            cite,
            "Smith, J. & Lee, K. (2022). Deep Learning in Vision. CVPR. https://doi.org/10.1/x"
        );
    }

    #[test]
    fn style_parse_is_case_insensitive() {
        assert_eq!(CitationStyle::parse("apa"), Some(CitationStyle::Apa));
        assert_eq!(CitationStyle::parse("Chicago"), Some(CitationStyle::Chicago));
        assert_eq!(CitationStyle::parse("HARVARD"), None);
    }
}
