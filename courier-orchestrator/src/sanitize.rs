//! Name sanitization for files and object references

/// Maximum length of a sanitized name component
const MAX_COMPONENT_LEN: usize = 100;

/// Reduces an arbitrary string to a safe name component.
///
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, runs of replacements
/// collapse to a single `_`, leading and trailing underscores are stripped,
/// and the result is capped at 100 characters. An input with nothing
/// salvageable yields `"unnamed"`.
pub fn sanitize(input: &str) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-') {
            cleaned.push(c);
        } else if !cleaned.ends_with('_') {
            cleaned.push('_');
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    trimmed.chars().take(MAX_COMPONENT_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_unsafe_characters() {
        assert_eq!(sanitize("https://example.com/a b"), "https_example.com_a_b");
    }

    #[test]
    fn keeps_safe_names_untouched() {
        assert_eq!(sanitize("report-2024.pdf"), "report-2024.pdf");
    }

    #[test]
    fn empty_input_falls_back() {
        assert_eq!(sanitize(""), "unnamed");
        assert_eq!(sanitize("///"), "unnamed");
    }

    #[test]
    fn caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize(&long).len(), 100);
    }
}
