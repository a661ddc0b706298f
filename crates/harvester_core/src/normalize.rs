/// Placeholder used when an identifier has no slug-worthy characters.
pub const EMPTY_SLUG: &str = "unknown";

/// Filesystem-safe form of an identifier.
///
/// Lowercases, turns every run of characters that are neither word characters
/// nor `-` into a single `_`, collapses repeated `_` and strips them from both
/// ends. Two different identifiers can share a slug (`"Acme Co"` and
/// `"acme_co"`); callers combine it with another name component.
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut prev_underscore = false;
    for c in lowered.chars() {
        let keep = c.is_alphanumeric() || c == '-';
        if keep {
            slug.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            slug.push('_');
            prev_underscore = true;
        }
    }
    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Lowercased text with every non-alphanumeric character removed, used to
/// compare an identifier against result-row text.
pub fn normalize_for_match(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when `haystack` contains `needle` after both are normalized. An
/// identifier that normalizes to nothing never matches.
pub fn text_matches(haystack: &str, needle: &str) -> bool {
    let needle = normalize_for_match(needle);
    !needle.is_empty() && normalize_for_match(haystack).contains(&needle)
}
