use harvester_core::slugify;

/// Used when the server proposes no file name.
pub const DEFAULT_DOCUMENT_NAME: &str = "certificate.pdf";

const MAX_SUGGESTED_BYTES: usize = 120;

/// Output file name for a downloaded document: `{slug(identifier)}__{suggested}`.
///
/// Identifiers that share a slug and a suggested name map to the same file;
/// the later download replaces the earlier one.
pub fn download_filename(identifier: &str, suggested: Option<&str>) -> String {
    let suggested = suggested
        .map(sanitize_suggested)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DOCUMENT_NAME.to_string());
    format!("{}__{}", slugify(identifier), suggested)
}

/// Windows-safe version of a server-proposed name. Path separators never
/// survive, so the result cannot escape the output directory.
fn sanitize_suggested(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);

    // Collapse multiple underscores
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name = truncate_keep_extension(&compacted, MAX_SUGGESTED_BYTES);
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn truncate_keep_extension(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if name.len() - idx <= 10 => name.split_at(idx),
        _ => (name, ""),
    };
    let mut end = max.saturating_sub(ext.len()).min(stem.len());
    while end > 0 && !stem.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &stem[..end], ext)
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let stem = name.split('.').next().unwrap_or(name);
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}
