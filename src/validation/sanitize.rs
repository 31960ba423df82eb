//! Text and filename scrubbing.

const MAX_FILENAME_CHARS: usize = 255;
const FILENAME_STEM_CHARS: usize = 250;

/// Remove NUL and other control characters, keeping `\n`, `\r` and `\t`.
pub fn strip_control_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Reduce an uploaded filename to a safe basename.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();

    let mut name: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    if name.chars().count() > MAX_FILENAME_CHARS {
        name = match name.rsplit_once('.') {
            Some((stem, ext)) => {
                let stem: String = stem.chars().take(FILENAME_STEM_CHARS).collect();
                format!("{stem}.{ext}")
            }
            None => name.chars().take(FILENAME_STEM_CHARS).collect(),
        };
    }

    if name.is_empty() {
        "unknown".to_string()
    } else {
        name
    }
}
