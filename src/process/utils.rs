/// Trim whitespace + strip outer quotes if present.
pub fn clean_str(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// Split a raw comma-separated line into cleaned fields.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(clean_str).collect()
}
