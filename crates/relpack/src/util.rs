use cow_utils::CowUtils;

/// Normalize line endings to LF (\n) for cross-platform consistency.
/// This ensures reproducible release artifacts regardless of the platform
/// where packaging occurs.
pub fn normalize_line_endings(content: String) -> String {
    // Replace Windows CRLF (\r\n) and Mac CR (\r) with Unix LF (\n)
    content
        .cow_replace("\r\n", "\n")
        .cow_replace('\r', "\n")
        .into_owned()
}
