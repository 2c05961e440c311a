/// Built-in summarization instructions
pub const DEFAULT_INSTRUCTIONS: &str = "\
Write a comprehensive, information-dense summary (about 500 words) of the web page \
content provided by the user.

Requirements:
1. Open with one sentence stating what the document is about and what it is for.
2. Organize the rest into short paragraphs, one core topic each.
3. Keep key terms, entity names, numbers, dates, versions and identifiers.
4. For technical content, name the technologies, parameters and methods involved.
5. For news, state when, where, who and what happened.
6. For tutorials or guides, list the concrete steps.
7. For products or services, name the product, its features and specifications.
8. Be factual and specific. No filler, no pleasantries, no repetition.

The summary is indexed for retrieval, so favour dense, concrete wording.";

/// Cuts `text` to at most `max_chars` characters
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point. Text that already fits is returned unchanged.
pub fn truncate_input(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Frames the instructions with the page's title and URL
pub fn build_instructions(base: &str, title: &str, url: &str) -> String {
    let title = if title.trim().is_empty() {
        "(untitled)"
    } else {
        title.trim()
    };
    format!("{}\n\nPage title: {}\nPage URL: {}", base.trim(), title, url)
}

/// Rough token count: ASCII characters / 4 (rounded up) plus one per non-ASCII character
pub fn estimate_tokens(text: &str) -> u32 {
    let (ascii, other) = text.chars().fold((0u64, 0u64), |(ascii, other), c| {
        if c.is_ascii() {
            (ascii + 1, other)
        } else {
            (ascii, other + 1)
        }
    });
    let estimate = ascii.div_ceil(4) + other;
    u32::try_from(estimate).unwrap_or(u32::MAX)
}
