//! Telegram MarkdownV2 helpers.
//!
//! Every piece of literal text must go through [`escape`] exactly once.
//! URLs inside a `[label](url)` link are left as-is.

use crate::resolver::ResolvedMedia;

static RESERVED: [char; 19] = [
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

static UNKNOWN_SIZE: &str = "Unknown size";

/// Prefix every reserved character with a backslash
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escaped text wrapped in a code span
pub fn code(text: &str) -> String {
    format!("`{}`", escape(text))
}

pub fn link(label: &str, url: &str) -> String {
    format!("[{}]({})", escape(label), url)
}

pub fn caption(media: &ResolvedMedia) -> String {
    let size = media.size_label.as_deref().unwrap_or(UNKNOWN_SIZE);
    format!(
        "\u{1F3AC} *{}*\n\u{1F4E6} Size: {}\n\n{}",
        escape(&media.title),
        escape(size),
        link("\u{2B07}\u{FE0F} Direct Download Link (Click here)", &media.direct_url),
    )
}
