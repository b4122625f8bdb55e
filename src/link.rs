use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

static SHARE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://(?:www\.)?(?:terabox(?:app)?|1024terabox)\.com/s/[a-zA-Z0-9_-]+").unwrap()
});

/// A Terabox share link, captured verbatim from a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink(Box<str>);

impl ShareLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ShareLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the first share link in `text`
pub fn extract_share_link(text: &str) -> Option<ShareLink> {
    SHARE_LINK_RE
        .find(text)
        .map(|m| ShareLink(m.as_str().into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Option<String> {
        extract_share_link(text).map(|link| link.to_string())
    }

    #[test]
    fn surrounded_by_prose() {
        assert_eq!(
            extract("check this out https://1024terabox.com/s/1lqQc8B3zvkwh5cqByDatog thanks"),
            Some("https://1024terabox.com/s/1lqQc8B3zvkwh5cqByDatog".into())
        );
    }

    #[test]
    fn accepted_domains() {
        for link in [
            "https://terabox.com/s/abc",
            "http://terabox.com/s/abc",
            "https://www.terabox.com/s/abc",
            "https://teraboxapp.com/s/1h97DwtT0zc0uDzfNNWbCsA",
            "https://www.teraboxapp.com/s/a_b-c",
            "https://1024terabox.com/s/XyZ",
            "https://www.1024terabox.com/s/XyZ",
        ] {
            assert_eq!(extract(link).as_deref(), Some(link));
        }
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            extract("https://terabox.com/s/first and https://terabox.com/s/second"),
            Some("https://terabox.com/s/first".into())
        );
    }

    #[test]
    fn token_stops_at_other_characters() {
        assert_eq!(
            extract("(https://teraboxapp.com/s/abc123)."),
            Some("https://teraboxapp.com/s/abc123".into())
        );
        assert_eq!(
            extract("https://terabox.com/s/abc?pwd=1234"),
            Some("https://terabox.com/s/abc".into())
        );
    }

    #[test]
    fn no_match() {
        assert_eq!(extract(""), None);
        assert_eq!(extract("hello there"), None);
        assert_eq!(extract("https://terabox.com/sharing/link?surl=abc"), None);
        assert_eq!(extract("https://terabox.com/s/"), None);
        assert_eq!(extract("https://example.com/s/abc"), None);
        assert_eq!(extract("ftp://terabox.com/s/abc"), None);
        assert_eq!(extract("https://TERABOX.com/s/abc"), None);
    }
}
