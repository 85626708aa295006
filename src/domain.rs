/// URL checks and host extraction for tracked pages
use url::Url;

/// Parse a URL and accept it only when the scheme is http or https
pub fn parse_trackable(url: &str) -> Option<Url> {
    Url::parse(url.trim())
        .ok()
        .filter(|parsed| matches!(parsed.scheme(), "http" | "https"))
}

/// True when the page can be tracked (http/https only)
pub fn is_trackable_url(url: &str) -> bool {
    parse_trackable(url).is_some()
}

/// Hostname of a URL, used as the default item name
///
/// Falls back to the raw string when the URL has no host, so a name is
/// always available.
pub fn extract_host(url: &str) -> String {
    Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trackable_schemes() {
        assert!(is_trackable_url("https://www.google.com"));
        assert!(is_trackable_url("http://localhost:3000/path"));
        assert!(is_trackable_url("  https://github.com/rust-lang/rust  "));
    }

    #[test]
    fn test_untrackable_schemes() {
        assert!(!is_trackable_url("chrome://extensions"));
        assert!(!is_trackable_url("ftp://example.com/file"));
        assert!(!is_trackable_url("file:///home/user/notes.txt"));
        assert!(!is_trackable_url("about:blank"));
    }

    #[test]
    fn test_malformed_urls() {
        assert!(!is_trackable_url(""));
        assert!(!is_trackable_url("not-a-url"));
        assert!(!is_trackable_url("https://"));
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://www.google.com/search?q=rust"), "www.google.com");
        assert_eq!(extract_host("https://news.bbc.co.uk/article"), "news.bbc.co.uk");
        assert_eq!(extract_host("http://127.0.0.1:8080"), "127.0.0.1");
        assert_eq!(extract_host("https://LOCALHOST:3000"), "localhost");
    }

    #[test]
    fn test_extract_host_fallback() {
        assert_eq!(extract_host("not-a-url"), "not-a-url");
        assert_eq!(extract_host("about:blank"), "about:blank");
    }
}
