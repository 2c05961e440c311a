use url::Url;

/// Extracts the lowercase host of a parsed URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use bookmark_harvest::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Parses a URL string and extracts its lowercase host
///
/// Returns `None` for unparsable URLs and URLs without a host (`mailto:`,
/// `javascript:`, `file:` and friends).
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url).ok().as_ref().and_then(extract_domain)
}
