/// Checks if a domain matches a wildcard pattern
///
/// Two kinds of patterns are supported:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches "example.com" itself and every
///    subdomain of it, however deeply nested
///
/// # Examples
///
/// ```
/// use bookmark_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// assert!(matches_wildcard("*.zhihu.com", "zhihu.com"));
/// assert!(matches_wildcard("*.zhihu.com", "zhuanlan.zhihu.com"));
/// assert!(!matches_wildcard("*.zhihu.com", "notzhihu.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}

/// A set of domain patterns
///
/// Patterns are lowercased on construction; candidates are expected to be
/// lowercase already (see [`crate::url::extract_domain`]).
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    patterns: Vec<String>,
}

impl DomainSet {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns true if any pattern matches the domain
    pub fn contains(&self, domain: &str) -> bool {
        self.patterns.iter().any(|p| matches_wildcard(p, domain))
    }

    /// Returns true if the URL's host matches any pattern
    pub fn matches_url(&self, url: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        super::domain_of(url).is_some_and(|domain| self.contains(&domain))
    }
}
