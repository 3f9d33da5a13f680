//! URL patterns that registrations match against.

use std::fmt;

use regex::Regex;

/// Prefix that turns a registered URL into a regular expression.
pub const REGEX_PREFIX: &str = "=~";

/// A URL pattern.
///
/// # Examples
///
/// ```
/// use sigmock_http::UrlPattern;
///
/// let exact = UrlPattern::parse("https://s3.amazonaws.com/my-bucket/my-file.txt").unwrap();
/// assert!(exact.matches("https://s3.amazonaws.com/my-bucket/my-file.txt?versionId=1"));
///
/// let regex = UrlPattern::parse(r"=~^https://test-bucket\.s3\.us-west-2\.amazonaws\.com/test-object.*").unwrap();
/// assert!(regex.matches("https://test-bucket.s3.us-west-2.amazonaws.com/test-object?X-Amz-Expires=900"));
/// assert!(regex.as_str().starts_with("=~"));
/// ```
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Matches one URL.
    Exact(String),
    /// Matches any URL the expression finds a match in.
    Regex(Regex),
}

impl UrlPattern {
    /// Parse a registration string. A leading `=~` marks a regular expression.
    ///
    /// # Errors
    ///
    /// Returns the compile error of a malformed expression.
    pub fn parse(pattern: &str) -> Result<Self, regex::Error> {
        match pattern.strip_prefix(REGEX_PREFIX) {
            Some(expr) => Ok(Self::Regex(Regex::new(expr)?)),
            None => Ok(Self::Exact(pattern.to_owned())),
        }
    }

    /// Whether `url` (scheme, host, path and query) matches.
    ///
    /// An exact pattern without a query also matches the URL with its query removed.
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(expected) => {
                if expected == url {
                    return true;
                }
                !expected.contains('?') && strip_query(url) == expected
            }
            Self::Regex(re) => re.is_match(url),
        }
    }

    /// The pattern as registered (`=~` included for expressions).
    ///
    /// This is also the key under which calls are counted.
    #[must_use]
    pub fn as_str(&self) -> String {
        match self {
            Self::Exact(url) => url.clone(),
            Self::Regex(re) => format!("{REGEX_PREFIX}{}", re.as_str()),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(url) => f.write_str(url),
            Self::Regex(re) => write!(f, "{REGEX_PREFIX}{}", re.as_str()),
        }
    }
}

impl PartialEq for UrlPattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for UrlPattern {}

impl From<Regex> for UrlPattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}
