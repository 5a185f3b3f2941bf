//! Source URL validity rules.
//!
//! Applied identically to registry homepage URLs at startup and to every
//! `source_url` arriving at the ingest endpoint. The rules are deliberately
//! minimal: scheme, a real-looking host, and no placeholder hosts.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("empty url")]
    Empty,

    #[error("scheme must be http or https")]
    BadScheme,

    #[error("missing host")]
    MissingHost,

    #[error("placeholder host {0}")]
    PlaceholderHost(String),
}

/// Hosts that mark test/placeholder data rather than a real publisher.
const PLACEHOLDER_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "0.0.0.0",
    "::1",
    "example.com",
    "example.org",
    "example.net",
];

const PLACEHOLDER_SUFFIXES: &[&str] = &[".localhost", ".example", ".invalid", ".test", ".local"];

/// Validate that a URL is a usable public `http(s)` link.
pub fn validate_public_url(url: &str) -> Result<(), UrlError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or(UrlError::BadScheme)?;

    // Host runs until the first path/query/fragment/port delimiter.
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.split('@').next_back().unwrap_or("");
    let host = host.split(':').next().unwrap_or("").to_ascii_lowercase();

    if host.is_empty() {
        return Err(UrlError::MissingHost);
    }

    if PLACEHOLDER_HOSTS.contains(&host.as_str())
        || PLACEHOLDER_SUFFIXES.iter().any(|s| host.ends_with(s))
    {
        return Err(UrlError::PlaceholderHost(host));
    }

    Ok(())
}

/// The registered host of a URL, lowercased, with any `www.` prefix removed.
/// Used to match ingest source URLs against registry domains.
pub fn domain_of(url: &str) -> Option<String> {
    let rest = url
        .trim()
        .strip_prefix("https://")
        .or_else(|| url.trim().strip_prefix("http://"))?;
    let authority = rest.split(['/', '?', '#']).next()?;
    let host = authority.split('@').next_back()?.split(':').next()?;
    if host.is_empty() {
        return None;
    }
    let host = host.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_real_urls() {
        assert_eq!(validate_public_url("https://politi.dk/nyhed/123"), Ok(()));
        assert_eq!(validate_public_url("http://nrk.no"), Ok(()));
        assert_eq!(validate_public_url("https://user@dr.dk:8443/x?y=1"), Ok(()));
    }

    #[test]
    fn rejects_placeholders_and_bad_schemes() {
        assert_eq!(validate_public_url(""), Err(UrlError::Empty));
        assert_eq!(validate_public_url("ftp://politi.dk"), Err(UrlError::BadScheme));
        assert_eq!(validate_public_url("politi.dk/nyhed"), Err(UrlError::BadScheme));
        assert_eq!(validate_public_url("https://"), Err(UrlError::MissingHost));
        assert!(matches!(
            validate_public_url("http://localhost:3000/a"),
            Err(UrlError::PlaceholderHost(_))
        ));
        assert!(matches!(
            validate_public_url("https://example.com/article"),
            Err(UrlError::PlaceholderHost(_))
        ));
        assert!(matches!(
            validate_public_url("https://feed.invalid/rss"),
            Err(UrlError::PlaceholderHost(_))
        ));
    }

    #[test]
    fn domain_extraction_strips_www_and_port() {
        assert_eq!(domain_of("https://www.dr.dk/nyheder/x"), Some("dr.dk".into()));
        assert_eq!(domain_of("http://politi.dk:8080/rss"), Some("politi.dk".into()));
        assert_eq!(domain_of("nonsense"), None);
    }
}
