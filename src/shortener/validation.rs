//! URL normalization and validation for link creation.

use ipnet::{Ipv4Net, Ipv6Net};
use std::net::{Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

use super::error::ShortenerError;

/// Schemes that never get the `https://` default applied
const BLOCKED_SCHEMES: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
    "mailto:",
];

/// Normalizes raw user input into an absolute http(s) URL and rejects
/// anything the redirect server should not send visitors to.
#[derive(Debug, Clone, Default)]
pub struct UrlValidator {
    /// Reject loopback, private and link-local targets
    restrict_private_hosts: bool,
}

impl UrlValidator {
    pub fn new(restrict_private_hosts: bool) -> Self {
        Self {
            restrict_private_hosts,
        }
    }

    /// Trim the input and default to `https://` when no http(s) scheme is given
    pub fn normalize(raw: &str) -> String {
        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    /// Returns the normalized URL exactly as it will be stored
    pub fn normalize_and_validate(&self, raw: &str) -> Result<String, ShortenerError> {
        if raw.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
        }

        if raw.trim().chars().any(|c| c.is_ascii_control()) {
            return Err(ShortenerError::InvalidUrl(
                "URL must not contain control characters".to_string(),
            ));
        }

        let lower = raw.trim().to_ascii_lowercase();
        if let Some(scheme) = BLOCKED_SCHEMES.iter().find(|s| lower.starts_with(**s)) {
            return Err(ShortenerError::InvalidUrl(format!(
                "scheme must be http or https, got {}",
                scheme.trim_end_matches(':')
            )));
        }
        if let Some((scheme, _)) = lower.split_once("://") {
            let is_scheme = scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
            if is_scheme && scheme != "http" && scheme != "https" {
                return Err(ShortenerError::InvalidUrl(format!(
                    "scheme must be http or https, got {scheme}"
                )));
            }
        }

        let normalized = Self::normalize(raw);
        let parsed = Url::parse(&normalized)
            .map_err(|e| ShortenerError::InvalidUrl(format!("{normalized}: {e}")))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ShortenerError::InvalidUrl(format!(
                "scheme must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let host = parsed
            .host()
            .ok_or_else(|| ShortenerError::InvalidUrl("URL must have a host".to_string()))?;

        if self.restrict_private_hosts && is_private_host(&host) {
            return Err(ShortenerError::InvalidUrl(format!(
                "private or loopback host is not allowed: {host}"
            )));
        }

        Ok(normalized)
    }
}

fn is_private_host(host: &Host<&str>) -> bool {
    match host {
        Host::Domain(domain) => {
            let domain = domain.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Host::Ipv4(addr) => is_private_ipv4(*addr),
        Host::Ipv6(addr) => is_private_ipv6(*addr),
    }
}

fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() || addr.is_link_local() {
        return true;
    }

    ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
        .iter()
        .filter_map(|net| net.parse::<Ipv4Net>().ok())
        .any(|net| net.contains(&addr))
}

fn is_private_ipv6(addr: Ipv6Addr) -> bool {
    if addr.is_loopback() || addr.is_unspecified() {
        return true;
    }

    if let Some(v4) = addr.to_ipv4_mapped() {
        return is_private_ipv4(v4);
    }

    ["fc00::/7", "fe80::/10"]
        .iter()
        .filter_map(|net| net.parse::<Ipv6Net>().ok())
        .any(|net| net.contains(&addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_https_when_scheme_missing() {
        let validator = UrlValidator::default();
        assert_eq!(
            validator.normalize_and_validate("example.com/path").unwrap(),
            "https://example.com/path"
        );
        assert_eq!(
            validator
                .normalize_and_validate("  http://example.com  ")
                .unwrap(),
            "http://example.com"
        );
        assert_eq!(
            validator.normalize_and_validate("HTTPS://Example.com").unwrap(),
            "HTTPS://Example.com"
        );
        assert_eq!(
            validator
                .normalize_and_validate("example.com/login?next=http://example.org")
                .unwrap(),
            "https://example.com/login?next=http://example.org"
        );
    }

    #[test]
    fn rejects_empty_input() {
        let validator = UrlValidator::default();
        assert!(matches!(
            validator.normalize_and_validate("   "),
            Err(ShortenerError::InvalidUrl(_))
        ));
    }

    #[test]
    fn rejects_embedded_control_characters() {
        let validator = UrlValidator::default();
        for raw in [
            "example.com/a\nb",
            "example.com/a\tb",
            "https://example.com/a\r\nLocation: evil",
            "https://example.com/\u{7f}",
        ] {
            assert!(
                matches!(
                    validator.normalize_and_validate(raw),
                    Err(ShortenerError::InvalidUrl(_))
                ),
                "{raw:?} should be rejected"
            );
        }

        // Surrounding whitespace is still trimmed away
        assert_eq!(
            validator.normalize_and_validate("\texample.com\n").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn rejects_non_http_schemes() {
        let validator = UrlValidator::default();
        for raw in [
            "ftp://example.com",
            "javascript:alert(1)",
            "JavaScript:alert(1)",
            "data:text/html,hi",
            "file:///etc/passwd",
            "mailto:a@b.com",
        ] {
            assert!(
                matches!(
                    validator.normalize_and_validate(raw),
                    Err(ShortenerError::InvalidUrl(_))
                ),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn private_hosts_allowed_when_unrestricted() {
        let validator = UrlValidator::new(false);
        assert!(validator.normalize_and_validate("http://localhost:8080").is_ok());
        assert!(validator.normalize_and_validate("http://10.0.0.1").is_ok());
    }

    #[test]
    fn private_hosts_rejected_when_restricted() {
        let validator = UrlValidator::new(true);
        for raw in [
            "http://localhost",
            "http://api.localhost/x",
            "http://127.0.0.1",
            "http://0.0.0.0",
            "http://10.1.2.3",
            "http://172.16.0.1",
            "http://192.168.1.1",
            "http://169.254.0.1",
            "http://[::1]/",
            "http://[fd00::1]/",
        ] {
            assert!(
                validator.normalize_and_validate(raw).is_err(),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn public_hosts_accepted_when_restricted() {
        let validator = UrlValidator::new(true);
        assert!(validator.normalize_and_validate("https://example.com").is_ok());
        assert!(validator.normalize_and_validate("http://172.32.0.1").is_ok());
        assert!(validator.normalize_and_validate("http://8.8.8.8").is_ok());
    }
}
