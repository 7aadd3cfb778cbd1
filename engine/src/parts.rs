use std::borrow::Cow;

pub const DEFAULT_SCHEME: &str = "http";

/// Borrowed view over the `scheme://authority/path?query#fragment` components
/// of a URL string. Never fails, unlike `url::Url`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UrlParts<'a> {
    pub scheme: &'a str,
    pub authority: &'a str,
    pub path: &'a str,
    pub query: &'a str,
    pub fragment: &'a str,
}

impl<'a> UrlParts<'a> {
    pub fn split(raw: &'a str) -> Self {
        let (scheme, rest) = match raw.split_once(':') {
            Some((scheme, rest)) if is_scheme(scheme) => (scheme, rest),
            _ => ("", raw),
        };

        let (authority, rest) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find(['/', '?', '#']).unwrap_or(after.len());
                after.split_at(end)
            }
            None => ("", rest),
        };

        let (rest, fragment) = rest.split_once('#').unwrap_or((rest, ""));
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

        Self {
            scheme,
            authority,
            path,
            query,
            fragment,
        }
    }

    /// Authority without any `user:pass@` prefix.
    pub fn host_port(&self) -> &'a str {
        match self.authority.rfind('@') {
            Some(idx) => &self.authority[idx + 1..],
            None => self.authority,
        }
    }

    /// Host name with userinfo and everything from the first `:` removed.
    /// Brackets are kept on IPv6 literals.
    pub fn hostname(&self) -> &'a str {
        let host_port = self.host_port();
        if host_port.starts_with('[') {
            return match host_port.find(']') {
                Some(end) => &host_port[..=end],
                None => host_port,
            };
        }
        match host_port.find(':') {
            Some(idx) => &host_port[..idx],
            None => host_port,
        }
    }

    /// Explicit numeric port. Anything unparsable is treated as absent.
    pub fn port(&self) -> Option<u16> {
        let host_port = self.host_port();
        let after_host = if host_port.starts_with('[') {
            &host_port[host_port.find(']').map(|end| end + 1).unwrap_or(host_port.len())..]
        } else {
            host_port.find(':').map(|idx| &host_port[idx..]).unwrap_or("")
        };
        let digits = after_host.strip_prefix(':')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// True when the string opens with `<scheme>://`.
pub fn has_scheme(raw: &str) -> bool {
    raw.split_once("://")
        .map(|(scheme, _)| is_scheme(scheme))
        .unwrap_or(false)
}

/// Trims the input and prepends `http://` when no scheme is present.
pub fn with_default_scheme(raw: &str) -> Cow<'_, str> {
    let trimmed = raw.trim();
    if has_scheme(trimmed) {
        Cow::Borrowed(trimmed)
    } else {
        Cow::Owned(format!("{DEFAULT_SCHEME}://{trimmed}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_split() {
        let parts = UrlParts::split("https://user:pw@Example.com:8443/a/b?x=1&y=2#top");
        assert_eq!(parts.scheme, "https");
        assert_eq!(parts.authority, "user:pw@Example.com:8443");
        assert_eq!(parts.path, "/a/b");
        assert_eq!(parts.query, "x=1&y=2");
        assert_eq!(parts.fragment, "top");
        assert_eq!(parts.host_port(), "Example.com:8443");
        assert_eq!(parts.hostname(), "Example.com");
        assert_eq!(parts.port(), Some(8443));
    }

    #[test]
    fn test_ipv6_literal() {
        let parts = UrlParts::split("http://[::1]:8080/x");
        assert_eq!(parts.hostname(), "[::1]");
        assert_eq!(parts.port(), Some(8080));

        let parts = UrlParts::split("http://[::1]/x");
        assert_eq!(parts.port(), None);
    }

    #[test]
    fn test_bad_ports_are_absent() {
        assert_eq!(UrlParts::split("http://host:abc/").port(), None);
        assert_eq!(UrlParts::split("http://host:/").port(), None);
        assert_eq!(UrlParts::split("http://host:99999/").port(), None);
        assert_eq!(UrlParts::split("http://a:b:c/").hostname(), "a");
        assert_eq!(UrlParts::split("http://a:b:c/").port(), None);
    }

    #[test]
    fn test_no_scheme() {
        assert!(!has_scheme("example.com/login"));
        assert!(has_scheme("HTTPS://example.com"));
        assert!(!has_scheme("1http://example.com"));
        assert_eq!(with_default_scheme("  example.com/login "), "http://example.com/login");
        assert_eq!(with_default_scheme("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_garbage_never_panics() {
        for raw in ["", ":", "://", "@@@", "[", "http://[", "\u{0}\u{ffff}", "a:b:c@d:e"] {
            let parts = UrlParts::split(raw);
            let _ = parts.hostname();
            let _ = parts.port();
        }
    }
}
