use tracing::debug;
use url::Url;

use crate::parts::{with_default_scheme, UrlParts, DEFAULT_SCHEME};

/// Normalizes a raw URL so syntactic variants score identically.
///
/// Scheme and host are lowercased, leading `www.` labels dropped, default
/// ports removed, trailing slashes trimmed (an empty path becomes `/`) and
/// the query and fragment discarded. Everything else is carried through
/// as written: no dot-segment resolution, percent-encoding, IDNA or IPv4
/// rewriting, so the features see what the user was shown.
pub fn canonicalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let candidate = with_default_scheme(trimmed);
    let parts = UrlParts::split(&candidate);
    let scheme = if parts.scheme.is_empty() {
        DEFAULT_SCHEME
    } else {
        parts.scheme
    };
    let canonical = assemble(scheme, parts.hostname(), parts.port(), parts.path);

    if Url::parse(&canonical).is_err() {
        debug!(input = %trimmed, canonical = %canonical, "canonical form is not a strictly valid url");
    }
    canonical
}

fn assemble(scheme: &str, host: &str, port: Option<u16>, path: &str) -> String {
    let scheme = scheme.to_ascii_lowercase();
    let host = host.to_lowercase();
    let host = strip_www(&host);

    let netloc = match port {
        Some(port) if !is_default_port(&scheme, port) => format!("{host}:{port}"),
        _ => host.to_string(),
    };

    format!("{scheme}://{netloc}{}", normalize_path(path))
}

/// Drops leading `www.` labels, never leaving the host empty.
fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        if rest.is_empty() {
            break;
        }
        host = rest;
    }
    host
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
