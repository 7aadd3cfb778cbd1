use publicsuffix::{List, Psl};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::features::is_ip_shaped;

const BUNDLED_LIST: &str = include_str!("../data/public_suffix_list.dat");
const PRIVATE_SECTION_MARKER: &str = "// ===BEGIN PRIVATE DOMAINS===";

#[derive(Error, Debug)]
pub enum SuffixListError {
    #[error("failed to read public suffix list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse public suffix list: {0}")]
    Parse(String),
}

/// Registrable-domain split of a host name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSplit {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl HostSplit {
    /// `domain.suffix`, skipping whichever part is empty.
    pub fn registrable(&self) -> String {
        match (self.domain.is_empty(), self.suffix.is_empty()) {
            (false, false) => format!("{}.{}", self.domain, self.suffix),
            (false, true) => self.domain.clone(),
            (true, _) => self.suffix.clone(),
        }
    }

    pub fn subdomain_count(&self) -> usize {
        if self.subdomain.is_empty() {
            0
        } else {
            self.subdomain.split('.').count()
        }
    }
}

/// Effective-TLD lookup used by feature extraction.
pub trait SuffixLookup: Send + Sync {
    fn split(&self, host: &str) -> HostSplit;
}

pub struct PublicSuffixTable {
    list: List,
}

impl PublicSuffixTable {
    /// The snapshot compiled into the binary.
    pub fn bundled(include_private: bool) -> Result<Self, SuffixListError> {
        Self::parse(BUNDLED_LIST, include_private)
    }

    pub fn from_file(path: &Path, include_private: bool) -> Result<Self, SuffixListError> {
        let text = std::fs::read_to_string(path).map_err(|source| SuffixListError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(&text, include_private)?;
        info!("Loaded public suffix list from {}", path.display());
        Ok(table)
    }

    /// Bundled snapshot unless a path is configured.
    pub fn load(path: Option<&Path>, include_private: bool) -> Result<Self, SuffixListError> {
        match path {
            Some(path) => Self::from_file(path, include_private),
            None => Self::bundled(include_private),
        }
    }

    fn parse(text: &str, include_private: bool) -> Result<Self, SuffixListError> {
        let text = if include_private {
            text
        } else {
            text.split(PRIVATE_SECTION_MARKER).next().unwrap_or(text)
        };
        let list: List = text
            .parse()
            .map_err(|e: publicsuffix::Error| SuffixListError::Parse(e.to_string()))?;
        debug!(include_private, "public suffix table ready");
        Ok(Self { list })
    }

    fn known_suffix<'a>(&self, host: &'a str) -> Option<&'a str> {
        let suffix = self.list.suffix(host.as_bytes())?;
        if !suffix.is_known() {
            return None;
        }
        let len = suffix.as_bytes().len();
        host.get(host.len().checked_sub(len)?..)
    }
}

impl SuffixLookup for PublicSuffixTable {
    fn split(&self, host: &str) -> HostSplit {
        let host = host.trim_end_matches('.').to_lowercase();

        if host.is_empty() || host.starts_with('[') || is_ip_shaped(&host) {
            return HostSplit {
                domain: host,
                ..HostSplit::default()
            };
        }

        let (rest, suffix) = match self.known_suffix(&host) {
            Some(suffix) if suffix.len() == host.len() => {
                return HostSplit {
                    suffix: host.clone(),
                    ..HostSplit::default()
                };
            }
            Some(suffix) => {
                let rest = host
                    .strip_suffix(suffix)
                    .and_then(|rest| rest.strip_suffix('.'))
                    .unwrap_or(host.as_str());
                (rest, suffix)
            }
            // Not in the list: the last label is the domain.
            None => (host.as_str(), ""),
        };

        let (subdomain, domain) = match rest.rsplit_once('.') {
            Some((subdomain, domain)) => (subdomain, domain),
            None => ("", rest),
        };

        HostSplit {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            suffix: suffix.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> PublicSuffixTable {
        PublicSuffixTable::bundled(false).expect("bundled list parses")
    }

    fn split(host: &str) -> HostSplit {
        table().split(host)
    }

    #[test]
    fn test_simple_split() {
        let s = split("login.secure.example.com");
        assert_eq!(s.subdomain, "login.secure");
        assert_eq!(s.domain, "example");
        assert_eq!(s.suffix, "com");
        assert_eq!(s.registrable(), "example.com");
        assert_eq!(s.subdomain_count(), 2);
    }

    #[test]
    fn test_bundled_list_is_complete() {
        let s = split("a.b.example.com.tr");
        assert_eq!(s.suffix, "com.tr");
        assert_eq!(s.domain, "example");
        assert_eq!(s.subdomain, "a.b");

        assert_eq!(split("shop.example.co.id").suffix, "co.id");
        assert_eq!(split("news.example.com.ng").suffix, "com.ng");
        assert_eq!(split("login.example.pw").registrable(), "example.pw");
    }

    #[test]
    fn test_multi_label_suffix() {
        let s = split("www.bbc.co.uk");
        assert_eq!(s.suffix, "co.uk");
        assert_eq!(s.domain, "bbc");
        assert_eq!(s.subdomain, "www");
    }

    #[test]
    fn test_wildcard_rule() {
        let s = split("shop.example.co.ck");
        assert_eq!(s.suffix, "co.ck");
        assert_eq!(s.domain, "example");
        assert_eq!(s.subdomain, "shop");
    }

    #[test]
    fn test_shortener_registrable() {
        assert_eq!(split("bit.ly").registrable(), "bit.ly");
        assert_eq!(split("t.co").registrable(), "t.co");
        assert_eq!(split("goo.gl").registrable(), "goo.gl");
    }

    #[test]
    fn test_unknown_tld_uses_last_label() {
        let s = split("foo.bar.notatld");
        assert_eq!(s.suffix, "");
        assert_eq!(s.domain, "notatld");
        assert_eq!(s.subdomain, "foo.bar");
        assert_eq!(s.registrable(), "notatld");
    }

    #[test]
    fn test_ip_and_empty_hosts() {
        let s = split("192.168.1.1");
        assert_eq!(s.domain, "192.168.1.1");
        assert_eq!(s.suffix, "");
        assert_eq!(s.subdomain_count(), 0);

        assert_eq!(split(""), HostSplit::default());
        assert_eq!(split("[::1]").suffix, "");
    }

    #[test]
    fn test_host_equal_to_suffix() {
        let s = split("co.uk");
        assert_eq!(s.domain, "");
        assert_eq!(s.suffix, "co.uk");
        assert_eq!(s.registrable(), "co.uk");
    }

    #[test]
    fn test_private_rules_are_opt_in() {
        let icann = table().split("someone.github.io");
        assert_eq!(icann.suffix, "io");
        assert_eq!(icann.domain, "github");

        let private = PublicSuffixTable::bundled(true)
            .expect("bundled list parses")
            .split("someone.github.io");
        assert_eq!(private.suffix, "github.io");
        assert_eq!(private.domain, "someone");
    }

    #[test]
    fn test_from_file_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psl.dat");
        std::fs::write(&path, "// ===BEGIN ICANN DOMAINS===\ncom\nexample\n").unwrap();
        let table = PublicSuffixTable::from_file(&path, false).unwrap();
        assert_eq!(table.split("a.b.example").domain, "b");

        let missing = PublicSuffixTable::from_file(&dir.path().join("nope.dat"), false);
        assert!(matches!(missing, Err(SuffixListError::Io { .. })));
    }
}
