use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};
use tracing::debug;

use crate::{
    parts::{with_default_scheme, UrlParts},
    suffix::SuffixLookup,
};

pub const SUSPICIOUS_TOKENS: [&str; 12] = [
    "login", "verify", "update", "secure", "account", "bank", "signin", "confirm", "password",
    "webscr", "invoice", "billing",
];

pub const SHORTENER_DOMAINS: [&str; 7] = [
    "bit.ly",
    "tinyurl.com",
    "t.co",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
];

static IP_SHAPED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,3}(\.[0-9]{1,3}){3}$").expect("IP pattern is valid")
});

/// Declares the feature record and its name table from a single list so the
/// two can never drift apart.
macro_rules! feature_vector {
    ($($name:ident),+ $(,)?) => {
        /// Fixed-order numeric encoding of a URL. The classifier was trained
        /// against exactly this field order.
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        pub struct FeatureVector {
            $(pub $name: f64,)+
        }

        pub const FEATURE_NAMES: &[&str] = &[$(stringify!($name)),+];

        impl FeatureVector {
            /// Values in `FEATURE_NAMES` order.
            pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
                [$(self.$name),+]
            }
        }
    };
}

feature_vector!(
    url_len,
    host_len,
    path_len,
    query_len,
    num_dots,
    num_digits,
    num_special,
    num_params,
    has_ip_host,
    uses_https,
    has_at_symbol,
    has_double_slash_in_path,
    num_subdomains,
    tld_len,
    host_entropy,
    path_entropy,
    suspicious_token_count,
    is_shortener,
);

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

const _: () = assert!(FEATURE_COUNT == 18);

impl FeatureVector {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.iter().copied().zip(self.as_array())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

pub struct FeatureExtractor {
    suffixes: Arc<dyn SuffixLookup>,
}

impl FeatureExtractor {
    pub fn new(suffixes: Arc<dyn SuffixLookup>) -> Self {
        Self { suffixes }
    }

    /// Never fails: anything that cannot be computed stays at 0.0.
    pub fn extract(&self, url: &str) -> FeatureVector {
        let url = with_default_scheme(url);
        let parts = UrlParts::split(&url);

        let host = parts.authority.to_lowercase();
        let path = percent_decode_str(parts.path).decode_utf8_lossy();
        let query = parts.query;
        let split = self.suffixes.split(parts.hostname());

        let lowered = url.to_lowercase();
        let registrable = split.registrable();

        let features = FeatureVector {
            url_len: char_len(&url),
            host_len: char_len(&host),
            path_len: char_len(&path),
            query_len: char_len(query),
            num_dots: host.matches('.').count() as f64,
            num_digits: url.chars().filter(|c| c.is_ascii_digit()).count() as f64,
            num_special: url.chars().filter(|c| !c.is_ascii_alphanumeric()).count() as f64,
            num_params: if query.is_empty() {
                0.0
            } else {
                query.split('&').count() as f64
            },
            has_ip_host: flag(is_ip_shaped(host.split(':').next().unwrap_or(""))),
            uses_https: flag(parts.scheme.eq_ignore_ascii_case("https")),
            has_at_symbol: flag(url.contains('@')),
            has_double_slash_in_path: flag(parts.path.contains("//")),
            num_subdomains: split.subdomain_count() as f64,
            tld_len: char_len(&split.suffix),
            host_entropy: shannon_entropy(&host),
            path_entropy: shannon_entropy(&path),
            suspicious_token_count: count_suspicious_tokens(&lowered) as f64,
            is_shortener: flag(SHORTENER_DOMAINS.contains(&registrable.as_str())),
        };

        debug!(url = %url, ?features, "extracted features");
        features
    }

    pub fn vectorize(&self, url: &str) -> [f64; FEATURE_COUNT] {
        self.extract(url).as_array()
    }
}

/// Four dot-separated groups of one to three digits. No range check:
/// `999.999.999.999` counts.
pub fn is_ip_shaped(host: &str) -> bool {
    IP_SHAPED.is_match(host)
}

/// Number of distinct suspicious tokens present in the lowercased URL.
pub fn count_suspicious_tokens(lowered: &str) -> usize {
    SUSPICIOUS_TOKENS
        .iter()
        .filter(|token| lowered.contains(*token))
        .count()
}

/// Shannon entropy in bits over the character distribution. Empty input is 0.
pub fn shannon_entropy(text: &str) -> f64 {
    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total = 0usize;
    for ch in text.chars() {
        *counts.entry(ch).or_insert(0) += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    counts
        .values()
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.log2()
        })
        .sum()
}

fn char_len(text: &str) -> f64 {
    text.chars().count() as f64
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
