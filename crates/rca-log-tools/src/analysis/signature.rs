//! Error message signatures, the clustering key.

use std::hash::Hasher;
use std::sync::LazyLock;

use fnv::FnvHasher;
use regex::Regex;

static RE_BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());

static RE_UUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b").unwrap()
});

static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static RE_WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an error message to its signature.
///
/// Bracketed identifiers become `<id>`, UUIDs `<uuid>`, digit runs `<n>`;
/// the result is lower-cased with whitespace collapsed.
pub fn normalize(message: &str) -> String {
    let s = RE_BRACKETED.replace_all(message, "<id>");
    let s = RE_UUID.replace_all(&s, "<uuid>");
    let s = RE_DIGITS.replace_all(&s, "<n>");
    let s = s.to_lowercase();
    RE_WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Stable identifier of a signature (64-bit FNV-1a, hex).
///
/// Depends only on the signature text, so it does not change with record
/// order, process or toolchain.
pub fn cluster_id(signature: &str) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(signature.as_bytes());
    format!("c-{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_collapse() {
        assert_eq!(normalize("conn timeout to db-1"), "conn timeout to db-<n>");
        assert_eq!(
            normalize("conn timeout to db-1"),
            normalize("conn timeout to db-2")
        );
    }

    #[test]
    fn uuid_replaced_before_digits() {
        assert_eq!(
            normalize("request 6F1C2A9E-1b7d-4c1e-9a51-2d0f7b3e8a10 failed"),
            "request <uuid> failed"
        );
    }

    #[test]
    fn bracketed_identifiers() {
        assert_eq!(normalize("502 from service-api [req-7]"), "<n> from service-api <id>");
        assert_eq!(
            normalize("[pod/api-7d9f] crashed"),
            normalize("[pod/api-x2k4] crashed")
        );
    }

    #[test]
    fn case_and_whitespace() {
        assert_eq!(normalize("  Connection   REFUSED\t "), "connection refused");
    }

    #[test]
    fn cluster_ids_are_stable() {
        assert_eq!(cluster_id("abc"), cluster_id("abc"));
        assert_ne!(cluster_id("abc"), cluster_id("abd"));
        assert_eq!(cluster_id("a"), "c-af63dc4c8601ec8c");
        // FNV-1a of the empty string is the offset basis
        assert_eq!(cluster_id(""), "c-cbf29ce484222325");
    }
}
