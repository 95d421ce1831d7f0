//! Hash-token scanning for clipboard text.
//!
//! BMS ecosystems identify a chart by the MD5 (32 hex chars) or SHA-256
//! (64 hex chars) of its file. The scanner pulls every hash-shaped run out
//! of arbitrary text, trying the longer form first at each position so a
//! 64-character run is never reported as two 32-character halves.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Hash algorithm of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashType {
    Md5,
    Sha256,
}

/// One hash-shaped substring extracted from clipboard text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HashToken {
    pub hash_type: HashType,
    pub value: String,
}

static HASH_PART_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9a-fA-F]{64}|[0-9a-fA-F]{32}").unwrap());

static MD5_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").unwrap());

static SHA256_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{64}$").unwrap());

/// Returns `true` when the whole string is an MD5 hash.
pub fn is_md5_hash(s: &str) -> bool {
    MD5_PATTERN.is_match(s)
}

/// Returns `true` when the whole string is a SHA-256 hash.
pub fn is_sha256_hash(s: &str) -> bool {
    SHA256_PATTERN.is_match(s)
}

/// Scans `text` left to right and returns every embedded hash token,
/// de-duplicated with first-occurrence order preserved.
///
/// Tokens are verbatim substrings of the input. Text without any
/// hash-shaped run yields an empty vec.
pub fn extract_hashes(text: &str) -> Vec<HashToken> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();
    for found in HASH_PART_PATTERN.find_iter(text) {
        let value = found.as_str();
        if !seen.insert(value.to_string()) {
            continue;
        }
        let hash_type = if value.len() == 64 {
            HashType::Sha256
        } else {
            HashType::Md5
        };
        tokens.push(HashToken {
            hash_type,
            value: value.to_string(),
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::{extract_hashes, is_md5_hash, is_sha256_hash, HashType};

    const MD5_A: &str = "0123456789abcdef0123456789abcdef";
    const SHA256_A: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

    #[test]
    fn test_extract_hashes_returns_empty_for_plain_text() {
        assert!(extract_hashes("no hashes in here, just words").is_empty());
        assert!(extract_hashes("").is_empty());
    }

    #[test]
    fn test_extract_hashes_finds_embedded_md5() {
        let text = format!("check this chart: {} (ranked)", MD5_A);

        let tokens = extract_hashes(&text);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].hash_type, HashType::Md5);
        assert_eq!(tokens[0].value, MD5_A);
    }

    #[test]
    fn test_extract_hashes_never_splits_sha256_into_md5_halves() {
        let tokens = extract_hashes(SHA256_A);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].hash_type, HashType::Sha256);
        assert_eq!(tokens[0].value, SHA256_A);
    }

    #[test]
    fn test_extract_hashes_isolates_sha256_at_start_of_longer_hex_run() {
        // 96 hex chars: the first 64 must come out as one SHA-256 token,
        // never as 32-char slices from within that window.
        let run = format!("{}{}", SHA256_A, "deadbeefdeadbeefdeadbeefdeadbeef");
        assert_eq!(run.len(), 96);

        let tokens = extract_hashes(&run);

        let sha256_tokens: Vec<_> = tokens
            .iter()
            .filter(|token| token.hash_type == HashType::Sha256)
            .collect();
        assert_eq!(sha256_tokens.len(), 1);
        assert_eq!(sha256_tokens[0].value, SHA256_A);
        for token in &tokens {
            assert!(!SHA256_A.contains(&token.value) || token.value == SHA256_A);
        }
    }

    #[test]
    fn test_extract_hashes_deduplicates_preserving_first_occurrence() {
        let other = "fedcba9876543210fedcba9876543210";
        let text = format!("{} {} {} {}", MD5_A, other, MD5_A, other);

        let tokens = extract_hashes(&text);

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, MD5_A);
        assert_eq!(tokens[1].value, other);
    }

    #[test]
    fn test_extract_hashes_keeps_tokens_verbatim() {
        let mixed_case = "ABCDEF0123456789abcdef0123456789";
        let text = format!("x {} y", mixed_case);

        let tokens = extract_hashes(&text);

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, mixed_case);
        assert!(text.contains(&tokens[0].value));
    }

    #[test]
    fn test_extract_hashes_only_yields_hash_sized_tokens() {
        let text = format!(
            "short deadbeef, mid {}, long {}, 40: {}",
            MD5_A, SHA256_A, "0123456789012345678901234567890123456789"
        );

        for token in extract_hashes(&text) {
            assert!(token.value.len() == 32 || token.value.len() == 64);
            assert!(text.contains(&token.value));
        }
    }

    #[test]
    fn test_full_string_classifiers() {
        assert!(is_md5_hash(MD5_A));
        assert!(!is_md5_hash(SHA256_A));
        assert!(!is_md5_hash("not a hash"));
        assert!(!is_md5_hash(&format!(" {}", MD5_A)));
        assert!(is_sha256_hash(SHA256_A));
        assert!(!is_sha256_hash(MD5_A));
    }
}
