//! Document id sanitizing.
//!
//! # Invariants
//! - Stored ids match `[A-Za-z0-9_-]{1,80}`.
//! - Sanitizing never yields an empty id.

use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Maximum length of a stored document id.
pub const MAX_DOCUMENT_ID_LEN: usize = 80;

static SAFE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,80}$").expect("valid document id regex"));
static UNSAFE_CHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid unsafe char regex"));

/// Returns whether `value` is already a storable document id.
pub fn is_valid_document_id(value: &str) -> bool {
    SAFE_ID_RE.is_match(value)
}

/// Maps a caller-requested id onto the safe charset.
///
/// Unsafe characters, whitespace included, become `_`. The result is capped at
/// 80 characters and an empty request yields a generated id.
pub fn sanitize_document_id(requested: &str) -> String {
    let replaced = UNSAFE_CHAR_RE.replace_all(requested, "_");
    let truncated: String = replaced.chars().take(MAX_DOCUMENT_ID_LEN).collect();
    if truncated.is_empty() {
        return generated_document_id();
    }
    truncated
}

/// Appends the collision suffix `-n`, trimming the base so the result still
/// fits the length cap.
pub fn with_collision_suffix(base: &str, attempt: u32) -> String {
    let suffix = format!("-{attempt}");
    let keep = MAX_DOCUMENT_ID_LEN.saturating_sub(suffix.len());
    let trimmed: String = base.chars().take(keep).collect();
    format!("{trimmed}{suffix}")
}

fn generated_document_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("doc-{}", &simple[..12])
}

#[cfg(test)]
mod tests {
    use super::{
        is_valid_document_id, sanitize_document_id, with_collision_suffix, MAX_DOCUMENT_ID_LEN,
    };

    #[test]
    fn replaces_unsafe_characters_with_underscore() {
        assert_eq!(sanitize_document_id("my model/v2.json"), "my_model_v2_json");
        assert_eq!(sanitize_document_id("../etc"), "___etc");
        assert_eq!(sanitize_document_id("Démo"), "D_mo");
    }

    #[test]
    fn whitespace_is_replaced_not_trimmed() {
        assert_eq!(sanitize_document_id(" demo "), "_demo_");
        assert_eq!(sanitize_document_id("   "), "___");
    }

    #[test]
    fn keeps_safe_ids_unchanged() {
        assert_eq!(sanitize_document_id("demo_1-a"), "demo_1-a");
    }

    #[test]
    fn empty_request_generates_valid_id() {
        let generated = sanitize_document_id("");
        assert!(generated.starts_with("doc-"));
        assert!(is_valid_document_id(&generated));
    }

    #[test]
    fn caps_length_and_keeps_suffix_within_cap() {
        let long = "x".repeat(200);
        let sanitized = sanitize_document_id(&long);
        assert_eq!(sanitized.len(), MAX_DOCUMENT_ID_LEN);

        let suffixed = with_collision_suffix(&sanitized, 12);
        assert_eq!(suffixed.len(), MAX_DOCUMENT_ID_LEN);
        assert!(suffixed.ends_with("-12"));
        assert!(is_valid_document_id(&suffixed));
    }

    #[test]
    fn validity_check_matches_charset() {
        assert!(is_valid_document_id("demo-2"));
        assert!(!is_valid_document_id(""));
        assert!(!is_valid_document_id("a.b"));
        assert!(!is_valid_document_id(&"y".repeat(81)));
    }
}
