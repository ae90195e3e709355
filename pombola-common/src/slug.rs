//! Slug generation
//!
//! Slugs are the stable URL keys for people, places and organisations. The
//! rules match the ones the website has always used so that slugs computed
//! here line up with slugs already in the database.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());
static NUMERIC_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d*$").unwrap());

/// Convert text to a slug: ASCII, lowercase, words joined by `-`
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let cleaned = DISALLOWED.replace_all(&ascii, "");
    let lowered = cleaned.trim().to_lowercase();
    SEPARATORS.replace_all(&lowered, "-").into_owned()
}

/// `slug` with any trailing number replaced by `-<suffix>`
///
/// Used to search for a free slug: `john-doe`, `john-doe-2`, `john-doe-3`...
pub fn with_numeric_suffix(slug: &str, suffix: u32) -> String {
    format!("{}-{}", NUMERIC_SUFFIX.replace(slug, ""), suffix)
}
