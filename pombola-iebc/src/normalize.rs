//! Name and place normalization
//!
//! IEBC spellings differ from ours in whitespace, capitalisation and the
//! separators used in compound ward names. These helpers bring both sides to
//! a common form before slugs are compared.

use once_cell::sync::Lazy;
use pombola_common::slugify;
use regex::Regex;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static COMPOUND_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r" *([/-]) *").unwrap());

/// Tidy a personal name: single spaces, plain apostrophes, no stray
/// leading/trailing commas or full stops
pub fn normalize_name(name: &str) -> String {
    let name = name.replace(['\u{2018}', '\u{2019}', '`'], "'");
    let collapsed = WHITESPACE.replace_all(name.trim(), " ");
    collapsed
        .trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
        .to_string()
}

/// Capitalise the first letter of every run of letters, lowercase the rest
///
/// `"o'NEIL wa-MUNGAI"` becomes `"O'Neil Wa-Mungai"`.
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}

/// Put exactly one space either side of `/` and `-` between words
///
/// Ward and county names in the database were normalized this way.
pub fn normalize_compound_separators(name: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

    let mut result = String::with_capacity(name.len() + 4);
    let mut last = 0;
    for caps in COMPOUND_SEPARATOR.captures_iter(name) {
        let Some(whole) = caps.get(0) else { continue };
        let before = name[..whole.start()].chars().next_back();
        let after = name[whole.end()..].chars().next();
        if is_word(before) && is_word(after) {
            result.push_str(&name[last..whole.start()]);
            result.push(' ');
            result.push_str(&caps[1]);
            result.push(' ');
            last = whole.end();
        }
    }
    result.push_str(&name[last..]);
    result
}

/// Slug a place of the given kind is stored under
pub fn place_slug(name: &str, kind_slug: &str) -> String {
    let name = match kind_slug {
        "ward" | "county" => normalize_compound_separators(name),
        _ => name.to_string(),
    };
    let slug = slugify(&name);
    match kind_slug {
        "ward" => format!("ward-{}", slug),
        "county" => format!("{}-county", slug),
        "constituency" => format!("{}-2013", slug),
        _ => slug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  JOHN   MBADI  "), "JOHN MBADI");
        assert_eq!(normalize_name("Ng\u{2019}ang\u{2019}a,"), "Ng'ang'a");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name(" . "), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("JOHN MBADI NG'ONGO"), "John Mbadi Ng'Ongo");
        assert_eq!(title_case("wa-mungai"), "Wa-Mungai");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_compound_separators() {
        assert_eq!(normalize_compound_separators("Kabete/Kiambaa"), "Kabete / Kiambaa");
        assert_eq!(normalize_compound_separators("Kabete  -Kiambaa"), "Kabete - Kiambaa");
        assert_eq!(normalize_compound_separators("A-B-C"), "A - B - C");
        assert_eq!(normalize_compound_separators("Nairobi West"), "Nairobi West");
    }

    #[test]
    fn test_place_slug_by_kind() {
        assert_eq!(place_slug("Kabete/Kiambaa", "ward"), "ward-kabete-kiambaa");
        assert_eq!(place_slug("TAITA TAVETA", "county"), "taita-taveta-county");
        assert_eq!(place_slug("Ruaraka", "constituency"), "ruaraka-2013");
        assert_eq!(place_slug("Somewhere", "province"), "somewhere");
    }
}
