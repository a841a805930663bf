//! Lookup-key normalization.
//!
//! Each pass is a function `&str -> String` applied in sequence; the result
//! contains only lower-case letters and digits separated by single spaces.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::LazyLock;

use regex::Regex;

/// Turn arbitrary text into a canonical lookup key.
///
/// `normalize("<b>Hello</b>  World") == "hello world"`. Idempotent.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut result = strip_markup(text);
    result = result.to_lowercase();
    result = replace_non_alphanumeric(&result);
    collapse_whitespace(&result)
}

/// Split the normalized form of `text` into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove duplicates, keeping the first occurrence of each value in order.
pub fn dedupe<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Replace tag-like markup (`<...>`) with a space so adjacent words stay apart.
fn strip_markup(text: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    TAG_RE.replace_all(text, " ").into_owned()
}

/// Every run of characters that is not a Unicode letter or digit becomes one space.
fn replace_non_alphanumeric(text: &str) -> String {
    static NON_ALNUM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("valid regex"));

    NON_ALNUM_RE.replace_all(text, " ").into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup_and_case() {
        assert_eq!(normalize("<b>Hello</b>  World"), "hello world");
        assert_eq!(normalize("Line<br/>Break"), "line break");
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("  --- !!! "), "");
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn keeps_unicode_letters_and_digits() {
        assert_eq!(normalize("서울 마포구, 연남동 123-4"), "서울 마포구 연남동 123 4");
        assert_eq!(normalize("Café  AU-LAIT"), "café au lait");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "<b>Hello</b>  World",
            "İstanbul ŞEHİR",
            "a < b > c",
            "ΣΊΣΥΦΟΣ   σίσυφος",
            "카페/디저트 (연남)",
            "\t tab\nnew line ",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn normalize_is_case_insensitive() {
        assert_eq!(normalize("COFFEE Shop"), normalize("coffee shop"));
        assert_eq!(normalize("ÀÉÎ"), normalize("àéî"));
    }

    #[test]
    fn tokenize_splits_normalized_text() {
        assert_eq!(
            tokenize("서울 마포구, 연남동!"),
            vec!["서울".to_string(), "마포구".into(), "연남동".into()]
        );
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        assert_eq!(dedupe(vec!["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
        assert_eq!(dedupe(Vec::<String>::new()), Vec::<String>::new());
    }
}
