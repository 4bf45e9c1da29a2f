// Product label canonicalization
//
// Connectors hand us product names with markdown links, stray markup and
// inconsistent casing. Everything that groups or compares products goes
// through `normalize_label` so "sales", "Sales" and "[Sales](https://...)"
// all land on the same filter value.
use once_cell::sync::Lazy;
use regex::Regex;

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("valid regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static BARE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid regex"));
static SQUARE_BRACKETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]]").expect("valid regex"));
static EMPTY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\s*\)").expect("valid regex"));

/// Canonical form of a free-text product or app name
pub fn normalize_label(raw: &str) -> String {
    let text = HTML_TAG.replace_all(raw, " ");
    let text = MARKDOWN_LINK.replace_all(&text, "$1");
    let text = BARE_URL.replace_all(&text, " ");
    let mut text = SQUARE_BRACKETS.replace_all(&text, " ").into_owned();
    // "( ( ) )" only empties from the inside out
    while EMPTY_PARENS.is_match(&text) {
        text = EMPTY_PARENS.replace_all(&text, " ").into_owned();
    }

    text.split_whitespace()
        .map(title_case_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_token(token: &str) -> String {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    // Characters like 'ß' uppercase to two chars; keep them so a second pass agrees
    let head = match (upper.next(), upper.next()) {
        (Some(single), None) => single.to_string(),
        _ => first.to_string(),
    };

    let rest: String = chars.flat_map(char::to_lowercase).collect();
    format!("{}{}", head, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_case_variants_collapse() {
        assert_eq!(normalize_label("sales"), "Sales");
        assert_eq!(normalize_label("SALES"), "Sales");
        assert_eq!(normalize_label("  Sales \n"), "Sales");
    }

    #[test]
    fn test_markdown_link_keeps_text() {
        assert_eq!(
            normalize_label("[Customer   Insights](https://learn.example.com/ci)"),
            "Customer Insights"
        );
    }

    #[test]
    fn test_bare_urls_and_brackets_removed() {
        assert_eq!(
            normalize_label("Field service https://example.com/fs [preview]"),
            "Field Service Preview"
        );
        assert_eq!(normalize_label("Finance ()"), "Finance");
        assert_eq!(normalize_label("Finance ( ( ) )"), "Finance");
        assert_eq!(normalize_label("<b>Supply</b> chain"), "Supply Chain");
    }

    #[test]
    fn test_numbers_and_punctuation_pass_through() {
        assert_eq!(normalize_label("dynamics 365 sales"), "Dynamics 365 Sales");
        assert_eq!(normalize_label("power-apps (online)"), "Power-apps (online)");
    }

    #[test]
    fn test_empty_after_cleanup() {
        assert_eq!(normalize_label("[](https://example.com)"), "");
        assert_eq!(normalize_label("   "), "");
    }

    proptest! {
        #[test]
        fn normalize_label_is_idempotent(raw in "\\PC{0,40}") {
            let once = normalize_label(&raw);
            prop_assert_eq!(normalize_label(&once), once);
        }

        #[test]
        fn link_wrapping_does_not_change_label(name in "[a-zA-Z]{1,10}( [a-zA-Z0-9]{1,8}){0,3}") {
            let wrapped = format!("[{}](https://example.com/x)", name.to_uppercase());
            prop_assert_eq!(normalize_label(&wrapped), normalize_label(&name));
        }
    }
}
