use regex::Regex;
use std::sync::OnceLock;

fn disallowed_chars() -> &'static Regex {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    DISALLOWED.get_or_init(|| Regex::new(r"[^a-z0-9 ]").expect("normalize regex must compile"))
}

/// Canonicalize result text: lowercase, trim, keep only `[a-z0-9 ]`.
///
/// Word-presence features assume this alphabet, so title, description and query
/// all pass through here before anything is computed from them.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    disallowed_chars()
        .replace_all(lowered.trim(), "")
        .into_owned()
}

/// Split normalized text into whitespace-separated tokens.
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_lowercases() {
        assert_eq!(normalize_text("  Apple Inc. - Official Site! "), "apple inc  official site");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(normalize_text("Café №5"), "caf 5");
    }

    #[test]
    fn tokens_skip_repeated_spaces() {
        let text = normalize_text("apple  --  pie");
        assert_eq!(tokens(&text).collect::<Vec<_>>(), vec!["apple", "pie"]);
    }
}
