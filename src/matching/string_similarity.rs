//! String similarity helpers for names and expression text.

use std::collections::HashSet;

use crate::model::Name;

/// Jaro-Winkler similarity of the local parts of two names.
///
/// Module prefixes and owner paths are ignored: `default::Foo.bar` and
/// `default::Foo.baz` compare as `bar` against `baz`.
#[must_use]
pub fn local_name_similarity(a: &Name, b: &Name) -> f64 {
    let (la, lb) = (a.local(), b.local());
    if la == lb {
        return 1.0;
    }
    strsim::jaro_winkler(&la.to_lowercase(), &lb.to_lowercase())
}

/// Collapse runs of whitespace so formatting changes do not count as edits.
#[must_use]
pub fn normalize_expression(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Jaccard index over expression tokens.
///
/// Tokens are identifiers (qualified names kept whole), numbers and single
/// punctuation characters.
#[must_use]
pub fn compute_token_similarity(expr_a: &str, expr_b: &str) -> f64 {
    let tokens_a: HashSet<&str> = tokenize(expr_a).collect();
    let tokens_b: HashSet<&str> = tokenize(expr_b).collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    intersection as f64 / union as f64
}

fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == ':';
    let mut rest = text;
    std::iter::from_fn(move || {
        rest = rest.trim_start();
        let first = rest.chars().next()?;
        let len = if is_word(first) {
            rest.find(|c: char| !is_word(c)).unwrap_or(rest.len())
        } else {
            first.len_utf8()
        };
        let (token, tail) = rest.split_at(len);
        rest = tail;
        Some(token)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_similarity_ignores_prefix() {
        let same = local_name_similarity(&Name::from("a::Foo.bar"), &Name::from("b::Qux.bar"));
        assert!((same - 1.0).abs() < f64::EPSILON);

        let close = local_name_similarity(&Name::from("a::Foo.bar"), &Name::from("a::Foo.baz"));
        assert!(close > 0.8 && close < 1.0, "{close}");

        let far = local_name_similarity(&Name::from("a::Foo"), &Name::from("a::Qux"));
        assert!(far < 0.5, "{far}");
    }

    #[test]
    fn test_normalize_expression() {
        assert_eq!(normalize_expression("  a +\n   b "), "a + b");
    }

    #[test]
    fn test_token_similarity() {
        assert!((compute_token_similarity("len(.name) > 3", "len(.name) > 3") - 1.0).abs() < f64::EPSILON);
        let partial = compute_token_similarity("len(.name) > 3", "len(.title) > 3");
        assert!(partial > 0.5 && partial < 1.0, "{partial}");
        assert!((compute_token_similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert_eq!(compute_token_similarity("a", ""), 0.0);
    }

    #[test]
    fn test_tokenize_keeps_qualified_names() {
        let tokens: Vec<&str> = tokenize("std::len(x)+1").collect();
        assert_eq!(tokens, vec!["std::len", "(", "x", ")", "+", "1"]);
    }
}
