use std::collections::HashMap;

use regex::Regex;

use crate::{Condition, FilterQuery};

/// Build a per-character highlight mask for `text`: one slot per char,
/// `true` where at least one include condition matches.
///
/// Only include conditions highlight; `Or` members are flattened into
/// one flat rule list and overlapping marks simply OR together.
pub fn build_mask(text: &str, query: &FilterQuery) -> Vec<bool> {
    let mut mask = vec![false; text.chars().count()];
    if mask.is_empty() || query.include.is_empty() {
        return mask;
    }

    let mut rules: Vec<&Condition> = Vec::new();
    for condition in &query.include {
        match condition {
            Condition::Or(members) => rules.extend(members.iter()),
            other => rules.push(other),
        }
    }

    // Regex matches report byte offsets; the mask is char-indexed
    let byte_to_char: HashMap<usize, usize> = text
        .char_indices()
        .enumerate()
        .map(|(char_idx, (byte_idx, _))| (byte_idx, char_idx))
        .collect();

    for rule in rules {
        match rule {
            Condition::Phrase(phrase) => mark_phrase(&mut mask, text, phrase),
            Condition::Regex(re) => mark_regex(&mut mask, text, re, &byte_to_char),
            Condition::Or(_) => {}
        }
    }

    mask
}

/// Per-char lowercase folding that keeps a 1:1 alignment with the input
/// (full `to_lowercase` can change the char count)
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Mark all case-insensitive non-overlapping occurrences of `phrase`
fn mark_phrase(mask: &mut [bool], text: &str, phrase: &str) {
    let hay: Vec<char> = text.chars().map(fold).collect();
    let needle: Vec<char> = phrase.chars().map(fold).collect();
    if needle.is_empty() || needle.len() > hay.len() {
        return;
    }

    let mut pos = 0;
    while pos + needle.len() <= hay.len() {
        if hay[pos..pos + needle.len()] == needle[..] {
            for slot in &mut mask[pos..pos + needle.len()] {
                *slot = true;
            }
            // A zero-length needle cannot occur, but never advance by 0
            pos += needle.len().max(1);
        } else {
            pos += 1;
        }
    }
}

/// Mark all regex match spans. A zero-length match aborts this rule's
/// scan; patterns like `x*` match the empty string at every position and
/// would otherwise mark nothing useful forever.
fn mark_regex(mask: &mut [bool], text: &str, re: &Regex, byte_to_char: &HashMap<usize, usize>) {
    for m in re.find_iter(text) {
        if m.start() == m.end() {
            break;
        }

        let start = byte_to_char[&m.start()];
        let end = if m.end() == text.len() {
            mask.len()
        } else {
            byte_to_char[&m.end()]
        };

        for slot in &mut mask[start..end] {
            *slot = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn mask_str(mask: &[bool]) -> String {
        mask.iter().map(|&m| if m { 'x' } else { '.' }).collect()
    }

    #[test]
    fn test_mask_length_equals_char_count() {
        let q = parse("err");
        let text = "héllo error ─── done";
        assert_eq!(build_mask(text, &q).len(), text.chars().count());
    }

    #[test]
    fn test_phrase_marks_all_occurrences_case_insensitive() {
        let q = parse("err");
        let mask = build_mask("Err then ERR", &q);
        assert_eq!(mask_str(&mask), "xxx......xxx");
    }

    #[test]
    fn test_exclude_conditions_never_highlight() {
        let q = parse("-err");
        let mask = build_mask("err", &q);
        assert_eq!(mask_str(&mask), "...");
    }

    #[test]
    fn test_or_members_flattened() {
        let q = parse("disk|full");
        let mask = build_mask("disk full", &q);
        assert_eq!(mask_str(&mask), "xxxx.xxxx");
    }

    #[test]
    fn test_overlapping_rules_or_together() {
        let q = parse("abcd bcde");
        let mask = build_mask("xabcdex", &q);
        assert_eq!(mask_str(&mask), ".xxxxx.");
    }

    #[test]
    fn test_regex_spans() {
        let q = parse("/er+/");
        let mask = build_mask("error herr", &q);
        assert_eq!(mask_str(&mask), "xxx....xxx");
    }

    #[test]
    fn test_zero_length_regex_match_terminates() {
        let q = parse("/x*/");
        // Matches empty at position 0 and must abort instead of looping
        let mask = build_mask("abc", &q);
        assert_eq!(mask.len(), 3);
    }

    #[test]
    fn test_regex_match_at_end_of_multibyte_text() {
        let q = parse("/done/");
        let text = "résumé done";
        let mask = build_mask(text, &q);
        assert_eq!(mask.len(), text.chars().count());
        assert!(mask[mask.len() - 1]);
        assert!(mask[mask.len() - 4]);
        assert!(!mask[0]);
    }

    #[test]
    fn test_empty_query_all_false() {
        let mask = build_mask("anything", &parse(""));
        assert!(mask.iter().all(|&m| !m));
    }
}
