use regex::RegexBuilder;

use crate::{Condition, FilterQuery};

/// Parse a raw filter string into a query. Never fails: a token whose
/// regex pattern does not compile is dropped with a warning, and empty
/// tokens or groups are discarded.
pub fn parse(raw: &str) -> FilterQuery {
    let mut query = FilterQuery::default();

    for group in tokenize(raw) {
        let Some((exclude, conditions)) = resolve_group(group) else {
            continue;
        };

        let condition = if conditions.len() == 1 {
            conditions.into_iter().next().unwrap()
        } else {
            Condition::Or(conditions)
        };

        if exclude {
            query.exclude.push(condition);
        } else {
            query.include.push(condition);
        }
    }

    query
}

/// Single left-to-right scan splitting the input into AND-groups of
/// OR-alternative tokens. Escapes are kept in the raw tokens and resolved
/// later, once per token.
struct Scanner {
    groups: Vec<Vec<String>>,
    alts: Vec<String>,
    token: String,
    in_quote: bool,
    in_regex: bool,
    escaped: bool,
}

impl Scanner {
    fn new() -> Self {
        Self {
            groups: Vec::new(),
            alts: Vec::new(),
            token: String::new(),
            in_quote: false,
            in_regex: false,
            escaped: false,
        }
    }

    fn finish_token(&mut self) {
        self.in_regex = false;
        if !self.token.is_empty() {
            self.alts.push(std::mem::take(&mut self.token));
        }
    }

    fn finish_group(&mut self) {
        self.finish_token();
        if !self.alts.is_empty() {
            self.groups.push(std::mem::take(&mut self.alts));
        }
    }
}

fn tokenize(raw: &str) -> Vec<Vec<String>> {
    let mut s = Scanner::new();

    for ch in raw.chars() {
        if s.escaped {
            s.token.push(ch);
            s.escaped = false;
            continue;
        }

        match ch {
            '\\' => {
                s.token.push(ch);
                s.escaped = true;
            }
            '"' if !s.in_regex => {
                s.in_quote = !s.in_quote;
                s.token.push(ch);
            }
            '/' if !s.in_quote => {
                // A regex literal only opens at the start of a token; the
                // next unescaped slash closes the body and trailing flag
                // characters accumulate like any other text.
                if s.in_regex {
                    s.in_regex = false;
                } else if s.token.is_empty() {
                    s.in_regex = true;
                }
                s.token.push(ch);
            }
            '|' if !s.in_quote && !s.in_regex => s.finish_token(),
            c if c.is_whitespace() && !s.in_quote && !s.in_regex => s.finish_group(),
            c => s.token.push(c),
        }
    }

    s.finish_group();
    s.groups
}

/// Resolve one AND-group of raw tokens into conditions. Returns the
/// exclusion flag and the surviving conditions, or `None` when nothing
/// survives.
fn resolve_group(mut tokens: Vec<String>) -> Option<(bool, Vec<Condition>)> {
    let mut exclude = false;

    // A leading unescaped '-' on the first token marks the whole group.
    // Escaped dashes still carry their backslash here, so a plain prefix
    // check is exact.
    if let Some(first) = tokens.first_mut() {
        if first.starts_with('-') {
            exclude = true;
            first.remove(0);
            if first.is_empty() {
                tokens.remove(0);
            }
        }
    }

    let conditions: Vec<Condition> = tokens.iter().filter_map(|t| token_condition(t)).collect();

    if conditions.is_empty() {
        None
    } else {
        Some((exclude, conditions))
    }
}

/// Convert one raw token into a condition. Regex bodies are passed to the
/// engine verbatim (their escapes belong to the regex language); quoted
/// and bare tokens are unescaped. Empty phrases are dropped.
fn token_condition(raw: &str) -> Option<Condition> {
    if let Some((body, flags)) = regex_token(raw) {
        return match build_regex(body, flags) {
            Ok(re) => Some(Condition::Regex(re)),
            Err(err) => {
                tracing::warn!(pattern = body, %err, "dropping invalid regex filter");
                None
            }
        };
    }

    let text = if let Some(inner) = quoted_token(raw) {
        unescape(inner)
    } else {
        unescape(raw)
    };

    if text.is_empty() {
        None
    } else {
        Some(Condition::Phrase(text))
    }
}

/// Split a `/body/flags` token. Returns `None` unless the token starts
/// with a slash, has a closing unescaped slash, and everything after the
/// close is drawn from the allowed flag set — otherwise the token falls
/// through as a phrase (an unterminated regex while the user is typing
/// stays visible rather than vanishing).
fn regex_token(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix('/')?;

    let mut escaped = false;
    for (idx, ch) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '/' => {
                let body = &rest[..idx];
                let flags = &rest[idx + 1..];
                if flags.chars().all(|c| matches!(c, 'g' | 'i' | 'm')) {
                    return Some((body, flags));
                }
                return None;
            }
            _ => {}
        }
    }

    None
}

/// Case-insensitivity is forced regardless of declared flags so that
/// evaluation and highlight-span enumeration always agree; `g` is
/// meaningless here (span enumeration is always global) and only `m`
/// changes compiled semantics.
fn build_regex(body: &str, flags: &str) -> Result<regex::Regex, regex::Error> {
    RegexBuilder::new(body)
        .case_insensitive(true)
        .multi_line(flags.contains('m'))
        .build()
}

/// A token wrapped in unescaped double quotes; returns the interior
fn quoted_token(raw: &str) -> Option<&str> {
    if raw.len() < 2 || !raw.starts_with('"') {
        return None;
    }

    // The final quote must not be escaped
    let mut escaped = false;
    let mut closes = false;
    for (idx, ch) in raw.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => closes = idx == raw.len() - 1,
            _ => {}
        }
    }

    if closes {
        Some(&raw[1..raw.len() - 1])
    } else {
        None
    }
}

/// Resolve `\c` → `c`. A trailing lone backslash is kept.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next) => out.push(next),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phrase(c: &Condition) -> &str {
        match c {
            Condition::Phrase(p) => p,
            other => panic!("expected phrase, got {:?}", other),
        }
    }

    #[test]
    fn test_single_bare_word() {
        let q = parse("error");
        assert_eq!(q.include.len(), 1);
        assert!(q.exclude.is_empty());
        assert_eq!(phrase(&q.include[0]), "error");
    }

    #[test]
    fn test_whitespace_splits_and_groups() {
        let q = parse("  error   disk  ");
        assert_eq!(q.include.len(), 2);
        assert_eq!(phrase(&q.include[0]), "error");
        assert_eq!(phrase(&q.include[1]), "disk");
    }

    #[test]
    fn test_pipe_builds_or_group() {
        let q = parse("error|warn");
        assert_eq!(q.include.len(), 1);
        match &q.include[0] {
            Condition::Or(members) => {
                assert_eq!(members.len(), 2);
                assert_eq!(phrase(&members[0]), "error");
                assert_eq!(phrase(&members[1]), "warn");
            }
            other => panic!("expected or, got {:?}", other),
        }
    }

    #[test]
    fn test_single_alternative_not_wrapped_in_or() {
        // Dangling pipes leave one alternative; it is pushed bare
        let q = parse("error|");
        assert_eq!(q.include.len(), 1);
        assert_eq!(phrase(&q.include[0]), "error");
    }

    #[test]
    fn test_exclusion_group() {
        let q = parse("-noise");
        assert!(q.include.is_empty());
        assert_eq!(q.exclude.len(), 1);
        assert_eq!(phrase(&q.exclude[0]), "noise");
    }

    #[test]
    fn test_escaped_dash_is_literal() {
        let q = parse(r"\-foo");
        assert!(q.exclude.is_empty());
        assert_eq!(q.include.len(), 1);
        assert_eq!(phrase(&q.include[0]), "-foo");
    }

    #[test]
    fn test_bare_dash_group_discarded() {
        let q = parse("-");
        assert!(q.is_empty());
    }

    #[test]
    fn test_quoted_phrase_keeps_whitespace_and_pipe() {
        let q = parse(r#""health check" "a|b""#);
        assert_eq!(q.include.len(), 2);
        assert_eq!(phrase(&q.include[0]), "health check");
        assert_eq!(phrase(&q.include[1]), "a|b");
    }

    #[test]
    fn test_excluded_quoted_phrase() {
        let q = parse(r#"-"health check""#);
        assert_eq!(q.exclude.len(), 1);
        assert_eq!(phrase(&q.exclude[0]), "health check");
    }

    #[test]
    fn test_escaped_quote_inside_phrase() {
        let q = parse(r#""say \"hi\"""#);
        assert_eq!(phrase(&q.include[0]), r#"say "hi""#);
    }

    #[test]
    fn test_regex_token() {
        let q = parse("/err(or)?/i");
        assert_eq!(q.include.len(), 1);
        match &q.include[0] {
            Condition::Regex(re) => {
                assert!(re.is_match("ERROR: x"));
            }
            other => panic!("expected regex, got {:?}", other),
        }
    }

    #[test]
    fn test_regex_body_may_contain_pipe_and_space() {
        let q = parse("/disk full|oom/");
        assert_eq!(q.include.len(), 1);
        match &q.include[0] {
            Condition::Regex(re) => {
                assert!(re.is_match("OOM killed"));
                assert!(re.is_match("disk full"));
            }
            other => panic!("expected regex, got {:?}", other),
        }
    }

    #[test]
    fn test_escaped_slash_inside_regex_body() {
        let q = parse(r"/api\/v1/");
        match &q.include[0] {
            Condition::Regex(re) => assert!(re.is_match("GET /api/v1/users")),
            other => panic!("expected regex, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_regex_dropped_not_fatal() {
        let q = parse("/((/ error");
        assert_eq!(q.include.len(), 1);
        assert_eq!(phrase(&q.include[0]), "error");
    }

    #[test]
    fn test_unterminated_regex_becomes_phrase() {
        let q = parse("/half");
        assert_eq!(q.include.len(), 1);
        assert_eq!(phrase(&q.include[0]), "/half");
    }

    #[test]
    fn test_slash_inside_quoted_phrase_is_literal() {
        let q = parse(r#""GET /logs""#);
        assert_eq!(phrase(&q.include[0]), "GET /logs");
    }

    #[test]
    fn test_slash_mid_token_is_literal() {
        let q = parse("app/module");
        assert_eq!(phrase(&q.include[0]), "app/module");
    }

    #[test]
    fn test_regex_with_bad_flags_falls_back_to_phrase() {
        let q = parse("/abc/x");
        assert_eq!(phrase(&q.include[0]), "/abc/x");
    }

    #[test]
    fn test_mixed_query() {
        let q = parse(r#"error|/warn/i -"health check" disk"#);
        assert_eq!(q.include.len(), 2);
        assert_eq!(q.exclude.len(), 1);
        assert!(matches!(q.include[0], Condition::Or(_)));
        assert_eq!(phrase(&q.include[1]), "disk");
        assert_eq!(phrase(&q.exclude[0]), "health check");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
        assert!(parse("   ").is_empty());
        assert!(parse("||").is_empty());
    }
}
