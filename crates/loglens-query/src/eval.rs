use crate::{Condition, FilterQuery};

/// Decide whether one record's rendered text passes the query.
///
/// Exclusion has priority and short-circuits; an empty include list
/// passes everything; otherwise every include element must match, where
/// an `Or` element matches if any member does.
pub fn evaluate(text: &str, query: &FilterQuery) -> bool {
    if query.exclude.iter().any(|c| condition_matches(text, c)) {
        return false;
    }

    if query.include.is_empty() {
        return true;
    }

    query.include.iter().all(|c| condition_matches(text, c))
}

fn condition_matches(text: &str, condition: &Condition) -> bool {
    match condition {
        Condition::Phrase(phrase) => text.to_lowercase().contains(&phrase.to_lowercase()),
        Condition::Regex(re) => re.is_match(text),
        Condition::Or(members) => members.iter().any(|m| condition_matches(text, m)),
    }
}
