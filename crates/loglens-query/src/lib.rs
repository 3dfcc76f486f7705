//! Filter query engine for loglens
//!
//! Parses the free-text filter language into a [`FilterQuery`], evaluates
//! records against it, and builds per-character highlight masks for
//! matching text.
//!
//! Grammar: whitespace-separated AND-groups; `|` joins OR-alternatives
//! within a group; a group prefixed with an unescaped `-` is an
//! exclusion; tokens may be quoted phrases (`"..."`), slash-delimited
//! regular expressions (`/pattern/flags`, flags from g/i/m) or bare
//! words; backslash escapes any character.
//!
//! The parser and evaluator are pure functions with no retained state.

mod eval;
mod highlight;
mod parse;

pub use eval::evaluate;
pub use highlight::build_mask;
pub use parse::parse;

use regex::Regex;

/// One matchable unit of a filter query
#[derive(Clone, Debug)]
pub enum Condition {
    /// Case-insensitive substring match. Never holds an empty string.
    Phrase(String),
    /// Compiled regular expression, always case-insensitive
    Regex(Regex),
    /// `|`-joined alternatives within one AND-group; matches when any
    /// member matches. Never nested inside another `Or`.
    Or(Vec<Condition>),
}

/// A parsed filter query. Every `include` element must match (AND); an
/// empty `include` passes everything. Any matching `exclude` element
/// hides the record regardless of `include`.
#[derive(Clone, Debug, Default)]
pub struct FilterQuery {
    pub include: Vec<Condition>,
    pub exclude: Vec<Condition>,
}

impl FilterQuery {
    /// True when the query has no conditions at all
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}
