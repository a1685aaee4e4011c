pub mod expression;
pub mod trace;
pub mod value;

pub use expression::*;
pub use trace::*;
pub use value::*;

use ahash::AHashMap;

/// Accumulated answers of a conversation, keyed by mapping key.
pub type Answers = AHashMap<String, String>;

/// Returns the answer for `key` if it is present and not blank.
pub fn known_value<'a>(answers: &'a Answers, key: &str) -> Option<&'a str> {
    answers
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}
