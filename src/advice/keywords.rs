//! Keyword inference for advice that carries tags but no authored rule.

use std::collections::BTreeSet;
use std::fmt;

/// The stage of a lead conversation a piece of advice speaks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AdvicePhase {
    Budget,
    Financing,
    Timeline,
    Location,
    Property,
    Motivation,
    Contact,
}

impl fmt::Display for AdvicePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Budget => "budget",
            Self::Financing => "financing",
            Self::Timeline => "timeline",
            Self::Location => "location",
            Self::Property => "property",
            Self::Motivation => "motivation",
            Self::Contact => "contact",
        };
        write!(f, "{s}")
    }
}

static PHASE_KEYWORDS: &[(AdvicePhase, &[&str])] = &[
    (
        AdvicePhase::Budget,
        &["budget", "price", "cost", "afford", "asking", "valuation"],
    ),
    (
        AdvicePhase::Financing,
        &["financ", "mortgage", "loan", "lender", "approval", "down_payment", "deposit", "cash"],
    ),
    (
        AdvicePhase::Timeline,
        &["timeline", "timeframe", "moving", "move_date", "urgency", "asap", "month"],
    ),
    (
        AdvicePhase::Location,
        &["location", "area", "neighborhood", "neighbourhood", "city", "zip", "postcode", "school", "commute"],
    ),
    (
        AdvicePhase::Property,
        &["property", "bedroom", "bathroom", "house", "home_type", "condo", "sqft", "square", "feature"],
    ),
    (
        AdvicePhase::Motivation,
        &["motivation", "reason", "goal", "relocat", "upsiz", "downsiz", "invest"],
    ),
    (
        AdvicePhase::Contact,
        &["contact", "email", "phone", "full_name", "callback"],
    ),
];

/// Phases whose keywords occur in `term`. Matching is case-insensitive and
/// treats spaces and dashes like underscores, so `"Down payment"` and
/// `down_payment` agree.
pub fn phases_for(term: &str) -> BTreeSet<AdvicePhase> {
    let normalized: String = term
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    PHASE_KEYWORDS
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| normalized.contains(k)))
        .map(|(phase, _)| *phase)
        .collect()
}

/// Union of the phases of every term.
pub fn infer_phases<'a>(terms: impl IntoIterator<Item = &'a str>) -> BTreeSet<AdvicePhase> {
    terms.into_iter().flat_map(phases_for).collect()
}
