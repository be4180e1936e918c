use serde::Serialize;

/// Result of flipping a unique (subject, actor) row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    /// No row existed; one was inserted.
    Added,
    /// A row with the requested polarity existed and was deleted.
    Removed,
    /// A row with the opposite polarity existed and was flipped in place.
    Changed,
}
