//! Hard eligibility gate applied before any scoring.
//!
//! Recovered marketplace rules: an internship may require a minimum academic
//! year, and an on-site internship requires matching locations. Every check
//! is vacuous when either side lacks the datum, so sparsely-filled snapshots
//! are never rejected for missing data.

use serde::Serialize;

/// The eligibility-relevant slice of one entity. Postings carry
/// `remote`/`min_year`; profiles carry `year`. The gate itself is
/// direction-agnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct EligibilitySide<'a> {
    pub location: Option<&'a str>,
    /// `Some` only for postings; `None` means "no on-site constraint here".
    pub remote: Option<bool>,
    pub year: Option<i32>,
    pub min_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibilityResult {
    pub eligible: bool,
    pub reasons: Vec<String>,
}

impl EligibilityResult {
    fn eligible() -> Self {
        Self {
            eligible: true,
            reasons: Vec::new(),
        }
    }
}

/// Evaluate the gate for an anchor/candidate pair. Either side may be the
/// posting; the rules pick the posting-side constraint and the profile-side
/// datum regardless of direction.
pub fn check(a: &EligibilitySide<'_>, b: &EligibilitySide<'_>) -> EligibilityResult {
    let mut reasons = Vec::new();

    // Academic year: posting minimum vs student year, whichever way round.
    for (min_year, year) in [(a.min_year, b.year), (b.min_year, a.year)] {
        if let (Some(min_year), Some(year)) = (min_year, year) {
            if year < min_year {
                reasons.push(format!(
                    "student year {year} is below the required minimum year {min_year}"
                ));
            }
        }
    }

    // Location only matters for on-site postings.
    let on_site = matches!(a.remote.or(b.remote), Some(false));
    if on_site {
        if let (Some(posting_loc), Some(profile_loc)) = (a.location, b.location) {
            if !posting_loc.trim().eq_ignore_ascii_case(profile_loc.trim()) {
                reasons.push(format!(
                    "on-site internship in {posting_loc} does not match student location {profile_loc}"
                ));
            }
        }
    }

    if reasons.is_empty() {
        EligibilityResult::eligible()
    } else {
        EligibilityResult {
            eligible: false,
            reasons,
        }
    }
}
