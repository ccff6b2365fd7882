//! Canonical one-line texts fed to the embedding model and cross-encoder.
//!
//! The same text also feeds the embedding cache's `content_hash`, so any
//! change to a field that appears here invalidates the cached vector for
//! that entity.

use crate::{Posting, Profile};

fn join_or_none(skills: &[String]) -> String {
    if skills.is_empty() {
        "none".to_string()
    } else {
        skills.join(", ")
    }
}

/// Text representation of a posting.
pub fn posting_text(posting: &Posting) -> String {
    let mut text = String::new();
    if !posting.title.trim().is_empty() {
        text.push_str(&format!("Internship '{}'. ", posting.title.trim()));
    }
    text.push_str(&format!(
        "Requires skills: {}.",
        join_or_none(&posting.required_skills)
    ));
    if !posting.preferred_skills.is_empty() {
        text.push_str(&format!(
            " Nice to have: {}.",
            posting.preferred_skills.join(", ")
        ));
    }
    if let Some(min_year) = posting.min_year {
        text.push_str(&format!(" Minimum year: {min_year}."));
    }
    if let Some(location) = posting.location.as_deref() {
        text.push_str(&format!(" Location: {location}."));
    }
    text.push_str(&format!(" Remote: {}.", posting.remote));
    if let Some(description) = posting.description.as_deref() {
        let description = description.trim();
        if !description.is_empty() {
            text.push(' ');
            text.push_str(description);
        }
    }
    text
}

/// Text representation of a student profile.
pub fn profile_text(profile: &Profile) -> String {
    let mut text = format!("Student skills: {}.", join_or_none(&profile.skills));
    if !profile.interests.is_empty() {
        text.push_str(&format!(" Interests: {}.", profile.interests.join(", ")));
    }
    if let Some(year) = profile.year {
        text.push_str(&format!(" Year: {year}."));
    }
    if let Some(location) = profile.location.as_deref() {
        text.push_str(&format!(" Location: {location}."));
    }
    if let Some(objective) = profile.objective.as_deref() {
        let objective = objective.trim();
        if !objective.is_empty() {
            text.push(' ');
            text.push_str(objective);
        }
    }
    text
}
