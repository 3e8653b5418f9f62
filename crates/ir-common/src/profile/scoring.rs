use crate::model::{CandidateRecord, PrimaryRecord, SkillRef};

pub const MIN_COMPLETION: i64 = 0;
pub const MAX_COMPLETION: i64 = 100;

/// Which rule produced a completion score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// A positive value stored on the canonical record.
    Stored,
    /// Primary + candidate fields + skills (13 fields).
    FullFieldSet,
    /// Primary-record fields only (8 fields), used without a canonical record.
    PrimaryFieldSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionScore {
    pub value: u8,
    pub source: ScoreSource,
}

/// Completion percentage for one profile, always an integer in `[0, 100]`.
///
/// A stored score is authoritative only when it is a finite number above 0;
/// a stored 0 is what a freshly created record carries and is recomputed.
pub fn score_completion(
    primary: &PrimaryRecord,
    canonical: Option<&CandidateRecord>,
    skills: &[SkillRef],
) -> CompletionScore {
    let (raw, source) = match canonical {
        Some(candidate) => match stored_score(candidate) {
            Some(stored) => (stored, ScoreSource::Stored),
            None => (
                percent(&full_field_set(primary, candidate, skills)),
                ScoreSource::FullFieldSet,
            ),
        },
        None => (
            percent(&primary_field_set(primary)),
            ScoreSource::PrimaryFieldSet,
        ),
    };

    CompletionScore {
        value: clamp_completion(raw),
        source,
    }
}

/// Coerce any candidate score into the output range; anything that is not a
/// finite value inside `[0, 100]` becomes 0.
pub fn clamp_completion(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }

    let rounded = raw.round() as i64;
    if (MIN_COMPLETION..=MAX_COMPLETION).contains(&rounded) {
        rounded as u8
    } else {
        0
    }
}

fn stored_score(candidate: &CandidateRecord) -> Option<f64> {
    candidate
        .completion_stored
        .filter(|value| value.is_finite() && *value > 0.0)
        .map(f64::round)
}

fn primary_field_set(primary: &PrimaryRecord) -> [bool; 8] {
    [
        filled(&primary.full_name),
        filled(&primary.country),
        filled(&primary.timezone),
        filled(&primary.bio),
        filled(&primary.phone),
        filled(&primary.location),
        filled(&primary.linked_in_url),
        filled(&primary.github_url),
    ]
}

fn full_field_set(
    primary: &PrimaryRecord,
    candidate: &CandidateRecord,
    skills: &[SkillRef],
) -> Vec<bool> {
    let mut fields = primary_field_set(primary).to_vec();
    fields.extend([
        filled(&candidate.headline),
        filled(&candidate.experience),
        filled(&candidate.portfolio_url),
        filled(&candidate.intro_video_url),
        !skills.is_empty(),
    ]);
    fields
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

fn percent(fields: &[bool]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    let populated = fields.iter().filter(|populated| **populated).count();
    (100.0 * populated as f64 / fields.len() as f64).round()
}
