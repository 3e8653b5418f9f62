use crate::api::profile_response::ProfileResponse;
use crate::model::{CandidateRecord, Identity, PrimaryRecord, ProfileStatus, SkillRef};

use super::scoring::{CompletionScore, clamp_completion};

/// Output status: a ready record is always reported as approved.
pub fn effective_status(canonical: Option<&CandidateRecord>) -> String {
    match canonical {
        Some(candidate) if candidate.readiness_flag => ProfileStatus::Approved.as_str().to_string(),
        Some(candidate) => candidate.status.as_str().to_string(),
        None => ProfileStatus::Draft.as_str().to_string(),
    }
}

/// Split a display name into first token and the remaining tokens.
pub fn split_full_name(full_name: Option<&str>) -> (Option<String>, Option<String>) {
    let mut tokens = full_name.unwrap_or_default().split_whitespace();
    let first = tokens.next().map(str::to_string);
    let rest = tokens.collect::<Vec<_>>().join(" ");
    let last = (!rest.is_empty()).then_some(rest);
    (first, last)
}

pub fn assemble_profile(
    identity: &Identity,
    primary: &PrimaryRecord,
    canonical: Option<&CandidateRecord>,
    skills: Vec<SkillRef>,
    completion: CompletionScore,
) -> ProfileResponse {
    let (first_name, last_name) = split_full_name(primary.full_name.as_deref());
    let headline = canonical.and_then(|c| c.headline.clone());

    ProfileResponse {
        id: identity.id.clone(),
        full_name: primary.full_name.clone(),
        first_name,
        last_name,
        country: primary.country.clone(),
        timezone: primary.timezone.clone(),
        bio: prefer(canonical.and_then(|c| c.bio.as_ref()), primary.bio.as_ref()),
        phone: primary.phone.clone(),
        location: primary.location.clone(),
        linked_in_url: primary.linked_in_url.clone(),
        github_url: primary.github_url.clone(),
        avatar_url: prefer(
            canonical.and_then(|c| c.avatar_url.as_ref()),
            primary.avatar_url.as_ref(),
        ),
        created_at: primary.created_at,
        job_title: headline.clone(),
        headline,
        status: effective_status(canonical),
        revision_notes: prefer(
            canonical.and_then(|c| c.revision_notes.as_ref()),
            primary.revision_notes.as_ref(),
        ),
        submitted_at: canonical.and_then(|c| c.submitted_at),
        experience: canonical.and_then(|c| c.experience.clone()),
        portfolio_url: canonical.and_then(|c| c.portfolio_url.clone()),
        intro_video_url: canonical.and_then(|c| c.intro_video_url.clone()),
        hourly_rate: canonical
            .and_then(|c| c.hourly_rate)
            .filter(|rate| rate.is_finite()),
        availability: canonical.and_then(|c| c.availability.clone()),
        hours_per_week: canonical.and_then(|c| c.hours_per_week),
        skills,
        profile_completion: clamp_completion(f64::from(completion.value)),
    }
}

fn prefer(candidate: Option<&String>, primary: Option<&String>) -> Option<String> {
    candidate
        .filter(|value| !value.trim().is_empty())
        .or(primary.filter(|value| !value.trim().is_empty()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::scoring::ScoreSource;

    fn score(value: u8) -> CompletionScore {
        CompletionScore {
            value,
            source: ScoreSource::FullFieldSet,
        }
    }

    #[test]
    fn split_full_name_handles_extra_whitespace() {
        assert_eq!(
            split_full_name(Some("  Ada   King  Lovelace ")),
            (Some("Ada".into()), Some("King Lovelace".into()))
        );
        assert_eq!(split_full_name(Some("Cher")), (Some("Cher".into()), None));
        assert_eq!(split_full_name(Some("   ")), (None, None));
        assert_eq!(split_full_name(None), (None, None));
    }

    #[test]
    fn readiness_forces_approved_status() {
        let candidate = CandidateRecord {
            status: ProfileStatus::Submitted,
            readiness_flag: true,
            ..CandidateRecord::default()
        };
        assert_eq!(effective_status(Some(&candidate)), "APPROVED");
    }

    #[test]
    fn status_defaults_to_draft_without_candidate() {
        assert_eq!(effective_status(None), "DRAFT");
        let candidate = CandidateRecord {
            status: ProfileStatus::Unknown("ON_HOLD".into()),
            ..CandidateRecord::default()
        };
        assert_eq!(effective_status(Some(&candidate)), "ON_HOLD");
    }

    #[test]
    fn candidate_values_win_over_primary_values() {
        let primary = PrimaryRecord {
            bio: Some("primary bio".into()),
            avatar_url: Some("https://cdn.example/primary.png".into()),
            revision_notes: Some("primary notes".into()),
            ..PrimaryRecord::default()
        };
        let candidate = CandidateRecord {
            id: "c1".into(),
            bio: Some("candidate bio".into()),
            avatar_url: Some("  ".into()),
            headline: Some("Staff Engineer".into()),
            hourly_rate: Some(85.0),
            hours_per_week: Some(30),
            ..CandidateRecord::default()
        };

        let response = assemble_profile(
            &Identity::new("u1", None),
            &primary,
            Some(&candidate),
            Vec::new(),
            score(40),
        );

        assert_eq!(response.bio.as_deref(), Some("candidate bio"));
        assert_eq!(
            response.avatar_url.as_deref(),
            Some("https://cdn.example/primary.png")
        );
        assert_eq!(response.revision_notes.as_deref(), Some("primary notes"));
        assert_eq!(response.job_title, response.headline);
        assert_eq!(response.hourly_rate, Some(85.0));
        assert_eq!(response.hours_per_week, Some(30));
        assert_eq!(response.profile_completion, 40);
    }

    #[test]
    fn missing_everything_serializes_every_key_as_null_or_empty() {
        let response = assemble_profile(
            &Identity::new("u1", None),
            &PrimaryRecord::default(),
            None,
            Vec::new(),
            score(0),
        );

        let json = serde_json::to_value(&response).unwrap();
        let object = json.as_object().unwrap();
        for key in [
            "id",
            "fullName",
            "firstName",
            "lastName",
            "country",
            "timezone",
            "bio",
            "phone",
            "location",
            "linkedInUrl",
            "githubUrl",
            "avatarUrl",
            "created_at",
            "headline",
            "jobTitle",
            "status",
            "revisionNotes",
            "submittedAt",
            "experience",
            "portfolioUrl",
            "introVideoUrl",
            "hourlyRate",
            "availability",
            "hoursPerWeek",
            "skills",
            "profileCompletion",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert_eq!(json["status"], "DRAFT");
        assert_eq!(json["skills"], serde_json::json!([]));
        assert_eq!(json["profileCompletion"], 0);
        assert!(json["bio"].is_null());
    }

    #[test]
    fn out_of_range_completion_is_clamped_at_assembly() {
        let response = assemble_profile(
            &Identity::new("u1", None),
            &PrimaryRecord::default(),
            None,
            Vec::new(),
            score(180),
        );
        assert_eq!(response.profile_completion, 0);
    }
}
