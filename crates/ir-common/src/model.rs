use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Authenticated caller as handed over by the auth boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        let id = id.into().trim().to_string();
        let email = email
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self { id, email }
    }
}

/// Demographic record, one per identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrimaryRecord {
    pub full_name: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linked_in_url: Option<String>,
    pub github_url: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    pub revision_notes: Option<String>,
}

/// Review state of an extended profile.
///
/// Unrecognised stored values are kept verbatim in `Unknown` and rank below
/// every known state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ProfileStatus {
    Approved,
    Submitted,
    NeedRevision,
    Rejected,
    Pending,
    #[default]
    Draft,
    Unknown(String),
}

impl ProfileStatus {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "" | "DRAFT" => ProfileStatus::Draft,
            "APPROVED" => ProfileStatus::Approved,
            "SUBMITTED" => ProfileStatus::Submitted,
            "NEED_REVISION" => ProfileStatus::NeedRevision,
            "REJECTED" => ProfileStatus::Rejected,
            "PENDING" => ProfileStatus::Pending,
            _ => ProfileStatus::Unknown(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProfileStatus::Approved => "APPROVED",
            ProfileStatus::Submitted => "SUBMITTED",
            ProfileStatus::NeedRevision => "NEED_REVISION",
            ProfileStatus::Rejected => "REJECTED",
            ProfileStatus::Pending => "PENDING",
            ProfileStatus::Draft => "DRAFT",
            ProfileStatus::Unknown(raw) => raw.as_str(),
        }
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProfileStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProfileStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(ProfileStatus::parse).unwrap_or_default())
    }
}

/// Extended profile row. Several may point at one identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub id: String,
    /// Foreign key that should equal `Identity::id`.
    pub link_key: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub experience: Option<String>,
    pub portfolio_url: Option<String>,
    pub intro_video_url: Option<String>,
    #[serde(default)]
    pub status: ProfileStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub revision_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub completion_stored: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub availability: Option<String>,
    pub hours_per_week: Option<i32>,
    #[serde(default)]
    pub readiness_flag: bool,
    pub avatar_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    /// Timestamp used for recency ordering: `updated_at`, else `created_at`.
    pub fn recency(&self) -> Option<DateTime<Utc>> {
        self.updated_at.or(self.created_at)
    }
}

/// The narrow write issued by drift repair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePatch {
    pub link_key: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRef {
    pub id: String,
    pub name: String,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(text)) => DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|ts| ts.with_timezone(&Utc)),
        Some(serde_json::Value::Number(millis)) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|value| value.is_finite()))
}
