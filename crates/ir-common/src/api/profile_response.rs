use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SkillRef;

/// Normalized profile returned to the GUI.
///
/// Every key is always present; absent values serialize as `null`, `skills`
/// as `[]`, and `profileCompletion` is an integer in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub full_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linked_in_url: Option<String>,
    pub github_url: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(rename = "created_at")]
    pub created_at: Option<DateTime<Utc>>,

    // === candidate profile ===
    pub headline: Option<String>,
    /// Alias of `headline`.
    pub job_title: Option<String>,
    pub status: String,
    pub revision_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub experience: Option<String>,
    pub portfolio_url: Option<String>,
    pub intro_video_url: Option<String>,
    pub hourly_rate: Option<f64>,
    pub availability: Option<String>,
    pub hours_per_week: Option<i32>,

    pub skills: Vec<SkillRef>,
    pub profile_completion: u8,
}
