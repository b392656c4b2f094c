use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Feedback {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "suggestion")]
    pub kind: String,
    #[schema(example = "Dark mode")]
    pub title: String,
    #[schema(example = "The clock screen is too bright at night.")]
    pub description: String,
    #[schema(example = "2026-03-02T09:12:00Z", format = "date-time", value_type = String)]
    pub registered_at: DateTime<Utc>,
    #[schema(example = "pending")]
    pub status: String,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FeedbackKind {
    Bug,
    Suggestion,
    Other,
}
