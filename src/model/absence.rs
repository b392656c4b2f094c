use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Absence {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "2026-03-02T09:12:00Z", format = "date-time", value_type = String)]
    pub registered_at: DateTime<Utc>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub absence_date: NaiveDate,
    #[schema(example = "09:00:00", value_type = String)]
    pub start_time: NaiveTime,
    #[schema(example = "11:30:00", value_type = String)]
    pub end_time: NaiveTime,
    #[schema(example = "Medical appointment")]
    pub reason: String,
}
