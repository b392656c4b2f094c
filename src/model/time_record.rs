use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::work_time::DayPunches;

/// One row per user per work day. A `None` punch has not happened yet.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeRecord {
    pub id: u64,
    pub user_id: u64,
    pub work_date: NaiveDate,
    pub clock_in: Option<DateTime<Utc>>,
    pub lunch_out: Option<DateTime<Utc>>,
    pub lunch_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
    pub clock_in_latitude: Option<f64>,
    pub clock_in_longitude: Option<f64>,
    pub lunch_out_latitude: Option<f64>,
    pub lunch_out_longitude: Option<f64>,
    pub lunch_in_latitude: Option<f64>,
    pub lunch_in_longitude: Option<f64>,
    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
}

impl TimeRecord {
    pub fn punches(&self) -> DayPunches {
        DayPunches {
            clock_in: self.clock_in,
            lunch_out: self.lunch_out,
            lunch_in: self.lunch_in,
            clock_out: self.clock_out,
        }
    }
}
