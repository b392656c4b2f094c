//! Punch rules and worked-time arithmetic for daily time records.
//!
//! Punches are stored as UTC instants. The work day a punch belongs to is the
//! calendar date at the business offset configured in `WORK_UTC_OFFSET_MINUTES`.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Punch {
    ClockIn,
    LunchOut,
    LunchIn,
    ClockOut,
}

impl Punch {
    pub fn column(self) -> &'static str {
        match self {
            Punch::ClockIn => "clock_in",
            Punch::LunchOut => "lunch_out",
            Punch::LunchIn => "lunch_in",
            Punch::ClockOut => "clock_out",
        }
    }

    /// `(latitude, longitude)` column names for this punch.
    pub fn coordinate_columns(self) -> (&'static str, &'static str) {
        match self {
            Punch::ClockIn => ("clock_in_latitude", "clock_in_longitude"),
            Punch::LunchOut => ("lunch_out_latitude", "lunch_out_longitude"),
            Punch::LunchIn => ("lunch_in_latitude", "lunch_in_longitude"),
            Punch::ClockOut => ("clock_out_latitude", "clock_out_longitude"),
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Punch::ClockIn => "Clock-in registered",
            Punch::LunchOut => "Lunch start registered",
            Punch::LunchIn => "Lunch end registered",
            Punch::ClockOut => "Clock-out registered",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PunchError {
    #[error("Clock-in already registered today")]
    AlreadyClockedIn,
    #[error("Clock-in must be registered first")]
    NotClockedIn,
    #[error("Lunch start already registered today")]
    LunchAlreadyStarted,
    #[error("Lunch start must be registered first")]
    LunchNotStarted,
    #[error("Lunch end already registered today")]
    LunchAlreadyEnded,
    #[error("Lunch is still open, register lunch end first")]
    LunchOpen,
    #[error("Work day already closed")]
    DayClosed,
    #[error("Invalid coordinates")]
    InvalidCoordinates,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayPunches {
    pub clock_in: Option<DateTime<Utc>>,
    pub lunch_out: Option<DateTime<Utc>>,
    pub lunch_in: Option<DateTime<Utc>>,
    pub clock_out: Option<DateTime<Utc>>,
}

impl DayPunches {
    /// Checks whether `punch` may be registered next.
    pub fn check(&self, punch: Punch) -> Result<(), PunchError> {
        match punch {
            Punch::ClockIn => {
                if self.clock_in.is_some() {
                    return Err(PunchError::AlreadyClockedIn);
                }
            }
            Punch::LunchOut => {
                if self.clock_in.is_none() {
                    return Err(PunchError::NotClockedIn);
                }
                if self.clock_out.is_some() {
                    return Err(PunchError::DayClosed);
                }
                if self.lunch_out.is_some() {
                    return Err(PunchError::LunchAlreadyStarted);
                }
            }
            Punch::LunchIn => {
                if self.clock_in.is_none() {
                    return Err(PunchError::NotClockedIn);
                }
                if self.clock_out.is_some() {
                    return Err(PunchError::DayClosed);
                }
                if self.lunch_out.is_none() {
                    return Err(PunchError::LunchNotStarted);
                }
                if self.lunch_in.is_some() {
                    return Err(PunchError::LunchAlreadyEnded);
                }
            }
            Punch::ClockOut => {
                if self.clock_in.is_none() {
                    return Err(PunchError::NotClockedIn);
                }
                if self.clock_out.is_some() {
                    return Err(PunchError::DayClosed);
                }
                if self.lunch_out.is_some() && self.lunch_in.is_none() {
                    return Err(PunchError::LunchOpen);
                }
            }
        }
        Ok(())
    }

    pub fn lunch(&self) -> Duration {
        match (self.lunch_out, self.lunch_in) {
            (Some(out), Some(back)) if back > out => back - out,
            _ => Duration::zero(),
        }
    }

    /// Time between clock-in and clock-out minus lunch, never negative.
    pub fn worked(&self) -> Duration {
        match (self.clock_in, self.clock_out) {
            (Some(start), Some(end)) if end > start => {
                let total = end - start - self.lunch();
                total.max(Duration::zero())
            }
            _ => Duration::zero(),
        }
    }
}

/// `HH:MM`, or `--:--` when nothing was worked.
pub fn format_worked(worked: Duration) -> String {
    if worked <= Duration::zero() {
        return "--:--".to_string();
    }
    let minutes = worked.num_minutes();
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Drops out-of-range fixes and treats `(0, 0)` as "no fix".
pub fn normalize_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<(f64, f64)>, PunchError> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            if !lat.is_finite()
                || !lon.is_finite()
                || !(-90.0..=90.0).contains(&lat)
                || !(-180.0..=180.0).contains(&lon)
            {
                return Err(PunchError::InvalidCoordinates);
            }
            if lat == 0.0 && lon == 0.0 {
                Ok(None)
            } else {
                Ok(Some((lat, lon)))
            }
        }
        (None, None) => Ok(None),
        _ => Err(PunchError::InvalidCoordinates),
    }
}

pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

pub fn local_today(offset: FixedOffset) -> NaiveDate {
    local_date(Utc::now(), offset)
}

pub fn local_time(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveTime {
    instant.with_timezone(&offset).time()
}

/// Interprets a wall-clock time on `date` at the business offset.
pub fn local_to_utc(date: NaiveDate, time: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let naive = date.and_time(time);
    // A fixed offset always maps a local time to exactly one instant.
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap())
    }

    #[test]
    fn clock_in_only_once() {
        let empty = DayPunches::default();
        assert_eq!(empty.check(Punch::ClockIn), Ok(()));

        let started = DayPunches { clock_in: at(9, 0), ..Default::default() };
        assert_eq!(started.check(Punch::ClockIn), Err(PunchError::AlreadyClockedIn));
    }

    #[test]
    fn nothing_before_clock_in() {
        let empty = DayPunches::default();
        assert_eq!(empty.check(Punch::LunchOut), Err(PunchError::NotClockedIn));
        assert_eq!(empty.check(Punch::LunchIn), Err(PunchError::NotClockedIn));
        assert_eq!(empty.check(Punch::ClockOut), Err(PunchError::NotClockedIn));
    }

    #[test]
    fn lunch_sequence() {
        let mut day = DayPunches { clock_in: at(9, 0), ..Default::default() };
        assert_eq!(day.check(Punch::LunchIn), Err(PunchError::LunchNotStarted));
        assert_eq!(day.check(Punch::LunchOut), Ok(()));

        day.lunch_out = at(12, 30);
        assert_eq!(day.check(Punch::LunchOut), Err(PunchError::LunchAlreadyStarted));
        assert_eq!(day.check(Punch::ClockOut), Err(PunchError::LunchOpen));
        assert_eq!(day.check(Punch::LunchIn), Ok(()));

        day.lunch_in = at(13, 30);
        assert_eq!(day.check(Punch::LunchIn), Err(PunchError::LunchAlreadyEnded));
        assert_eq!(day.check(Punch::ClockOut), Ok(()));
    }

    #[test]
    fn closed_day_refuses_everything() {
        let day = DayPunches {
            clock_in: at(9, 0),
            clock_out: at(17, 0),
            ..Default::default()
        };
        assert_eq!(day.check(Punch::LunchOut), Err(PunchError::DayClosed));
        assert_eq!(day.check(Punch::LunchIn), Err(PunchError::DayClosed));
        assert_eq!(day.check(Punch::ClockOut), Err(PunchError::DayClosed));
    }

    #[test]
    fn clock_out_without_lunch_is_fine() {
        let day = DayPunches { clock_in: at(9, 0), ..Default::default() };
        assert_eq!(day.check(Punch::ClockOut), Ok(()));
    }

    #[test]
    fn worked_time_subtracts_lunch() {
        let day = DayPunches {
            clock_in: at(9, 0),
            lunch_out: at(12, 30),
            lunch_in: at(13, 15),
            clock_out: at(18, 0),
        };
        assert_eq!(day.worked(), Duration::minutes(8 * 60 + 15));
        assert_eq!(format_worked(day.worked()), "08:15");
    }

    #[test]
    fn inverted_lunch_is_ignored() {
        let day = DayPunches {
            clock_in: at(9, 0),
            lunch_out: at(13, 0),
            lunch_in: at(12, 0),
            clock_out: at(17, 0),
        };
        assert_eq!(day.lunch(), Duration::zero());
        assert_eq!(day.worked(), Duration::hours(8));
    }

    #[test]
    fn worked_time_never_negative() {
        let day = DayPunches {
            clock_in: at(9, 0),
            lunch_out: at(8, 0),
            lunch_in: at(17, 0),
            clock_out: at(10, 0),
        };
        assert_eq!(day.worked(), Duration::zero());
        assert_eq!(format_worked(day.worked()), "--:--");
    }

    #[test]
    fn open_day_shows_placeholder() {
        let day = DayPunches { clock_in: at(9, 0), ..Default::default() };
        assert_eq!(format_worked(day.worked()), "--:--");
    }

    #[test]
    fn coordinates() {
        assert_eq!(normalize_coordinates(None, None), Ok(None));
        assert_eq!(normalize_coordinates(Some(0.0), Some(0.0)), Ok(None));
        assert_eq!(
            normalize_coordinates(Some(38.72), Some(-9.14)),
            Ok(Some((38.72, -9.14)))
        );
        assert_eq!(
            normalize_coordinates(Some(91.0), Some(0.0)),
            Err(PunchError::InvalidCoordinates)
        );
        assert_eq!(
            normalize_coordinates(Some(10.0), None),
            Err(PunchError::InvalidCoordinates)
        );
    }

    #[test]
    fn work_day_follows_business_offset() {
        let plus_one = FixedOffset::east_opt(3600).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 2, 23, 30, 0).unwrap();
        assert_eq!(local_date(late, plus_one), NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(local_time(late, plus_one), NaiveTime::from_hms_opt(0, 30, 0).unwrap());

        let back = local_to_utc(
            NaiveDate::from_ymd_opt(2026, 3, 3).unwrap(),
            NaiveTime::from_hms_opt(0, 30, 0).unwrap(),
            plus_one,
        );
        assert_eq!(back, late);
    }

    #[test]
    fn clock_time_formats() {
        assert_eq!(parse_clock_time("09:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_clock_time("09:05:30"), NaiveTime::from_hms_opt(9, 5, 30));
        assert_eq!(parse_clock_time("25:00"), None);
        assert_eq!(parse_clock_time(""), None);
    }
}
