use crate::{
    auth::auth::AuthUser,
    model::{user::display_name, vacation::VacationKind},
    utils::{business_days::count_business_days, db_utils::db_error},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use utoipa::{IntoParams, ToSchema};

/// Accepts `YYYY-MM-DD` or any ISO timestamp starting with one.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[derive(Deserialize, IntoParams)]
pub struct EventRange {
    /// Window start (inclusive)
    #[param(example = "2026-03-01")]
    pub start: String,
    /// Window end (exclusive)
    #[param(example = "2026-04-12")]
    pub end: String,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct CalendarEvent {
    #[schema(example = "Ana Silva")]
    pub title: String,
    #[schema(example = "2026-03-02")]
    pub start: String,
    /// Exclusive end, the day after the last vacation day
    #[schema(example = "2026-03-07")]
    pub end: String,
    #[schema(example = "#0d6efd")]
    pub color: String,
}

#[derive(FromRow)]
struct EventRow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    kind: String,
    username: String,
    full_name: Option<String>,
}

impl From<EventRow> for CalendarEvent {
    fn from(row: EventRow) -> Self {
        CalendarEvent {
            title: display_name(row.full_name.as_deref(), &row.username).to_string(),
            start: row.start_date.format("%Y-%m-%d").to_string(),
            end: (row.end_date + Duration::days(1)).format("%Y-%m-%d").to_string(),
            color: VacationKind::from_db(&row.kind).color().to_string(),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct BookVacation {
    #[schema(example = "2026-08-03")]
    pub start: String,
    #[schema(example = "2026-08-14")]
    pub end: String,
}

impl BookVacation {
    /// Parsed range and its business-day count.
    fn business_days(&self) -> Result<(NaiveDate, NaiveDate, i32), &'static str> {
        let start = parse_calendar_date(&self.start).ok_or("Invalid date format")?;
        let end = parse_calendar_date(&self.end).ok_or("Invalid date format")?;
        let days = count_business_days(start, end);
        if days <= 0 {
            return Err("Select at least one business day");
        }
        Ok((start, end, days))
    }
}

/// Vacation calendar events overlapping a window
#[utoipa::path(
    get,
    path = "/api/vacations/events",
    params(EventRange),
    responses(
        (status = 200, description = "Events", body = [CalendarEvent]),
        (status = 400, description = "Invalid window"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacations"
)]
pub async fn events(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EventRange>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let (Some(start), Some(end)) = (parse_calendar_date(&query.start), parse_calendar_date(&query.end))
    else {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "Invalid date format" })));
    };

    let rows = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT v.start_date, v.end_date, v.kind, u.username, u.full_name
        FROM vacations v
        JOIN users u ON u.id = v.user_id
        WHERE v.start_date < ? AND v.end_date >= ?
        ORDER BY v.start_date
        "#,
    )
    .bind(end)
    .bind(start)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to load vacation events"))?;

    let events: Vec<CalendarEvent> = rows.into_iter().map(CalendarEvent::from).collect();
    Ok(HttpResponse::Ok().json(events))
}

/// Caller's remaining vacation days
#[utoipa::path(
    get,
    path = "/api/vacations/remaining",
    responses(
        (status = 200, description = "Remaining days", body = Object, example = json!({ "days": 17 })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacations"
)]
pub async fn remaining(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let days = sqlx::query_scalar::<_, i32>("SELECT vacation_days_available FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to read vacation balance"))?;

    match days {
        Some(days) => Ok(HttpResponse::Ok().json(json!({ "days": days }))),
        None => Err(actix_web::error::ErrorUnauthorized("User no longer exists")),
    }
}

/// Book vacation for the caller
#[utoipa::path(
    post,
    path = "/api/vacations",
    request_body = BookVacation,
    responses(
        (status = 200, description = "Booked", body = Object, example = json!({
            "message": "Vacation booked, 5 days deducted", "remaining": 17
        })),
        (status = 400, description = "Bad range or not enough days", body = Object, example = json!({
            "message": "Not enough vacation days: need 5, have 3"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacations"
)]
pub async fn book(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BookVacation>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let (start, end, days) = match payload.business_days() {
        Ok(v) => v,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start vacation transaction"))?;

    let available = sqlx::query_scalar::<_, i32>(
        "SELECT vacation_days_available FROM users WHERE id = ? FOR UPDATE",
    )
    .bind(auth.user_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_error("Failed to lock vacation balance"))?
    .ok_or_else(|| actix_web::error::ErrorUnauthorized("User no longer exists"))?;

    if available < days {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": format!("Not enough vacation days: need {days}, have {available}")
        })));
    }

    sqlx::query("UPDATE users SET vacation_days_available = vacation_days_available - ? WHERE id = ?")
        .bind(days)
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to debit vacation balance"))?;

    sqlx::query(
        r#"
        INSERT INTO vacations (user_id, start_date, end_date, days_spent, kind, registered_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(start)
    .bind(end)
    .bind(days)
    .bind(VacationKind::Individual.as_ref())
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to record vacation"))?;

    tx.commit()
        .await
        .map_err(db_error("Failed to commit vacation booking"))?;

    tracing::info!(user_id = auth.user_id, days, %start, %end, "Vacation booked");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Vacation booked, {days} days deducted"),
        "remaining": available - days
    })))
}

/// Book a company-wide vacation for every active employee
#[utoipa::path(
    post,
    path = "/api/admin/vacations/company",
    request_body = BookVacation,
    responses(
        (status = 200, description = "Booked", body = Object, example = json!({
            "message": "Company vacation booked for 12 employees", "employees": 12, "days": 3
        })),
        (status = 400, description = "Bad range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Vacations"
)]
pub async fn book_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<BookVacation>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (start, end, days) = match payload.business_days() {
        Ok(v) => v,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let mut tx = pool
        .begin()
        .await
        .map_err(db_error("Failed to start company vacation transaction"))?;

    // Balances may go negative here.
    sqlx::query(
        "UPDATE users SET vacation_days_available = vacation_days_available - ? WHERE is_active_employee = TRUE",
    )
    .bind(days)
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to debit company vacation"))?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO vacations (user_id, start_date, end_date, days_spent, kind, registered_at)
        SELECT id, ?, ?, ?, ?, ?
        FROM users
        WHERE is_active_employee = TRUE
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(days)
    .bind(VacationKind::Company.as_ref())
    .bind(Utc::now())
    .execute(&mut *tx)
    .await
    .map_err(db_error("Failed to record company vacation"))?;

    tx.commit()
        .await
        .map_err(db_error("Failed to commit company vacation"))?;

    let employees = inserted.rows_affected();
    tracing::info!(admin_id = auth.user_id, employees, days, "Company vacation booked");
    Ok(HttpResponse::Ok().json(json!({
        "message": format!("Company vacation booked for {employees} employees"),
        "employees": employees,
        "days": days
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_dates_accept_timestamps() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 1);
        assert_eq!(parse_calendar_date("2026-03-01"), expected);
        assert_eq!(parse_calendar_date("2026-03-01T00:00:00+01:00"), expected);
        assert_eq!(parse_calendar_date("01/03/2026"), None);
        assert_eq!(parse_calendar_date("2026"), None);
    }

    #[test]
    fn events_end_the_day_after() {
        let event = CalendarEvent::from(EventRow {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            kind: "company".into(),
            username: "ana".into(),
            full_name: None,
        });
        assert_eq!(
            event,
            CalendarEvent {
                title: "ana".into(),
                start: "2026-03-02".into(),
                end: "2026-03-07".into(),
                color: "#dc3545".into(),
            }
        );
    }

    #[test]
    fn booking_needs_a_business_day() {
        let weekend = BookVacation { start: "2026-03-07".into(), end: "2026-03-08".into() };
        assert_eq!(weekend.business_days(), Err("Select at least one business day"));

        let week = BookVacation { start: "2026-03-02".into(), end: "2026-03-08".into() };
        let (_, _, days) = week.business_days().unwrap();
        assert_eq!(days, 5);

        let garbage = BookVacation { start: "soon".into(), end: "2026-03-08".into() };
        assert_eq!(garbage.business_days(), Err("Invalid date format"));
    }
}
