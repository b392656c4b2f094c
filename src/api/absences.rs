use crate::{
    api::IdList,
    auth::auth::AuthUser,
    model::{absence::Absence, user::display_name},
    utils::{
        db_utils::{
            Filters, Page, SqlValue, bind_as, bind_query, bind_scalar, db_error, like_pattern,
            placeholders,
        },
        work_time::parse_clock_time,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use utoipa::{IntoParams, ToSchema};

const ABSENCE_COLUMNS: &str =
    "a.id, a.user_id, a.registered_at, a.absence_date, a.start_time, a.end_time, a.reason";

#[derive(Deserialize, ToSchema)]
pub struct CreateAbsence {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub absence_date: NaiveDate,
    #[schema(example = "09:00")]
    pub start_time: String,
    #[schema(example = "11:30")]
    pub end_time: String,
    #[schema(example = "Medical appointment")]
    pub reason: String,
}

#[derive(Debug, PartialEq)]
struct ValidAbsence {
    start: NaiveTime,
    end: NaiveTime,
    reason: String,
}

impl CreateAbsence {
    fn validate(&self) -> Result<ValidAbsence, &'static str> {
        let start = parse_clock_time(&self.start_time).ok_or("start_time must be HH:MM")?;
        let end = parse_clock_time(&self.end_time).ok_or("end_time must be HH:MM")?;
        if end <= start {
            return Err("end_time must be after start_time");
        }
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err("reason is required");
        }
        Ok(ValidAbsence { start, end, reason: reason.to_string() })
    }
}

#[derive(Serialize, ToSchema)]
pub struct AbsenceView {
    #[serde(flatten)]
    pub absence: Absence,
    #[schema(example = "Ana Silva")]
    pub user_name: String,
}

#[derive(FromRow)]
struct AbsenceRow {
    #[sqlx(flatten)]
    absence: Absence,
    username: String,
    full_name: Option<String>,
}

impl From<AbsenceRow> for AbsenceView {
    fn from(row: AbsenceRow) -> Self {
        let user_name = display_name(row.full_name.as_deref(), &row.username).to_string();
        AbsenceView { absence: row.absence, user_name }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AbsenceListResponse {
    pub data: Vec<AbsenceView>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct AbsenceFilter {
    /// Matches username or full name
    pub name: Option<String>,
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Register an absence for the caller
#[utoipa::path(
    post,
    path = "/api/absences",
    request_body = CreateAbsence,
    responses(
        (status = 201, description = "Absence registered", body = Object, example = json!({
            "message": "Absence registered", "id": 5
        })),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "end_time must be after start_time"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn create_absence(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAbsence>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let valid = match payload.validate() {
        Ok(v) => v,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO absences (user_id, registered_at, absence_date, start_time, end_time, reason)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(auth.user_id)
    .bind(Utc::now())
    .bind(payload.absence_date)
    .bind(valid.start)
    .bind(valid.end)
    .bind(&valid.reason)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Failed to register absence");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Absence registered",
        "id": result.last_insert_id()
    })))
}

pub(crate) async fn fetch_user_absences(
    user_id: u64,
    limit: Option<u64>,
    pool: &MySqlPool,
) -> Result<Vec<Absence>, sqlx::Error> {
    let mut sql = format!(
        "SELECT {ABSENCE_COLUMNS} FROM absences a WHERE a.user_id = ? ORDER BY a.absence_date DESC, a.start_time DESC"
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }
    let mut query = sqlx::query_as::<_, Absence>(&sql).bind(user_id);
    if let Some(limit) = limit {
        query = query.bind(limit);
    }
    query.fetch_all(pool).await
}

/// Caller's absences, newest first
#[utoipa::path(
    get,
    path = "/api/absences/mine",
    responses(
        (status = 200, description = "Absences", body = [Absence]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn my_absences(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let absences = fetch_user_absences(auth.user_id, None, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch absences"))?;
    Ok(HttpResponse::Ok().json(absences))
}

/// All absences, filterable by name and date
#[utoipa::path(
    get,
    path = "/api/admin/absences",
    params(AbsenceFilter),
    responses(
        (status = 200, description = "Paginated absences", body = AbsenceListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn admin_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AbsenceFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(name) = query.name.as_deref().filter(|n| !n.trim().is_empty()) {
        let pattern = like_pattern(name);
        filters.push(
            "(u.username LIKE ? OR u.full_name LIKE ?)",
            [SqlValue::String(pattern.clone()), SqlValue::String(pattern)],
        );
    }
    if let Some(date) = query.date {
        filters.push("a.absence_date = ?", [SqlValue::Date(date)]);
    }
    let where_sql = filters.where_sql();

    let count_sql =
        format!("SELECT COUNT(*) FROM absences a JOIN users u ON u.id = a.user_id{where_sql}");
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count absences"))?;

    let data_sql = format!(
        r#"
        SELECT {ABSENCE_COLUMNS}, u.username, u.full_name
        FROM absences a
        JOIN users u ON u.id = a.user_id
        {where_sql}
        ORDER BY a.absence_date DESC, a.start_time DESC
        LIMIT ? OFFSET ?
        "#
    );
    let rows = bind_as(sqlx::query_as::<_, AbsenceRow>(&data_sql), filters.values())
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch absences"))?;

    Ok(HttpResponse::Ok().json(AbsenceListResponse {
        data: rows.into_iter().map(AbsenceView::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Delete several absences at once
#[utoipa::path(
    post,
    path = "/api/admin/absences/delete",
    request_body = IdList,
    responses(
        (status = 200, description = "Deleted", body = Object, example = json!({ "deleted": 2 })),
        (status = 400, description = "No ids given"),
        (status = 404, description = "None of the ids exist"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Absences"
)]
pub async fn admin_delete_many(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<IdList>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let ids = payload.unique();
    if ids.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "No absences selected" })));
    }

    let values: Vec<SqlValue> = ids.iter().map(|id| SqlValue::U64(*id)).collect();
    let sql = format!("DELETE FROM absences WHERE id IN ({})", placeholders(values.len()));
    let result = bind_query(sqlx::query(&sql), &values)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete absences"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "No absences found" })));
    }

    tracing::info!(admin_id = auth.user_id, deleted = result.rows_affected(), "Absences deleted");
    Ok(HttpResponse::Ok().json(json!({ "deleted": result.rows_affected() })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(start: &str, end: &str, reason: &str) -> CreateAbsence {
        CreateAbsence {
            absence_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            start_time: start.into(),
            end_time: end.into(),
            reason: reason.into(),
        }
    }

    #[test]
    fn valid_absence() {
        let valid = request("09:00", "11:30", "  Doctor ").validate().unwrap();
        assert_eq!(valid.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(valid.end, NaiveTime::from_hms_opt(11, 30, 0).unwrap());
        assert_eq!(valid.reason, "Doctor");
    }

    #[test]
    fn end_must_follow_start() {
        assert_eq!(
            request("11:00", "11:00", "x").validate(),
            Err("end_time must be after start_time")
        );
        assert_eq!(
            request("11:00", "10:00", "x").validate(),
            Err("end_time must be after start_time")
        );
    }

    #[test]
    fn reason_and_times_required() {
        assert_eq!(request("09:00", "10:00", "   ").validate(), Err("reason is required"));
        assert_eq!(request("nine", "10:00", "x").validate(), Err("start_time must be HH:MM"));
    }
}
