use crate::{
    auth::auth::AuthUser,
    config::Config,
    model::{time_record::TimeRecord, user::display_name},
    utils::{
        db_utils::{
            Filters, Page, SqlValue, bind_as, bind_scalar, db_error, is_foreign_key_violation,
            is_unique_violation, like_pattern,
        },
        work_time::{
            DayPunches, Punch, format_worked, local_date, local_time, local_to_utc, local_today,
            normalize_coordinates, parse_clock_time,
        },
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use utoipa::{IntoParams, ToSchema};

const TIME_RECORD_COLUMNS: &str = r#"
    t.id, t.user_id, t.work_date, t.clock_in, t.lunch_out, t.lunch_in, t.clock_out,
    t.clock_in_latitude, t.clock_in_longitude, t.lunch_out_latitude, t.lunch_out_longitude,
    t.lunch_in_latitude, t.lunch_in_longitude, t.clock_out_latitude, t.clock_out_longitude
"#;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PunchReq {
    #[schema(example = 38.7223)]
    pub latitude: Option<f64>,
    #[schema(example = -9.1393)]
    pub longitude: Option<f64>,
}

#[derive(Serialize, ToSchema)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Option<Location> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
        _ => None,
    }
}

#[derive(Serialize, ToSchema)]
pub struct TimeRecordView {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = "Ana Silva", nullable = true)]
    pub user_name: Option<String>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "09:00:12", nullable = true)]
    pub clock_in: Option<String>,
    #[schema(example = "12:30:00", nullable = true)]
    pub lunch_out: Option<String>,
    #[schema(example = "13:30:00", nullable = true)]
    pub lunch_in: Option<String>,
    #[schema(example = "18:00:45", nullable = true)]
    pub clock_out: Option<String>,
    #[schema(example = "08:00")]
    pub total_worked: String,
    pub clock_in_location: Option<Location>,
    pub lunch_out_location: Option<Location>,
    pub lunch_in_location: Option<Location>,
    pub clock_out_location: Option<Location>,
}

fn clock_string(instant: Option<DateTime<Utc>>, offset: FixedOffset) -> Option<String> {
    instant.map(|t| local_time(t, offset).format("%H:%M:%S").to_string())
}

impl TimeRecordView {
    fn new(record: TimeRecord, user_name: Option<String>, offset: FixedOffset) -> Self {
        let worked = format_worked(record.punches().worked());
        Self {
            id: record.id,
            user_id: record.user_id,
            user_name,
            work_date: record.work_date,
            clock_in: clock_string(record.clock_in, offset),
            lunch_out: clock_string(record.lunch_out, offset),
            lunch_in: clock_string(record.lunch_in, offset),
            clock_out: clock_string(record.clock_out, offset),
            total_worked: worked,
            clock_in_location: location(record.clock_in_latitude, record.clock_in_longitude),
            lunch_out_location: location(record.lunch_out_latitude, record.lunch_out_longitude),
            lunch_in_location: location(record.lunch_in_latitude, record.lunch_in_longitude),
            clock_out_location: location(record.clock_out_latitude, record.clock_out_longitude),
        }
    }
}

#[derive(FromRow)]
struct TimeRecordWithUser {
    #[sqlx(flatten)]
    record: TimeRecord,
    username: String,
    full_name: Option<String>,
}

impl TimeRecordWithUser {
    fn into_view(self, offset: FixedOffset) -> TimeRecordView {
        let name = display_name(self.full_name.as_deref(), &self.username).to_string();
        TimeRecordView::new(self.record, Some(name), offset)
    }
}

#[derive(Serialize, ToSchema)]
pub struct TodayView {
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "09:00:12", nullable = true)]
    pub clock_in: Option<String>,
    #[schema(nullable = true)]
    pub lunch_out: Option<String>,
    #[schema(nullable = true)]
    pub lunch_in: Option<String>,
    #[schema(nullable = true)]
    pub clock_out: Option<String>,
    #[schema(example = "--:--")]
    pub total_worked: String,
}

impl TodayView {
    pub fn new(work_date: NaiveDate, punches: DayPunches, offset: FixedOffset) -> Self {
        Self {
            work_date,
            clock_in: clock_string(punches.clock_in, offset),
            lunch_out: clock_string(punches.lunch_out, offset),
            lunch_in: clock_string(punches.lunch_in, offset),
            clock_out: clock_string(punches.clock_out, offset),
            total_worked: format_worked(punches.worked()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TimeRecordListResponse {
    pub data: Vec<TimeRecordView>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct DateFilter {
    /// Only records of this work date
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct AdminTimeRecordFilter {
    /// Matches username or full name
    pub name: Option<String>,
    #[param(value_type = Option<String>, example = "2026-03-02")]
    pub date: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// Punch times are local `HH:MM` or `HH:MM:SS`.
#[derive(Deserialize, ToSchema)]
pub struct TimeRecordReq {
    #[schema(example = 7)]
    pub user_id: Option<u64>,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "09:00")]
    pub clock_in: Option<String>,
    #[schema(example = "12:30")]
    pub lunch_out: Option<String>,
    #[schema(example = "13:30")]
    pub lunch_in: Option<String>,
    #[schema(example = "18:00")]
    pub clock_out: Option<String>,
}

impl TimeRecordReq {
    /// Converts the local clock strings to instants on `work_date`.
    fn punches(&self, offset: FixedOffset) -> Result<DayPunches, String> {
        let convert = |label: &str, raw: &Option<String>| -> Result<Option<DateTime<Utc>>, String> {
            match raw.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(value) => parse_clock_time(value)
                    .map(|t| Some(local_to_utc(self.work_date, t, offset)))
                    .ok_or_else(|| format!("{label} must be HH:MM or HH:MM:SS")),
            }
        };
        Ok(DayPunches {
            clock_in: convert("clock_in", &self.clock_in)?,
            lunch_out: convert("lunch_out", &self.lunch_out)?,
            lunch_in: convert("lunch_in", &self.lunch_in)?,
            clock_out: convert("clock_out", &self.clock_out)?,
        })
    }
}

pub(crate) async fn find_day(
    user_id: u64,
    work_date: NaiveDate,
    pool: &MySqlPool,
) -> Result<Option<TimeRecord>, sqlx::Error> {
    sqlx::query_as::<_, TimeRecord>(&format!(
        "SELECT {TIME_RECORD_COLUMNS} FROM time_records t WHERE t.user_id = ? AND t.work_date = ?"
    ))
    .bind(user_id)
    .bind(work_date)
    .fetch_optional(pool)
    .await
}

/// Caller's punches for today
#[utoipa::path(
    get,
    path = "/api/time-records/today",
    responses(
        (status = 200, description = "Today's punches", body = TodayView),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let offset = config.work_offset();
    let work_date = local_today(offset);
    let record = find_day(auth.user_id, work_date, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch today's time record"))?;

    let punches = record.map(|r| r.punches()).unwrap_or_default();
    Ok(HttpResponse::Ok().json(TodayView::new(work_date, punches, offset)))
}

/// Extra guard appended to the conditional UPDATE so a concurrent punch loses cleanly.
fn punch_guard(punch: Punch) -> &'static str {
    match punch {
        Punch::ClockIn => "clock_in IS NULL",
        Punch::LunchOut => "clock_in IS NOT NULL AND lunch_out IS NULL AND clock_out IS NULL",
        Punch::LunchIn => {
            "clock_in IS NOT NULL AND lunch_out IS NOT NULL AND lunch_in IS NULL AND clock_out IS NULL"
        }
        Punch::ClockOut => {
            "clock_in IS NOT NULL AND clock_out IS NULL AND (lunch_out IS NULL OR lunch_in IS NOT NULL)"
        }
    }
}

fn conflict() -> HttpResponse {
    HttpResponse::Conflict().json(json!({
        "message": "Time record changed meanwhile, reload and try again"
    }))
}

async fn register_punch(
    punch: Punch,
    auth: AuthUser,
    pool: &MySqlPool,
    config: &Config,
    body: Option<web::Json<PunchReq>>,
) -> actix_web::Result<HttpResponse> {
    auth.require_collaborator()?;

    let req = body.map(|b| b.into_inner()).unwrap_or_default();
    let coords = match normalize_coordinates(req.latitude, req.longitude) {
        Ok(c) => c,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };
    let (latitude, longitude) = (coords.map(|c| c.0), coords.map(|c| c.1));

    let offset = config.work_offset();
    let now = Utc::now();
    let work_date = local_date(now, offset);

    let existing = find_day(auth.user_id, work_date, pool)
        .await
        .map_err(db_error("Failed to fetch today's time record"))?;

    let punches = existing.as_ref().map(|r| r.punches()).unwrap_or_default();
    if let Err(e) = punches.check(punch) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    let column = punch.column();
    let (lat_column, lon_column) = punch.coordinate_columns();

    match existing {
        None => {
            // Only clock-in can pass the check without a row.
            let result = sqlx::query(&format!(
                "INSERT INTO time_records (user_id, work_date, {column}, {lat_column}, {lon_column}) VALUES (?, ?, ?, ?, ?)"
            ))
            .bind(auth.user_id)
            .bind(work_date)
            .bind(now)
            .bind(latitude)
            .bind(longitude)
            .execute(pool)
            .await;

            if let Err(e) = result {
                if is_unique_violation(&e) {
                    return Ok(conflict());
                }
                tracing::error!(error = %e, user_id = auth.user_id, "Clock-in failed");
                return Err(actix_web::error::ErrorInternalServerError(
                    "Internal Server Error",
                ));
            }
        }
        Some(record) => {
            let result = sqlx::query(&format!(
                "UPDATE time_records SET {column} = ?, {lat_column} = ?, {lon_column} = ? WHERE id = ? AND {}",
                punch_guard(punch)
            ))
            .bind(now)
            .bind(latitude)
            .bind(longitude)
            .bind(record.id)
            .execute(pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = auth.user_id, column, "Punch failed");
                actix_web::error::ErrorInternalServerError("Internal Server Error")
            })?;

            if result.rows_affected() == 0 {
                return Ok(conflict());
            }
        }
    }

    tracing::info!(user_id = auth.user_id, column, %work_date, "Punch registered");
    Ok(HttpResponse::Ok().json(json!({
        "message": punch.success_message(),
        "time": local_time(now, offset).format("%H:%M:%S").to_string(),
    })))
}

/// Register the day's clock-in
#[utoipa::path(
    post,
    path = "/api/time-records/clock-in",
    request_body(content = PunchReq, description = "Optional GPS fix"),
    responses(
        (status = 200, description = "Punch registered", body = Object, example = json!({
            "message": "Clock-in registered", "time": "09:00:12"
        })),
        (status = 400, description = "Punch not allowed now", body = Object, example = json!({
            "message": "Clock-in already registered today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent punch")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn clock_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    register_punch(Punch::ClockIn, auth, pool.get_ref(), &config, body).await
}

/// Register the start of lunch
#[utoipa::path(
    post,
    path = "/api/time-records/lunch-out",
    request_body(content = PunchReq, description = "Optional GPS fix"),
    responses(
        (status = 200, description = "Punch registered"),
        (status = 400, description = "Punch not allowed now"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent punch")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn lunch_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    register_punch(Punch::LunchOut, auth, pool.get_ref(), &config, body).await
}

/// Register the end of lunch
#[utoipa::path(
    post,
    path = "/api/time-records/lunch-in",
    request_body(content = PunchReq, description = "Optional GPS fix"),
    responses(
        (status = 200, description = "Punch registered"),
        (status = 400, description = "Punch not allowed now"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent punch")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn lunch_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    register_punch(Punch::LunchIn, auth, pool.get_ref(), &config, body).await
}

/// Register the day's clock-out
#[utoipa::path(
    post,
    path = "/api/time-records/clock-out",
    request_body(content = PunchReq, description = "Optional GPS fix"),
    responses(
        (status = 200, description = "Punch registered"),
        (status = 400, description = "Punch not allowed now"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Concurrent punch")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn clock_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    body: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    register_punch(Punch::ClockOut, auth, pool.get_ref(), &config, body).await
}

/// Caller's time record history, newest first
#[utoipa::path(
    get,
    path = "/api/time-records/mine",
    params(DateFilter),
    responses(
        (status = 200, description = "History", body = [TimeRecordView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn my_records(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<DateFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let mut filters = Filters::new();
    filters.push("t.user_id = ?", [SqlValue::U64(auth.user_id)]);
    if let Some(date) = query.date {
        filters.push("t.work_date = ?", [SqlValue::Date(date)]);
    }

    let sql = format!(
        "SELECT {TIME_RECORD_COLUMNS} FROM time_records t{} ORDER BY t.work_date DESC",
        filters.where_sql()
    );
    let records = bind_as(sqlx::query_as::<_, TimeRecord>(&sql), filters.values())
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch time record history"))?;

    let offset = config.work_offset();
    let data: Vec<TimeRecordView> = records
        .into_iter()
        .map(|r| TimeRecordView::new(r, None, offset))
        .collect();

    Ok(HttpResponse::Ok().json(data))
}

/// All time records, filterable by name and date
#[utoipa::path(
    get,
    path = "/api/admin/time-records",
    params(AdminTimeRecordFilter),
    responses(
        (status = 200, description = "Paginated time records", body = TimeRecordListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn admin_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    query: web::Query<AdminTimeRecordFilter>,
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
        filters.push("t.work_date = ?", [SqlValue::Date(date)]);
    }
    let where_sql = filters.where_sql();

    let count_sql = format!(
        "SELECT COUNT(*) FROM time_records t JOIN users u ON u.id = t.user_id{where_sql}"
    );
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count time records"))?;

    let data_sql = format!(
        r#"
        SELECT {TIME_RECORD_COLUMNS}, u.username, u.full_name
        FROM time_records t
        JOIN users u ON u.id = t.user_id
        {where_sql}
        ORDER BY t.work_date DESC, t.clock_in DESC
        LIMIT ? OFFSET ?
        "#
    );
    let rows = bind_as(sqlx::query_as::<_, TimeRecordWithUser>(&data_sql), filters.values())
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch time records"))?;

    let offset = config.work_offset();
    Ok(HttpResponse::Ok().json(TimeRecordListResponse {
        data: rows.into_iter().map(|r| r.into_view(offset)).collect(),
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

async fn fetch_view(
    id: u64,
    pool: &MySqlPool,
    offset: FixedOffset,
) -> Result<Option<TimeRecordView>, sqlx::Error> {
    let row = sqlx::query_as::<_, TimeRecordWithUser>(&format!(
        r#"
        SELECT {TIME_RECORD_COLUMNS}, u.username, u.full_name
        FROM time_records t
        JOIN users u ON u.id = t.user_id
        WHERE t.id = ?
        "#
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.into_view(offset)))
}

/// One time record
#[utoipa::path(
    get,
    path = "/api/admin/time-records/{id}",
    params(("id" = u64, Path, description = "Time record id")),
    responses(
        (status = 200, description = "Time record", body = TimeRecordView),
        (status = 404, description = "Not found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn admin_get(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    match fetch_view(id, pool.get_ref(), config.work_offset())
        .await
        .map_err(db_error("Failed to fetch time record"))?
    {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Time record not found" }))),
    }
}

/// Create a time record for any user
#[utoipa::path(
    post,
    path = "/api/admin/time-records",
    request_body = TimeRecordReq,
    responses(
        (status = 201, description = "Created", body = Object, example = json!({ "id": 42 })),
        (status = 400, description = "Invalid payload or unknown user"),
        (status = 409, description = "User already has a record for that day"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn admin_create(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<TimeRecordReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let Some(user_id) = payload.user_id else {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "user_id is required" })));
    };
    let punches = match payload.punches(config.work_offset()) {
        Ok(p) => p,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO time_records (user_id, work_date, clock_in, lunch_out, lunch_in, clock_out)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(payload.work_date)
    .bind(punches.clock_in)
    .bind(punches.lunch_out)
    .bind(punches.lunch_in)
    .bind(punches.clock_out)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(done) => Ok(HttpResponse::Created().json(json!({ "id": done.last_insert_id() }))),
        Err(e) if is_unique_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "User already has a time record for that day"
        }))),
        Err(e) if is_foreign_key_violation(&e) => {
            Ok(HttpResponse::BadRequest().json(json!({ "message": "User not found" })))
        }
        Err(e) => Err(db_error("Failed to create time record")(e)),
    }
}

/// A PUT may repeat the owner's id but never name someone else.
fn changes_owner(requested: Option<u64>, owner: u64) -> bool {
    requested.is_some_and(|id| id != owner)
}

/// Replace the date and punches of a time record
#[utoipa::path(
    put,
    path = "/api/admin/time-records/{id}",
    params(("id" = u64, Path, description = "Time record id")),
    request_body = TimeRecordReq,
    responses(
        (status = 200, description = "Updated", body = TimeRecordView),
        (status = 400, description = "Invalid payload or user_id of another user"),
        (status = 404, description = "Not found"),
        (status = 409, description = "User already has a record for that day"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn admin_update(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    payload: web::Json<TimeRecordReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    let offset = config.work_offset();
    let punches = match payload.punches(offset) {
        Ok(p) => p,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let owner = sqlx::query_scalar::<_, u64>("SELECT user_id FROM time_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to look up time record"))?;
    let Some(owner) = owner else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Time record not found" })));
    };
    if changes_owner(payload.user_id, owner) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "A time record cannot be moved to another user"
        })));
    }

    let result = sqlx::query(
        r#"
        UPDATE time_records
        SET work_date = ?, clock_in = ?, lunch_out = ?, lunch_in = ?, clock_out = ?
        WHERE id = ?
        "#,
    )
    .bind(payload.work_date)
    .bind(punches.clock_in)
    .bind(punches.lunch_out)
    .bind(punches.lunch_in)
    .bind(punches.clock_out)
    .bind(id)
    .execute(pool.get_ref())
    .await;

    if let Err(e) = result {
        if is_unique_violation(&e) {
            return Ok(HttpResponse::Conflict().json(json!({
                "message": "User already has a time record for that day"
            })));
        }
        return Err(db_error("Failed to update time record")(e));
    }

    match fetch_view(id, pool.get_ref(), offset)
        .await
        .map_err(db_error("Failed to reload time record"))?
    {
        Some(view) => Ok(HttpResponse::Ok().json(view)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Time record not found" }))),
    }
}

/// Delete a time record
#[utoipa::path(
    delete,
    path = "/api/admin/time-records/{id}",
    params(("id" = u64, Path, description = "Time record id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Time records"
)]
pub async fn admin_delete(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    let result = sqlx::query("DELETE FROM time_records WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to delete time record"))?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Time record not found" })));
    }
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    #[test]
    fn update_keeps_the_record_owner() {
        assert!(!changes_owner(None, 7));
        assert!(!changes_owner(Some(7), 7));
        assert!(changes_owner(Some(8), 7));
    }

    #[test]
    fn request_times_become_utc_instants() {
        let req = TimeRecordReq {
            user_id: Some(1),
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            clock_in: Some("09:00".into()),
            lunch_out: None,
            lunch_in: Some("".into()),
            clock_out: Some("18:00:30".into()),
        };
        let punches = req.punches(offset()).unwrap();
        assert_eq!(punches.clock_in, Some(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()));
        assert_eq!(punches.lunch_out, None);
        assert_eq!(punches.lunch_in, None);
        assert_eq!(punches.clock_out, Some(Utc.with_ymd_and_hms(2026, 3, 2, 17, 0, 30).unwrap()));
    }

    #[test]
    fn bad_request_time_names_the_field() {
        let req = TimeRecordReq {
            user_id: None,
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            clock_in: Some("9h".into()),
            lunch_out: None,
            lunch_in: None,
            clock_out: None,
        };
        assert!(req.punches(offset()).unwrap_err().contains("clock_in"));
    }

    #[test]
    fn view_renders_local_times_and_total() {
        let day = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let at = |h, m| Some(local_to_utc(day, NaiveTime::from_hms_opt(h, m, 0).unwrap(), offset()));
        let record = TimeRecord {
            id: 1,
            user_id: 2,
            work_date: day,
            clock_in: at(9, 0),
            lunch_out: at(12, 0),
            lunch_in: at(13, 0),
            clock_out: at(17, 30),
            clock_in_latitude: Some(38.7),
            clock_in_longitude: Some(-9.1),
            lunch_out_latitude: None,
            lunch_out_longitude: None,
            lunch_in_latitude: None,
            lunch_in_longitude: None,
            clock_out_latitude: None,
            clock_out_longitude: None,
        };
        let view = TimeRecordView::new(record, None, offset());
        assert_eq!(view.clock_in.as_deref(), Some("09:00:00"));
        assert_eq!(view.clock_out.as_deref(), Some("17:30:00"));
        assert_eq!(view.total_worked, "07:30");
        assert!(view.clock_in_location.is_some());
        assert!(view.clock_out_location.is_none());
    }

    #[test]
    fn today_view_of_empty_day() {
        let view = TodayView::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            DayPunches::default(),
            offset(),
        );
        assert!(view.clock_in.is_none());
        assert_eq!(view.total_worked, "--:--");
    }
}
