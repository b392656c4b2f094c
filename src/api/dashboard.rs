use crate::{
    api::time_records::{TodayView, find_day},
    api::absences::fetch_user_absences,
    auth::auth::AuthUser,
    config::Config,
    model::{absence::Absence, user::display_name},
    utils::{db_utils::db_error, work_time::local_today},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

const RECENT_ABSENCES: u64 = 5;

#[derive(Serialize, ToSchema)]
pub struct DashboardView {
    #[schema(example = "Ana Silva")]
    pub display_name: String,
    pub today: TodayView,
    pub recent_absences: Vec<Absence>,
    #[schema(example = 22)]
    pub vacation_days_available: i32,
}

#[derive(FromRow)]
struct DashboardUser {
    username: String,
    full_name: Option<String>,
    vacation_days_available: i32,
}

/// Landing page data for the signed-in collaborator
#[utoipa::path(
    get,
    path = "/api/collaborator/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Account no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn dashboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_collaborator()?;

    let user = sqlx::query_as::<_, DashboardUser>(
        "SELECT username, full_name, vacation_days_available FROM users WHERE id = ?",
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch dashboard user"))?;

    let Some(user) = user else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" })));
    };

    let offset = config.work_offset();
    let work_date = local_today(offset);
    let punches = find_day(auth.user_id, work_date, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch today's time record"))?
        .map(|r| r.punches())
        .unwrap_or_default();

    let recent_absences = fetch_user_absences(auth.user_id, Some(RECENT_ABSENCES), pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch recent absences"))?;

    Ok(HttpResponse::Ok().json(DashboardView {
        display_name: display_name(user.full_name.as_deref(), &user.username).to_string(),
        today: TodayView::new(work_date, punches, offset),
        recent_absences,
        vacation_days_available: user.vacation_days_available,
    }))
}
