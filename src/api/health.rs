use actix_web::{HttpResponse, Responder, web};
use sqlx::MySqlPool;
use tracing::error;

/// Liveness check that also reaches the database
#[utoipa::path(
    get,
    path = "/healthcheck",
    responses(
        (status = 200, description = "Service and database reachable", body = String, example = json!("OK")),
        (status = 500, description = "Database unreachable")
    ),
    tag = "Health"
)]
pub async fn healthcheck(pool: web::Data<MySqlPool>) -> impl Responder {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(pool.get_ref())
        .await
    {
        Ok(_) => HttpResponse::Ok().content_type("text/plain").body("OK"),
        Err(e) => {
            error!(error = %e, "Healthcheck failed");
            HttpResponse::InternalServerError()
                .content_type("text/plain")
                .body("Database unavailable")
        }
    }
}
