use crate::{
    auth::auth::AuthUser,
    model::{
        feedback::{Feedback, FeedbackKind},
        user::display_name,
    },
    utils::db_utils::db_error,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use utoipa::ToSchema;

const TITLE_MAX: usize = 150;
const FEEDBACK_COLUMNS: &str =
    "f.id, f.user_id, f.kind, f.title, f.description, f.registered_at, f.status";

#[derive(Deserialize, ToSchema)]
pub struct CreateFeedback {
    pub kind: FeedbackKind,
    #[schema(example = "Dark mode")]
    pub title: String,
    #[schema(example = "The clock screen is too bright at night.")]
    pub description: String,
}

impl CreateFeedback {
    fn validate(&self) -> Result<(String, String), &'static str> {
        let title = self.title.trim();
        let description = self.description.trim();
        if title.is_empty() {
            return Err("Title is required");
        }
        if title.chars().count() > TITLE_MAX {
            return Err("Title must be at most 150 characters");
        }
        if description.is_empty() {
            return Err("Description is required");
        }
        Ok((title.to_string(), description.to_string()))
    }
}

#[derive(Serialize, ToSchema)]
pub struct FeedbackView {
    #[serde(flatten)]
    pub feedback: Feedback,
    #[schema(example = "Ana Silva")]
    pub user_name: String,
}

#[derive(FromRow)]
struct FeedbackRow {
    #[sqlx(flatten)]
    feedback: Feedback,
    username: String,
    full_name: Option<String>,
}

/// Send a bug report, suggestion or other feedback
#[utoipa::path(
    post,
    path = "/api/feedback",
    request_body = CreateFeedback,
    responses(
        (status = 201, description = "Feedback received", body = Object, example = json!({
            "message": "Thank you for your feedback", "id": 4
        })),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn create_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateFeedback>,
) -> actix_web::Result<impl Responder> {
    let (title, description) = match payload.validate() {
        Ok(v) => v,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO feedback (user_id, kind, title, description, registered_at, status)
        VALUES (?, ?, ?, ?, ?, 'pending')
        "#,
    )
    .bind(auth.user_id)
    .bind(payload.kind.as_ref())
    .bind(&title)
    .bind(&description)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await
    .map_err(db_error("Failed to store feedback"))?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Thank you for your feedback",
        "id": result.last_insert_id()
    })))
}

/// Caller's own submissions, newest first
#[utoipa::path(
    get,
    path = "/api/feedback/mine",
    responses(
        (status = 200, description = "Submissions", body = [Feedback]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn my_feedback(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let items = sqlx::query_as::<_, Feedback>(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback f WHERE f.user_id = ? ORDER BY f.registered_at DESC"
    ))
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch feedback"))?;
    Ok(HttpResponse::Ok().json(items))
}

/// Every submission with its author, newest first
#[utoipa::path(
    get,
    path = "/api/admin/feedback",
    responses(
        (status = 200, description = "Submissions", body = [FeedbackView]),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Feedback"
)]
pub async fn admin_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let rows = sqlx::query_as::<_, FeedbackRow>(&format!(
        r#"
        SELECT {FEEDBACK_COLUMNS}, u.username, u.full_name
        FROM feedback f
        JOIN users u ON u.id = f.user_id
        ORDER BY f.registered_at DESC
        "#
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to fetch feedback"))?;

    let data: Vec<FeedbackView> = rows
        .into_iter()
        .map(|r| FeedbackView {
            user_name: display_name(r.full_name.as_deref(), &r.username).to_string(),
            feedback: r.feedback,
        })
        .collect();
    Ok(HttpResponse::Ok().json(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(title: &str, description: &str) -> CreateFeedback {
        CreateFeedback {
            kind: FeedbackKind::Bug,
            title: title.into(),
            description: description.into(),
        }
    }

    #[test]
    fn feedback_validation() {
        assert_eq!(
            req(" Crash ", " On save ").validate(),
            Ok(("Crash".to_string(), "On save".to_string()))
        );
        assert_eq!(req("", "x").validate(), Err("Title is required"));
        assert_eq!(req("x", " ").validate(), Err("Description is required"));
        assert!(req(&"t".repeat(151), "x").validate().is_err());
    }

    #[test]
    fn kind_is_lowercase_on_the_wire() {
        let kind: FeedbackKind = serde_json::from_str("\"suggestion\"").unwrap();
        assert_eq!(kind, FeedbackKind::Suggestion);
        assert_eq!(FeedbackKind::Other.as_ref(), "other");
    }
}
