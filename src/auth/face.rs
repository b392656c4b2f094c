use crate::{
    auth::{
        auth::AuthUser,
        handlers::{fetch_auth_user_by_id, issue_tokens, touch_last_login},
    },
    config::Config,
    models::FaceDescriptorReq,
    utils::{
        db_utils::db_error,
        face_descriptor::{DESCRIPTOR_BYTES, FaceDescriptor, best_match},
    },
};
use actix_web::{HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};

/// Sign in by face
#[utoipa::path(
    post,
    path = "/auth/face/verify",
    request_body = FaceDescriptorReq,
    responses(
        (status = 200, description = "Face recognised, signed in", body = crate::models::TokenPair),
        (status = 400, description = "Descriptor missing, not base64, or not 512 bytes", body = Object, example = json!({
            "message": "Face descriptor must be 512 bytes, got 16"
        })),
        (status = 401, description = "Face not recognised")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_face_verify", skip_all)]
pub async fn verify_face(
    payload: web::Json<FaceDescriptorReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let probe = match FaceDescriptor::from_base64(&payload.descriptor) {
        Ok(d) => d,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    let stored = sqlx::query_as::<_, (u64, Vec<u8>)>(
        r#"
        SELECT id, facial_profile
        FROM users
        WHERE facial_profile IS NOT NULL
          AND LENGTH(facial_profile) = ?
          AND is_active_employee = TRUE
        "#,
    )
    .bind(DESCRIPTOR_BYTES as u32)
    .fetch_all(pool.get_ref())
    .await
    .map_err(db_error("Failed to load facial profiles"))?;

    debug!(profiles = stored.len(), "Comparing against stored profiles");

    let candidates = stored
        .into_iter()
        .filter_map(|(id, bytes)| FaceDescriptor::from_bytes(&bytes).ok().map(|d| (id, d)));

    let Some((user_id, distance)) = best_match(&probe, candidates, config.face_distance_threshold)
    else {
        info!("Face not recognised");
        return Ok(HttpResponse::Unauthorized().json(json!({ "message": "Face not recognised" })));
    };

    // The user may have been removed between the two reads.
    let Some(user) = fetch_auth_user_by_id(user_id, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch matched user"))?
    else {
        return Ok(HttpResponse::Unauthorized().json(json!({ "message": "Face not recognised" })));
    };

    info!(user_id, distance, "Face matched");
    let tokens = issue_tokens(&user, pool.get_ref(), &config).await?;
    touch_last_login(user.id, pool.get_ref()).await;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Store the caller's facial profile
#[utoipa::path(
    put,
    path = "/api/face/profile",
    request_body = FaceDescriptorReq,
    responses(
        (status = 200, description = "Profile stored", body = Object, example = json!({
            "message": "Facial profile saved"
        })),
        (status = 400, description = "Invalid descriptor"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Face"
)]
pub async fn register_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<FaceDescriptorReq>,
) -> actix_web::Result<impl Responder> {
    let descriptor = match FaceDescriptor::from_base64(&payload.descriptor) {
        Ok(d) => d,
        Err(e) => {
            return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
        }
    };

    sqlx::query("UPDATE users SET facial_profile = ? WHERE id = ?")
        .bind(descriptor.to_bytes())
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to store facial profile"))?;

    info!(user_id = auth.user_id, "Facial profile saved");
    Ok(HttpResponse::Ok().json(json!({ "message": "Facial profile saved" })))
}

/// Remove the caller's facial profile
#[utoipa::path(
    delete,
    path = "/api/face/profile",
    responses(
        (status = 200, description = "Profile removed"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Face"
)]
pub async fn delete_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    sqlx::query("UPDATE users SET facial_profile = NULL WHERE id = ?")
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(db_error("Failed to clear facial profile"))?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Facial profile removed" })))
}
