use crate::{
    auth::auth::AuthUser,
    model::material::Material,
    utils::db_utils::{db_error, is_foreign_key_violation, is_unique_violation},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::ToSchema;

pub const DESCRIPTION_MAX: usize = 200;

#[derive(Deserialize, ToSchema)]
pub struct MaterialReq {
    /// Must match the path id when given
    #[schema(example = 3)]
    pub id: Option<u64>,
    #[schema(example = "Cement 25kg")]
    pub description: String,
}

pub fn validate_description(raw: &str) -> Result<String, &'static str> {
    let description = raw.trim();
    if description.is_empty() {
        return Err("Description is required");
    }
    if description.chars().count() > DESCRIPTION_MAX {
        return Err("Description must be at most 200 characters");
    }
    Ok(description.to_string())
}

fn duplicate() -> HttpResponse {
    HttpResponse::Conflict().json(json!({ "message": "A material with this description already exists" }))
}

/// List all materials
#[utoipa::path(
    get,
    path = "/api/materials",
    responses(
        (status = 200, description = "Materials", body = [Material]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Materials"
)]
pub async fn list_materials(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let materials =
        sqlx::query_as::<_, Material>("SELECT id, description FROM materials ORDER BY description")
            .fetch_all(pool.get_ref())
            .await
            .map_err(db_error("Failed to list materials"))?;
    Ok(HttpResponse::Ok().json(materials))
}

/// Get one material
#[utoipa::path(
    get,
    path = "/api/materials/{id}",
    params(("id" = u64, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material", body = Material),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Materials"
)]
pub async fn get_material(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let material = sqlx::query_as::<_, Material>("SELECT id, description FROM materials WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch material"))?;

    match material {
        Some(m) => Ok(HttpResponse::Ok().json(m)),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "Material not found" }))),
    }
}

/// Create a material
#[utoipa::path(
    post,
    path = "/api/materials",
    request_body = MaterialReq,
    responses(
        (status = 201, description = "Created", body = Material),
        (status = 400, description = "Invalid description"),
        (status = 409, description = "Duplicate description"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Materials"
)]
pub async fn create_material(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<MaterialReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let description = match validate_description(&payload.description) {
        Ok(d) => d,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    match sqlx::query("INSERT INTO materials (description) VALUES (?)")
        .bind(&description)
        .execute(pool.get_ref())
        .await
    {
        Ok(done) => Ok(HttpResponse::Created().json(Material {
            id: done.last_insert_id(),
            description,
        })),
        Err(e) if is_unique_violation(&e) => Ok(duplicate()),
        Err(e) => Err(db_error("Failed to create material")(e)),
    }
}

/// Rename a material
#[utoipa::path(
    put,
    path = "/api/materials/{id}",
    params(("id" = u64, Path, description = "Material id")),
    request_body = MaterialReq,
    responses(
        (status = 204, description = "Updated"),
        (status = 400, description = "Invalid description or id mismatch"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Duplicate description"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Materials"
)]
pub async fn update_material(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<MaterialReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    if payload.id.is_some_and(|body_id| body_id != id) {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Id in the URL does not match the id in the body"
        })));
    }
    let description = match validate_description(&payload.description) {
        Ok(d) => d,
        Err(message) => return Ok(HttpResponse::BadRequest().json(json!({ "message": message }))),
    };

    let exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM materials WHERE id = ?")
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to look up material"))?;
    if exists == 0 {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "Material not found" })));
    }

    match sqlx::query("UPDATE materials SET description = ? WHERE id = ?")
        .bind(&description)
        .bind(id)
        .execute(pool.get_ref())
        .await
    {
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) if is_unique_violation(&e) => Ok(duplicate()),
        Err(e) => Err(db_error("Failed to update material")(e)),
    }
}

/// Delete a material that no order line references
#[utoipa::path(
    delete,
    path = "/api/materials/{id}",
    params(("id" = u64, Path, description = "Material id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Material is used by an order"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Materials"
)]
pub async fn delete_material(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    match sqlx::query("DELETE FROM materials WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
    {
        Ok(done) if done.rows_affected() == 0 => {
            Ok(HttpResponse::NotFound().json(json!({ "message": "Material not found" })))
        }
        Ok(_) => Ok(HttpResponse::NoContent().finish()),
        Err(e) if is_foreign_key_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "Material is used by an order and cannot be deleted"
        }))),
        Err(e) => Err(db_error("Failed to delete material")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_rules() {
        assert_eq!(validate_description("  Sand "), Ok("Sand".to_string()));
        assert_eq!(validate_description("   "), Err("Description is required"));
        assert!(validate_description(&"x".repeat(201)).is_err());
        assert!(validate_description(&"x".repeat(200)).is_ok());
    }
}
