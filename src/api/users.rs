use crate::{
    auth::{
        auth::AuthUser,
        password::{hash_password, random_secret, validate_pin},
    },
    config::Config,
    model::{role::Role, user::User},
    utils::{
        db_utils::{
            Filters, Page, SqlValue, UpdateBuilder, bind_as, bind_query, bind_scalar, db_error,
            is_foreign_key_violation, is_unique_violation, like_pattern,
        },
        username_index,
    },
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

const USER_COLUMNS: &str = r#"
    id, username, email, full_name, password, pin_hash, role_id, facial_profile,
    vacation_days_available, last_vacation_credit_year, is_active_employee, last_login_at, created_at
"#;
const USERNAME_MAX: usize = 100;

#[derive(Serialize, ToSchema)]
pub struct UserView {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "ana")]
    pub username: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "Ana Silva", nullable = true)]
    pub full_name: Option<String>,
    #[schema(value_type = String, example = "Collaborator")]
    pub role: Option<Role>,
    #[schema(example = 22)]
    pub vacation_days_available: i32,
    pub is_active_employee: bool,
    pub has_pin: bool,
    pub has_face_profile: bool,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            role: Role::from_id(user.role_id),
            has_pin: user.pin_hash.is_some(),
            has_face_profile: user.facial_profile.is_some(),
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            vacation_days_available: user.vacation_days_available,
            is_active_employee: user.is_active_employee,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<UserView>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
pub struct UserFilter {
    /// Matches username, full name or email
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "ana")]
    pub username: String,
    #[schema(example = "ana@example.com")]
    pub email: String,
    #[schema(example = "Ana Silva")]
    pub full_name: Option<String>,
    #[schema(example = "1234")]
    pub pin: String,
    #[schema(value_type = String, example = "Collaborator")]
    pub role: Role,
    /// Omit for PIN-only accounts
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub pin: Option<String>,
    #[schema(value_type = Option<String>, example = "Admin")]
    pub role: Option<Role>,
    pub is_active_employee: Option<bool>,
}

fn validate_username(raw: &str) -> Result<String, &'static str> {
    let username = raw.trim();
    if username.is_empty() {
        return Err("Username is required");
    }
    if username.chars().count() > USERNAME_MAX {
        return Err("Username must be at most 100 characters");
    }
    if username.chars().any(char::is_whitespace) {
        return Err("Username must not contain spaces");
    }
    Ok(username.to_string())
}

fn validate_email(raw: &str) -> Result<String, &'static str> {
    let email = raw.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email.to_string()),
        _ => Err("Email is not valid"),
    }
}

fn bad_request(message: impl std::fmt::Display) -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "message": message.to_string() }))
}

fn username_taken() -> HttpResponse {
    HttpResponse::Conflict().json(json!({ "message": "Username or email already taken" }))
}

fn hash_secret(secret: &str) -> actix_web::Result<String> {
    hash_password(secret).map_err(|e| {
        error!(error = %e, "Failed to hash secret");
        ErrorInternalServerError("Internal Server Error")
    })
}

async fn fetch_user(id: u64, pool: &MySqlPool) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// List users
#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Paginated users", body = UserListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserFilter>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let page = Page::new(query.page, query.per_page);
    let mut filters = Filters::new();
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        filters.push(
            "(username LIKE ? OR full_name LIKE ? OR email LIKE ?)",
            [
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern),
            ],
        );
    }
    let where_sql = filters.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM users{where_sql}");
    let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), filters.values())
        .fetch_one(pool.get_ref())
        .await
        .map_err(db_error("Failed to count users"))?;

    let data_sql =
        format!("SELECT {USER_COLUMNS} FROM users{where_sql} ORDER BY username LIMIT ? OFFSET ?");
    let users = bind_as(sqlx::query_as::<_, User>(&data_sql), filters.values())
        .bind(page.per_page)
        .bind(page.offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch users"))?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data: users.into_iter().map(UserView::from).collect(),
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserView),
        (status = 404, description = "Not found"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    match fetch_user(path.into_inner(), pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch user"))?
    {
        Some(user) => Ok(HttpResponse::Ok().json(UserView::from(user))),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" }))),
    }
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "Created", body = UserView),
        (status = 400, description = "Invalid payload", body = Object, example = json!({
            "message": "PIN must be exactly 4 digits"
        })),
        (status = 409, description = "Username or email taken"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let username = match validate_username(&payload.username) {
        Ok(u) => u,
        Err(message) => return Ok(bad_request(message)),
    };
    let email = match validate_email(&payload.email) {
        Ok(e) => e,
        Err(message) => return Ok(bad_request(message)),
    };
    if let Err(e) = validate_pin(&payload.pin) {
        return Ok(bad_request(e));
    }
    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    if !username_index::is_username_available(&username, pool.get_ref()).await {
        return Ok(username_taken());
    }

    let password = match payload.password.as_deref().filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None => random_secret(),
    };
    let password_hash = hash_secret(&password)?;
    let pin_hash = hash_secret(&payload.pin)?;

    // New users start with the initial balance and count as credited this year.
    let result = sqlx::query(
        r#"
        INSERT INTO users
            (username, email, full_name, password, pin_hash, role_id,
             vacation_days_available, last_vacation_credit_year, is_active_employee)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, TRUE)
        "#,
    )
    .bind(&username)
    .bind(&email)
    .bind(full_name)
    .bind(&password_hash)
    .bind(&pin_hash)
    .bind(payload.role.id())
    .bind(config.vacation_initial_days)
    .bind(Utc::now().year())
    .execute(pool.get_ref())
    .await;

    let id = match result {
        Ok(done) => done.last_insert_id(),
        Err(e) if is_unique_violation(&e) => return Ok(username_taken()),
        Err(e) => return Err(db_error("Failed to create user")(e)),
    };

    username_index::remember(&username).await;
    info!(admin_id = auth.user_id, user_id = id, %username, "User created");

    match fetch_user(id, pool.get_ref())
        .await
        .map_err(db_error("Failed to reload user"))?
    {
        Some(user) => Ok(HttpResponse::Created().json(UserView::from(user))),
        None => Ok(HttpResponse::Created().json(json!({ "id": id }))),
    }
}

/// Update a user; only supplied fields change
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Username or email taken"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    let Some(current) = fetch_user(id, pool.get_ref())
        .await
        .map_err(db_error("Failed to fetch user"))?
    else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" })));
    };

    let mut update = UpdateBuilder::new("users");
    let mut renamed_to = None;

    if let Some(raw) = payload.username.as_deref() {
        let username = match validate_username(raw) {
            Ok(u) => u,
            Err(message) => return Ok(bad_request(message)),
        };
        if !username.eq_ignore_ascii_case(&current.username) {
            if !username_index::is_username_available(&username, pool.get_ref()).await {
                return Ok(username_taken());
            }
            renamed_to = Some(username.clone());
        }
        update.set("username", SqlValue::String(username));
    }
    if let Some(raw) = payload.email.as_deref() {
        match validate_email(raw) {
            Ok(email) => update.set("email", SqlValue::String(email)),
            Err(message) => return Ok(bad_request(message)),
        };
    }
    if let Some(raw) = payload.full_name.as_deref() {
        let name = raw.trim();
        let value = if name.is_empty() { SqlValue::Null } else { SqlValue::String(name.to_string()) };
        update.set("full_name", value);
    }
    if let Some(pin) = payload.pin.as_deref() {
        if let Err(e) = validate_pin(pin) {
            return Ok(bad_request(e));
        }
        update.set("pin_hash", SqlValue::String(hash_secret(pin)?));
    }
    if let Some(role) = payload.role {
        if id == auth.user_id && role != Role::Admin {
            return Ok(bad_request("You cannot remove your own admin role"));
        }
        update.set("role_id", SqlValue::U64(u64::from(role.id())));
    }
    if let Some(active) = payload.is_active_employee {
        update.set("is_active_employee", SqlValue::Bool(active));
    }

    let Some(sql_update) = update.build("id", id) else {
        return Ok(bad_request("No fields provided for update"));
    };

    if let Err(e) = bind_query(sqlx::query(&sql_update.sql), &sql_update.values)
        .execute(pool.get_ref())
        .await
    {
        if is_unique_violation(&e) {
            return Ok(username_taken());
        }
        return Err(db_error("Failed to update user")(e));
    }

    if let Some(new_name) = renamed_to {
        username_index::forget(&current.username).await;
        username_index::remember(&new_name).await;
    }
    info!(admin_id = auth.user_id, user_id = id, "User updated");

    match fetch_user(id, pool.get_ref())
        .await
        .map_err(db_error("Failed to reload user"))?
    {
        Some(user) => Ok(HttpResponse::Ok().json(UserView::from(user))),
        None => Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" }))),
    }
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "Not found"),
        (status = 409, description = "User still has orders"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let id = path.into_inner();
    if id == auth.user_id {
        return Ok(bad_request("You cannot delete your own account"));
    }

    let username = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(db_error("Failed to look up user"))?;
    let Some(username) = username else {
        return Ok(HttpResponse::NotFound().json(json!({ "message": "User not found" })));
    };

    match sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool.get_ref())
        .await
    {
        Ok(_) => {
            username_index::forget(&username).await;
            info!(admin_id = auth.user_id, user_id = id, "User deleted");
            Ok(HttpResponse::NoContent().finish())
        }
        Err(e) if is_foreign_key_violation(&e) => Ok(HttpResponse::Conflict().json(json!({
            "message": "User still has orders, deactivate the account instead"
        }))),
        Err(e) => Err(db_error("Failed to delete user")(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert_eq!(validate_username("  ana "), Ok("ana".to_string()));
        assert!(validate_username("").is_err());
        assert!(validate_username("ana silva").is_err());
        assert!(validate_username(&"a".repeat(101)).is_err());
    }

    #[test]
    fn email_rules() {
        assert_eq!(validate_email(" ana@example.com "), Ok("ana@example.com".to_string()));
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@localhost").is_err());
    }

    #[test]
    fn create_payload_reads_role_names() {
        let req: CreateUser = serde_json::from_value(json!({
            "username": "ana",
            "email": "ana@example.com",
            "pin": "1234",
            "role": "Collaborator"
        }))
        .unwrap();
        assert_eq!(req.role, Role::Collaborator);
        assert!(req.password.is_none());
    }

    #[test]
    fn view_hides_secrets() {
        let user = User {
            id: 1,
            username: "ana".into(),
            email: "ana@example.com".into(),
            full_name: None,
            password: "hash".into(),
            pin_hash: Some("pin".into()),
            role_id: 2,
            facial_profile: None,
            vacation_days_available: 24,
            last_vacation_credit_year: 2026,
            is_active_employee: true,
            last_login_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(UserView::from(user)).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("pin_hash").is_none());
        assert_eq!(json["has_pin"], true);
        assert_eq!(json["has_face_profile"], false);
        assert_eq!(json["role"], "Collaborator");
    }
}
