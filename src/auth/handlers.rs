use crate::{
    auth::{
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{validate_pin, verify_password},
    },
    config::Config,
    model::role::Role,
    models::{LoginReqDto, PinLoginReq, TokenPair, TokenType, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

const USER_AUTH_COLUMNS: &str =
    "id, username, password, pin_hash, role_id, full_name, is_active_employee";

pub(crate) async fn fetch_auth_user_by_username(
    username: &str,
    pool: &MySqlPool,
) -> Result<Option<UserSql>, sqlx::Error> {
    sqlx::query_as::<_, UserSql>(&format!(
        "SELECT {USER_AUTH_COLUMNS} FROM users WHERE username = ?"
    ))
    .bind(username.trim())
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_auth_user_by_id(
    user_id: u64,
    pool: &MySqlPool,
) -> Result<Option<UserSql>, sqlx::Error> {
    sqlx::query_as::<_, UserSql>(&format!("SELECT {USER_AUTH_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }))
}

fn inactive_account() -> HttpResponse {
    HttpResponse::Forbidden().json(json!({ "message": "Account is inactive" }))
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and stores the refresh token's jti.
pub(crate) async fn issue_tokens(
    user: &UserSql,
    pool: &MySqlPool,
    config: &Config,
) -> actix_web::Result<TokenPair> {
    let role = Role::from_id(user.role_id).ok_or_else(|| {
        error!(user_id = user.id, role_id = user.role_id, "User has unknown role");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let subject = TokenSubject {
        user_id: user.id,
        username: user.username.clone(),
        role: user.role_id,
        full_name: user.full_name.clone(),
    };

    let token_error = |e: jsonwebtoken::errors::Error| {
        error!(error = %e, "Failed to sign token");
        ErrorInternalServerError("Internal Server Error")
    };

    debug!("Generating access token");
    let access_token =
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
            .map_err(token_error)?;

    debug!("Generating refresh token");
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to store refresh token");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        role,
        full_name: user.full_name.clone(),
    })
}

/// Non-fatal: a failed stamp never blocks a sign-in.
pub(crate) async fn touch_last_login(user_id: u64, pool: &MySqlPool) {
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = UTC_TIMESTAMP() WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }
}

async fn sign_in(user: &UserSql, pool: &MySqlPool, config: &Config) -> actix_web::Result<HttpResponse> {
    let tokens = issue_tokens(user, pool, config).await?;
    touch_last_login(user.id, pool).await;
    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Username + password sign-in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Username and password are required"
        })));
    }

    let db_user = match fetch_auth_user_by_username(&user.username, pool.get_ref()).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return Ok(invalid_credentials());
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Ok(invalid_credentials());
    }

    if !db_user.is_active_employee {
        info!(user_id = db_user.id, "Refused login for inactive account");
        return Ok(inactive_account());
    }

    sign_in(&db_user, pool.get_ref(), &config).await
}

async fn pin_sign_in(
    payload: &PinLoginReq,
    pool: &MySqlPool,
    config: &Config,
    admin_only: bool,
) -> actix_web::Result<HttpResponse> {
    if payload.username.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": "Username is required" })));
    }
    if let Err(e) = validate_pin(&payload.pin) {
        return Ok(HttpResponse::BadRequest().json(json!({ "message": e.to_string() })));
    }

    let db_user = match fetch_auth_user_by_username(&payload.username, pool).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return Ok(invalid_credentials());
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    let Some(pin_hash) = db_user.pin_hash.as_deref() else {
        info!(user_id = db_user.id, "Invalid credentials: no PIN set");
        return Ok(invalid_credentials());
    };

    if let Err(e) = verify_password(&payload.pin, pin_hash) {
        info!(error = %e, "Invalid credentials: PIN mismatch");
        return Ok(invalid_credentials());
    }

    // Same answer as a wrong PIN so the admin door does not confirm a valid one.
    if admin_only && Role::from_id(db_user.role_id) != Some(Role::Admin) {
        info!(user_id = db_user.id, "Refused admin PIN login for non-admin");
        return Ok(invalid_credentials());
    }

    if !db_user.is_active_employee {
        info!(user_id = db_user.id, "Refused login for inactive account");
        return Ok(inactive_account());
    }

    sign_in(&db_user, pool, config).await
}

/// Collaborator PIN sign-in (admins allowed too)
#[utoipa::path(
    post,
    path = "/auth/pin-login",
    request_body = PinLoginReq,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "PIN must be exactly 4 digits"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account is inactive")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_pin_login", skip(pool, config, payload), fields(username = %payload.username))]
pub async fn pin_login(
    payload: web::Json<PinLoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    pin_sign_in(&payload, pool.get_ref(), &config, false).await
}

/// Admin-only PIN sign-in
#[utoipa::path(
    post,
    path = "/auth/admin/pin-login",
    request_body = PinLoginReq,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "PIN must be exactly 4 digits"),
        (status = 401, description = "Invalid credentials or not an admin")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_admin_pin_login", skip(pool, config, payload), fields(username = %payload.username))]
pub async fn admin_pin_login(
    payload: web::Json<PinLoginReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    pin_sign_in(&payload, pool.get_ref(), &config, true).await
}

/// Rotates a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[instrument(name = "auth_refresh", skip(req, pool, config))]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let Some(token) = bearer(&req) else {
        return Ok(HttpResponse::Unauthorized().json(json!({ "message": "No token" })));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return Ok(HttpResponse::Unauthorized().finish()),
    };

    if claims.token_type != TokenType::Refresh {
        return Ok(HttpResponse::Unauthorized().finish());
    }

    // Conditional revoke: a jti can be exchanged exactly once.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > UTC_TIMESTAMP()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to revoke refresh token");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if revoked.rows_affected() == 0 {
        info!(jti = %claims.jti, "Refresh token unknown or already used");
        return Ok(HttpResponse::Unauthorized().finish());
    }

    // Re-read the user so role or name changes take effect on rotation.
    let user = match fetch_auth_user_by_id(claims.user_id, pool.get_ref()).await {
        Ok(Some(u)) if u.is_active_employee => u,
        Ok(_) => return Ok(HttpResponse::Unauthorized().finish()),
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return Err(ErrorInternalServerError("Internal Server Error"));
        }
    };

    let tokens = issue_tokens(&user, pool.get_ref(), &config).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes a refresh token; always 204
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}
