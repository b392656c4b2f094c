use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{
    FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data,
};
use futures::future::{Ready, ready};
use jsonwebtoken::{DecodingKey, Validation, decode};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
    pub full_name: Option<String>,
}

impl AuthUser {
    /// Builds the caller from access-token claims. Refresh tokens are refused.
    pub fn from_claims(claims: Claims) -> Result<Self, &'static str> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;
        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            full_name: claims.full_name,
        })
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin only"))
        }
    }

    pub fn require_collaborator(&self) -> actix_web::Result<()> {
        if self.role.can_clock() {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Collaborator only"))
        }
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::from_claims(data.claims).map_err(ErrorUnauthorized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: u8, token_type: TokenType) -> Claims {
        Claims {
            user_id: 1,
            sub: "ana".into(),
            role,
            exp: usize::MAX,
            jti: "x".into(),
            token_type,
            full_name: None,
        }
    }

    #[test]
    fn refresh_claims_are_refused() {
        assert!(AuthUser::from_claims(claims(2, TokenType::Refresh)).is_err());
        assert!(AuthUser::from_claims(claims(9, TokenType::Access)).is_err());
    }

    #[test]
    fn role_guards() {
        let admin = AuthUser::from_claims(claims(1, TokenType::Access)).unwrap();
        let collaborator = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();

        assert!(admin.require_admin().is_ok());
        assert!(admin.require_collaborator().is_ok());
        assert!(collaborator.require_collaborator().is_ok());

        let err = collaborator.require_admin().unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::FORBIDDEN
        );
    }

    #[actix_web::test]
    async fn extractor_reuses_the_middleware_user() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let stored = AuthUser::from_claims(claims(2, TokenType::Access)).unwrap();
        req.extensions_mut().insert(stored);

        let user = AuthUser::extract(&req).await.unwrap();
        assert_eq!(user.user_id, 1);
        assert_eq!(user.role, Role::Collaborator);
    }

    #[actix_web::test]
    async fn extractor_without_token_is_unauthorized() {
        let req = actix_web::test::TestRequest::default().to_http_request();
        let err = AuthUser::extract(&req).await.unwrap_err();
        assert_eq!(
            err.as_response_error().status_code(),
            actix_web::http::StatusCode::UNAUTHORIZED
        );
    }
}
