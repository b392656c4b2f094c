use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

/// Identity embedded into every token.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: u64,
    pub username: String,
    pub role: u8,
    pub full_name: Option<String>,
}

fn now() -> usize {
    chrono::Utc::now().timestamp().max(0) as usize
}

fn generate(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        full_name: subject.full_name.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(subject: &TokenSubject, secret: &str, ttl: usize) -> Result<String, Error> {
    generate(subject, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    subject: &TokenSubject,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    generate(subject, TokenType::Refresh, secret, ttl)
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 7,
            username: "ana".into(),
            role: 2,
            full_name: Some("Ana Silva".into()),
        }
    }

    #[test]
    fn access_token_round_trip() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.user_id, 7);
        assert_eq!(claims.sub, "ana");
        assert_eq!(claims.role, 2);
        assert_eq!(claims.full_name.as_deref(), Some("Ana Silva"));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_token_is_typed_and_unique() {
        let (token, claims) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        let (_, other) = generate_refresh_token(&subject(), "secret", 60).unwrap();
        assert_eq!(verify_token(&token, "secret").unwrap().token_type, TokenType::Refresh);
        assert_ne!(claims.jti, other.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_access_token(&subject(), "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = generate(&subject(), TokenType::Access, "secret", 0).unwrap().1;
        claims.exp = 1;
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("secret".as_bytes()),
        )
        .unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
