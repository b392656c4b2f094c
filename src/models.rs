use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::role::Role;

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "s3cret")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PinLoginReq {
    #[schema(example = "ana")]
    pub username: String,
    #[schema(example = "1234")]
    pub pin: String,
}

#[derive(Deserialize, ToSchema)]
pub struct FaceDescriptorReq {
    /// Base64 of 128 little-endian f32 values (512 bytes)
    pub descriptor: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[schema(value_type = String, example = "Collaborator")]
    pub role: Role,
    pub full_name: Option<String>,
}

/// Columns needed to authenticate a user by any method.
#[derive(FromRow)]
pub struct UserSql {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub pin_hash: Option<String>,
    pub role_id: u8,
    pub full_name: Option<String>,
    pub is_active_employee: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
