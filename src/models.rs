use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::profile::Gender;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "amina")]
    pub username: String,
    #[schema(example = "Amina")]
    pub first_name: String,
    #[schema(example = "Otieno")]
    pub last_name: String,
    #[schema(example = "amina@example.com")]
    pub email: String,
    #[schema(example = "12345678")]
    pub id_number: String,
    #[schema(example = "0700000000")]
    pub phone_number: String,
    pub gender: Gender,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PasswordResetReq {
    #[schema(example = "amina@example.com")]
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PasswordResetConfirm {
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
