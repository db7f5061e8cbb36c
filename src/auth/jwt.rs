use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

fn issue(
    user_id: u64,
    username: String,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id,
        sub: username,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn generate_access_token(
    user_id: u64,
    username: String,
    secret: &str,
    ttl: usize,
) -> Result<String, Error> {
    issue(user_id, username, TokenType::Access, secret, ttl).map(|(token, _)| token)
}

pub fn generate_refresh_token(
    user_id: u64,
    username: String,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    issue(user_id, username, TokenType::Refresh, secret, ttl)
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

    #[test]
    fn tokens_carry_their_type() {
        let access = generate_access_token(3, "amina".into(), "secret", 60).unwrap();
        let (refresh, claims) = generate_refresh_token(3, "amina".into(), "secret", 60).unwrap();

        assert_eq!(verify_token(&access, "secret").unwrap().token_type, TokenType::Access);
        let decoded = verify_token(&refresh, "secret").unwrap();
        assert_eq!(decoded.token_type, TokenType::Refresh);
        assert_eq!(decoded.jti, claims.jti);
        assert!(verify_token(&access, "other-secret").is_err());
    }
}
