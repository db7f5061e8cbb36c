use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};

pub const RESET_TOKEN_LEN: usize = 64;

/// Single-use password reset credential.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub token: String,
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl PasswordResetToken {
    pub fn issue(user_id: u64, now: DateTime<Utc>) -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(RESET_TOKEN_LEN)
            .map(char::from)
            .collect();

        Self {
            token,
            user_id,
            created_at: now,
            expires_at: now + Duration::hours(1),
            is_used: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired(now)
    }
}

/// Stored refresh token id, revoked on rotation or logout.
#[derive(Debug, Clone)]
pub struct RefreshToken {
    pub jti: String,
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}
