#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use actix_web::{test::TestRequest, web};
use chrono::{DateTime, Utc};
use leave_desk::auth::jwt::{generate_access_token, generate_refresh_token};
use leave_desk::config::Config;
use leave_desk::model::{leave_type::LeaveType, profile::Gender, role::Role, user::Account};
use leave_desk::notify::mailer::{Mailer, OutgoingMail};
use leave_desk::state::AppState;
use leave_desk::store::{AccountStore, CatalogStore, NewAccount, mysql::MySqlStore};
use leave_desk::workflow::reconcile::applicable;
use sqlx::MySqlPool;

pub const JWT_SECRET: &str = "test-jwt-secret-key-that-is-long-enough";

/// Builds the full app around a [`TestContext`]. Every request must carry a
/// peer address because the rate limiters key on it.
macro_rules! test_app {
    ($ctx:expr) => {{
        let config = $ctx.config.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($ctx.state.clone())
                .app_data($ctx.config.clone())
                .configure(move |cfg| {
                    leave_desk::routes::configure::<leave_desk::store::mysql::MySqlStore>(
                        cfg, &config,
                    )
                }),
        )
        .await
    }};
}

/// Records every relayed email instead of sending it.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<OutgoingMail>>,
}

impl Outbox {
    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the most recent reset link.
    pub fn last_reset_token(&self) -> Option<String> {
        self.sent().iter().rev().find_map(|mail| {
            let (_, rest) = mail.body.split_once("/reset-password/")?;
            rest.split_whitespace().next().map(str::to_string)
        })
    }
}

impl Mailer for Outbox {
    fn deliver(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

/// The catalog rows inserted by the initial migration.
pub struct SeededTypes {
    pub annual: LeaveType,
    pub sick: LeaveType,
    pub maternity: LeaveType,
    pub paternity: LeaveType,
}

pub struct TestContext {
    pub pool: MySqlPool,
    pub state: web::Data<AppState<MySqlStore>>,
    pub config: web::Data<Config>,
    pub outbox: Arc<Outbox>,
    pub types: SeededTypes,
}

impl TestContext {
    /// `pool` comes from `#[sqlx::test]`, already migrated.
    pub async fn new(pool: MySqlPool) -> Self {
        let store = MySqlStore::new(pool.clone());
        let seeded = store.list_leave_types().await.unwrap();
        let by_name = |name: &str| seeded.iter().find(|t| t.name == name).cloned().unwrap();
        let types = SeededTypes {
            annual: by_name("Annual"),
            sick: by_name("Sick"),
            maternity: by_name("Maternity"),
            paternity: by_name("Paternity"),
        };

        let config = Config::for_tests(JWT_SECRET);
        let outbox = Arc::new(Outbox::default());
        let state = web::Data::new(AppState::new(store, config.clone(), outbox.clone()));

        TestContext {
            pool,
            state,
            config: web::Data::new(config),
            outbox,
            types,
        }
    }

    pub fn store(&self) -> &MySqlStore {
        &self.state.store
    }

    pub async fn allowance_rows(&self, user_id: u64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_leave_allowances WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn tracker_rows(&self, user_id: u64) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_leave_trackers WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn days_taken(&self, user_id: u64, leave_type_id: u64) -> Option<i32> {
        sqlx::query_scalar("SELECT days_taken FROM user_leave_trackers WHERE user_id = ? AND leave_type_id = ?")
            .bind(user_id)
            .bind(leave_type_id)
            .fetch_optional(&self.pool)
            .await
            .unwrap()
    }

    pub async fn leave_request_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM leave_requests")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Moves a reset token's expiry, for exercising the expiry path.
    pub async fn expire_reset_token(&self, token: &str, at: DateTime<Utc>) {
        sqlx::query("UPDATE auth_tokens SET expires_at = ? WHERE token = ?")
            .bind(at)
            .bind(token)
            .execute(&self.pool)
            .await
            .unwrap();
    }

    /// Creates an account directly in the store, with allowances for the
    /// applicable types, then assigns the role and department.
    pub async fn account(
        &self,
        username: &str,
        gender: Gender,
        role: Role,
        department: Option<&str>,
    ) -> Account {
        let active = self.state.catalog.active(self.store()).await.unwrap();
        let types: Vec<_> = applicable(&active, gender).cloned().collect();

        let account = self
            .store()
            .create_account(
                NewAccount {
                    username: username.to_string(),
                    first_name: capitalize(username),
                    last_name: "Tester".to_string(),
                    email: format!("{username}@example.com"),
                    password_hash: "not-a-real-hash".to_string(),
                    id_number: format!("ID-{username}"),
                    phone_number: "0700000000".to_string(),
                    gender,
                },
                &types,
            )
            .await
            .unwrap();

        self.store()
            .update_employment(account.user.id, role, department.map(str::to_string))
            .await
            .unwrap()
    }

    pub fn access_token(&self, account: &Account) -> String {
        generate_access_token(
            account.user.id,
            account.user.username.clone(),
            JWT_SECRET,
            self.config.access_token_ttl,
        )
        .unwrap()
    }

    /// A signed refresh token that was never stored.
    pub fn refresh_token(&self, account: &Account) -> String {
        generate_refresh_token(
            account.user.id,
            account.user.username.clone(),
            JWT_SECRET,
            self.config.refresh_token_ttl,
        )
        .unwrap()
        .0
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn peer() -> SocketAddr {
    "127.0.0.1:12345".parse().unwrap()
}

pub fn get(uri: &str, token: &str) -> TestRequest {
    TestRequest::get()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn post(uri: &str, token: &str) -> TestRequest {
    TestRequest::post()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

pub fn put(uri: &str, token: &str) -> TestRequest {
    TestRequest::put()
        .uri(uri)
        .peer_addr(peer())
        .insert_header(("Authorization", format!("Bearer {token}")))
}

/// Unauthenticated request against the public auth routes.
pub fn public_post(uri: &str) -> TestRequest {
    TestRequest::post().uri(uri).peer_addr(peer())
}
