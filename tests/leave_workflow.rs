use actix_web::{http::StatusCode, test};
use leave_desk::model::{profile::Gender, role::Role};
use leave_desk::store::BalanceStore;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use sqlx::MySqlPool;

#[macro_use]
mod common;

use common::TestContext;

fn five_day_annual(ctx: &TestContext) -> Value {
    json!({
        "leave_type_id": ctx.types.annual.id,
        "start_date": "2026-11-02",
        "end_date": "2026-11-06",
        "reason": "Family visit"
    })
}

fn remaining_for(balances: &Value, leave_type_id: u64) -> i64 {
    balances
        .as_array()
        .unwrap()
        .iter()
        .find(|b| b["leave_type_id"] == leave_type_id)
        .and_then(|b| b["remaining_days"].as_i64())
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
async fn full_chain_debits_the_balance_once(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let manager = ctx.account("brian", Gender::Male, Role::LineManager, Some("Finance")).await;
    let coo = ctx.account("carol", Gender::Female, Role::Coo, None).await;
    let ceo = ctx.account("david", Gender::Male, Role::Ceo, None).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "Pending");
    assert_eq!(created["approval_level"], "Line Manager");
    let leave_id = created["id"].as_u64().unwrap();

    // the department's line manager sees it in their queue
    let resp = test::call_service(
        &app,
        common::get("/api/approvals", &ctx.access_token(&manager)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let queue: Value = test::read_body_json(resp).await;
    assert_eq!(queue.as_array().unwrap().len(), 1);

    let uri = format!("/api/leave/{leave_id}/approve");
    for (approver, level_after) in [(&manager, "COO"), (&coo, "CEO"), (&ceo, "Completed")] {
        let resp = test::call_service(
            &app,
            common::put(&uri, &ctx.access_token(approver)).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["approval_level"], level_after);
    }

    // a late duplicate of the final approval is refused and debits nothing
    let resp = test::call_service(
        &app,
        common::put(&uri, &ctx.access_token(&ceo)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    assert_eq!(ctx.days_taken(staff.user.id, ctx.types.annual.id).await, Some(5));

    let resp = test::call_service(
        &app,
        common::get("/api/leave/balances", &ctx.access_token(&staff)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let balances: Value = test::read_body_json(resp).await;
    assert_eq!(remaining_for(&balances, ctx.types.annual.id), 16);

    let resp = test::call_service(
        &app,
        common::get(&format!("/api/leave/{leave_id}"), &ctx.access_token(&staff)).to_request(),
    )
    .await;
    let detail: Value = test::read_body_json(resp).await;
    assert_eq!(detail["request"]["status"], "Approved");
    assert!(detail["request"]["line_manager_approval_date"].is_string());
    assert!(detail["request"]["coo_approval_date"].is_string());
    assert!(detail["request"]["ceo_approval_date"].is_string());

    // the approval letter goes out as html
    assert!(ctx.outbox.sent().iter().any(|m| m.to == "amina@example.com" && m.is_html));
}

#[sqlx::test(migrations = "./migrations")]
async fn request_over_balance_is_refused(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(json!({
                "leave_type_id": ctx.types.annual.id,
                "start_date": "2026-11-01",
                "end_date": "2026-11-25",
                "reason": "Long trip"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "You only have 21 days remaining for Annual leave.");

    assert_eq!(ctx.leave_request_count().await, 0);
    let balance = ctx
        .store()
        .balance(staff.user.id, ctx.types.annual.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.remaining_days, 21);
}

#[sqlx::test(migrations = "./migrations")]
async fn staff_without_department_cannot_apply(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, None).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["error"],
        "You must be assigned to a Department before applying. Please contact Admin."
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn ceo_request_completes_on_submission(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let ceo = ctx.account("david", Gender::Male, Role::Ceo, None).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&ceo))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "Approved");
    assert_eq!(created["approval_level"], "Completed");
    assert!(created["ceo_approval_date"].is_string());

    assert_eq!(ctx.days_taken(ceo.user.id, ctx.types.annual.id).await, Some(5));
}

#[sqlx::test(migrations = "./migrations")]
async fn approval_at_the_wrong_level_conflicts(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let coo = ctx.account("carol", Gender::Female, Role::Coo, None).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let leave_id = created["id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        common::put(&format!("/api/leave/{leave_id}/approve"), &ctx.access_token(&coo))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "This request is awaiting Line Manager approval, not COO.");
}

#[sqlx::test(migrations = "./migrations")]
async fn rejection_keeps_the_level_and_notifies_the_applicant(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let manager = ctx.account("brian", Gender::Male, Role::LineManager, Some("Finance")).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    let created: Value = test::read_body_json(resp).await;
    let leave_id = created["id"].as_u64().unwrap();

    let resp = test::call_service(
        &app,
        common::put(&format!("/api/leave/{leave_id}/reject"), &ctx.access_token(&manager))
            .set_json(json!({"rejection_reason": "Quarter close"}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "Rejected");
    assert_eq!(body["approval_level"], "Line Manager");
    assert_eq!(body["rejection_reason"], "Quarter close");

    let resp = test::call_service(
        &app,
        common::get("/api/notifications", &ctx.access_token(&staff)).to_request(),
    )
    .await;
    let notifications: Value = test::read_body_json(resp).await;
    let messages: Vec<&str> = notifications["unread"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|n| n["message"].as_str())
        .collect();
    assert!(messages.contains(
        &"Your leave request has been rejected by Line Manager. Reason: Quarter close"
    ));

    assert_eq!(ctx.days_taken(staff.user.id, ctx.types.annual.id).await, Some(0));
}

#[sqlx::test(migrations = "./migrations")]
async fn staff_have_no_approval_queue(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;

    let resp = test::call_service(
        &app,
        common::get("/api/approvals", &ctx.access_token(&staff)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn gender_restricted_type_is_refused(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("brian", Gender::Male, Role::Staff, Some("Finance")).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(json!({
                "leave_type_id": ctx.types.maternity.id,
                "start_date": "2026-11-02",
                "end_date": "2026-11-06",
                "reason": "Family"
            }))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.leave_request_count().await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn allowance_repair_is_idempotent(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let admin = ctx.account("root", Gender::Female, Role::Admin, None).await;
    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let token = ctx.access_token(&admin);

    // a type added after registration leaves both accounts without rows
    let resp = test::call_service(
        &app,
        common::post("/api/leave-types", &token)
            .set_json(json!({"name": "Study", "default_days": 5}))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(
        &app,
        common::post("/api/admin/fix-allowances", &token).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fixed"], 4);
    assert_eq!(body["message"], "Fixed 4 missing leave allowance/tracker records.");

    let resp = test::call_service(
        &app,
        common::post("/api/admin/fix-allowances", &token).to_request(),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["fixed"], 0);

    // Annual, Sick, Maternity and Study
    assert_eq!(ctx.allowance_rows(staff.user.id).await, 4);
    assert_eq!(ctx.tracker_rows(staff.user.id).await, 4);
}

#[sqlx::test(migrations = "./migrations")]
async fn records_are_paginated_for_reviewers_only(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let coo = ctx.account("carol", Gender::Female, Role::Coo, None).await;

    for day in ["2026-11-02", "2026-11-09", "2026-11-16"] {
        let resp = test::call_service(
            &app,
            common::post("/api/leave", &ctx.access_token(&staff))
                .set_json(json!({
                    "leave_type_id": ctx.types.sick.id,
                    "start_date": day,
                    "end_date": day,
                    "reason": "Clinic"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = test::call_service(
        &app,
        common::get("/api/leave/records?page=2&per_page=2", &ctx.access_token(&coo)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // a page far past the end is empty rather than an overflow
    let resp = test::call_service(
        &app,
        common::get(
            "/api/leave/records?page=18446744073709551615&per_page=100",
            &ctx.access_token(&coo),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 18446744073709551615u64);
    assert!(body["data"].as_array().unwrap().is_empty());

    let resp = test::call_service(
        &app,
        common::get("/api/leave/records", &ctx.access_token(&staff)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn line_manager_routing_stays_in_the_department(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    // created first so a department-blind lookup would pick them
    let elsewhere = ctx.account("olga", Gender::Female, Role::LineManager, Some("Operations")).await;
    let manager = ctx.account("brian", Gender::Male, Role::LineManager, Some("Finance")).await;
    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;

    let resp = test::call_service(
        &app,
        common::post("/api/leave", &ctx.access_token(&staff))
            .set_json(five_day_annual(&ctx))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    for (approver, expected) in [(&elsewhere, 0), (&manager, 1)] {
        let token = ctx.access_token(approver);

        let resp = test::call_service(&app, common::get("/api/notifications", &token).to_request()).await;
        let notifications: Value = test::read_body_json(resp).await;
        assert_eq!(notifications["unread"].as_array().unwrap().len(), expected);

        let resp = test::call_service(&app, common::get("/api/approvals", &token).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let queue: Value = test::read_body_json(resp).await;
        assert_eq!(queue.as_array().unwrap().len(), expected);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn late_approvals_can_overdraw_the_balance(pool: MySqlPool) {
    let ctx = TestContext::new(pool).await;
    let app = test_app!(ctx);

    let staff = ctx.account("amina", Gender::Female, Role::Staff, Some("Finance")).await;
    let manager = ctx.account("brian", Gender::Male, Role::LineManager, Some("Finance")).await;
    let coo = ctx.account("carol", Gender::Female, Role::Coo, None).await;
    let ceo = ctx.account("david", Gender::Male, Role::Ceo, None).await;

    // each fits the 21 days on its own; only approval debits
    let mut leave_ids = Vec::new();
    for (start, end) in [("2026-11-02", "2026-11-16"), ("2026-12-01", "2026-12-15")] {
        let resp = test::call_service(
            &app,
            common::post("/api/leave", &ctx.access_token(&staff))
                .set_json(json!({
                    "leave_type_id": ctx.types.annual.id,
                    "start_date": start,
                    "end_date": end,
                    "reason": "Travel"
                }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        leave_ids.push(created["id"].as_u64().unwrap());
    }

    for leave_id in &leave_ids {
        let uri = format!("/api/leave/{leave_id}/approve");
        for approver in [&manager, &coo, &ceo] {
            let resp = test::call_service(
                &app,
                common::put(&uri, &ctx.access_token(approver)).to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
    }

    assert_eq!(ctx.days_taken(staff.user.id, ctx.types.annual.id).await, Some(30));

    let resp = test::call_service(
        &app,
        common::get("/api/leave/balances", &ctx.access_token(&staff)).to_request(),
    )
    .await;
    let balances: Value = test::read_body_json(resp).await;
    assert_eq!(remaining_for(&balances, ctx.types.annual.id), -9);
}
