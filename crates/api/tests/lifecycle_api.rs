//! HTTP tests for reschedule, cancel, fulfill, comments and the
//! no-delete rule.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Utc};
use common::{
    admin, assert_error, body_json, book, client_token, monday_at, seed_client, seed_salon, send,
};
use serde_json::{json, Value};
use slotbook_core::types::EntityId;
use sqlx::PgPool;
use uuid::Uuid;

fn uri(id: &Value, suffix: &str) -> String {
    format!("/api/v1/appointments/{}{suffix}", id.as_str().unwrap())
}

fn instant(value: &Value) -> DateTime<Utc> {
    value.as_str().unwrap().parse().unwrap()
}

async fn post_as(pool: &PgPool, company: EntityId, token: &str, path: &str, body: Option<Value>) -> axum::response::Response {
    send(
        common::build_test_app(pool.clone()),
        Method::POST,
        path,
        Some(token),
        Some(company),
        body,
    )
    .await
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_moves_interval_and_records_history(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool.clone()),
        Method::PATCH,
        &uri(&created["id"], ""),
        salon.company.id,
        Some(json!({ "start_time": monday_at(11, 0).to_rfc3339() })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await["data"].clone();
    assert_eq!(instant(&updated["start_time"]), monday_at(11, 0));
    assert_eq!(instant(&updated["end_time"]), monday_at(12, 0));

    let history = updated["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["change"]["field"], "start_time");
    assert_eq!(history[1]["change"]["field"], "end_time");

    let response = admin(
        common::build_test_app(pool),
        Method::GET,
        &uri(&created["id"], ""),
        salon.company.id,
        None,
    )
    .await;
    let fetched = body_json(response).await["data"].clone();
    assert_eq!(fetched["history"], updated["history"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_may_overlap_its_own_old_slot(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::PATCH,
        &uri(&created["id"], ""),
        salon.company.id,
        Some(json!({ "start_time": monday_at(9, 30).to_rfc3339() })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reschedule_into_a_full_slot_is_rejected(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let bia = seed_client(&pool, "bia@example.com").await;
    book(&pool, &salon, ana.id, monday_at(9, 0)).await;
    let second = book(&pool, &salon, bia.id, monday_at(11, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::PATCH,
        &uri(&second["id"], ""),
        salon.company.id,
        Some(json!({ "start_time": monday_at(9, 30).to_rfc3339() })),
    )
    .await;
    assert_error(response, StatusCode::CONFLICT, "CAPACITY_ERROR", "EMPLOYEE_CAPACITY_EXCEEDED").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn identity_fields_are_immutable(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::PATCH,
        &uri(&created["id"], ""),
        salon.company.id,
        Some(json!({ "employee_id": Uuid::new_v4() })),
    )
    .await;
    assert_error(response, StatusCode::CONFLICT, "STATE_ERROR", "IMMUTABLE_FIELD").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn confirmation_without_schedule_change_is_recorded(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::PATCH,
        &uri(&created["id"], ""),
        salon.company.id,
        Some(json!({ "is_confirmed_by_client": true })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await["data"].clone();
    assert_eq!(updated["is_confirmed_by_client"], true);
    assert_eq!(updated["history"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Cancel / fulfill
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_cancel_frees_the_slot(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let bia = seed_client(&pool, "bia@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = post_as(
        &pool,
        salon.company.id,
        &client_token(ana.id),
        &uri(&created["id"], "/cancel"),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await["data"].clone();
    assert_eq!(cancelled["is_cancelled"], true);
    assert_eq!(cancelled["is_cancelled_by_client"], true);
    assert!(cancelled["cancel_time"].is_string());

    book(&pool, &salon, bia.id, monday_at(9, 0)).await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelling_twice_is_a_state_error(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;
    let path = uri(&created["id"], "/cancel");

    let first = admin(common::build_test_app(pool.clone()), Method::POST, &path, salon.company.id, None).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = admin(common::build_test_app(pool), Method::POST, &path, salon.company.id, None).await;
    assert_error(second, StatusCode::CONFLICT, "STATE_ERROR", "ALREADY_CANCELLED").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn fulfilled_appointment_can_not_be_cancelled(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool.clone()),
        Method::POST,
        &uri(&created["id"], "/fulfill"),
        salon.company.id,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_fulfilled"], true);

    let response = admin(
        common::build_test_app(pool),
        Method::POST,
        &uri(&created["id"], "/cancel"),
        salon.company.id,
        None,
    )
    .await;
    assert_error(response, StatusCode::CONFLICT, "STATE_ERROR", "ALREADY_FULFILLED").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_may_not_cancel_someone_elses_appointment(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let bia = seed_client(&pool, "bia@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = post_as(
        &pool,
        salon.company.id,
        &client_token(bia.id),
        &uri(&created["id"], "/cancel"),
        None,
    )
    .await;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN", "FORBIDDEN").await;
}

// ---------------------------------------------------------------------------
// Comments and deletion
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn staff_comment_is_appended(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::POST,
        &uri(&created["id"], "/comments"),
        salon.company.id,
        Some(json!({ "body": "Prefers the window seat" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let comments = body_json(response).await["data"]["comments"].clone();
    assert_eq!(comments.as_array().unwrap().len(), 1);
    assert_eq!(comments[0]["body"], "Prefers the window seat");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn clients_can_not_comment(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = post_as(
        &pool,
        salon.company.id,
        &client_token(ana.id),
        &uri(&created["id"], "/comments"),
        Some(json!({ "body": "hello" })),
    )
    .await;
    assert_error(response, StatusCode::FORBIDDEN, "FORBIDDEN", "FORBIDDEN").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn empty_comment_is_rejected(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool),
        Method::POST,
        &uri(&created["id"], "/comments"),
        salon.company.id,
        Some(json!({ "body": "" })),
    )
    .await;
    assert_error(response, StatusCode::BAD_REQUEST, "VALIDATION_ERROR", "INVALID_INPUT").await;
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_is_always_refused(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let ana = seed_client(&pool, "ana@example.com").await;
    let created = book(&pool, &salon, ana.id, monday_at(9, 0)).await;

    let response = admin(
        common::build_test_app(pool.clone()),
        Method::DELETE,
        &uri(&created["id"], ""),
        salon.company.id,
        None,
    )
    .await;
    assert_error(response, StatusCode::CONFLICT, "STATE_ERROR", "DELETION_FORBIDDEN").await;

    let response = admin(
        common::build_test_app(pool),
        Method::GET,
        &uri(&created["id"], ""),
        salon.company.id,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_appointment_returns_404(pool: PgPool) {
    let salon = seed_salon(&pool, "Acme", 1).await;
    let response = admin(
        common::build_test_app(pool),
        Method::GET,
        &format!("/api/v1/appointments/{}", Uuid::new_v4()),
        salon.company.id,
        None,
    )
    .await;
    assert_error(response, StatusCode::NOT_FOUND, "NOT_FOUND", "NOT_FOUND").await;
}
