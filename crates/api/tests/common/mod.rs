//! Shared fixtures and request helpers for the HTTP integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::America::Sao_Paulo;
use http_body_util::BodyExt;
use serde_json::Value;
use slotbook_api::auth::gate::RoleGate;
use slotbook_api::auth::jwt::{generate_access_token, JwtConfig, TokenGrant};
use slotbook_api::config::{BookingPolicy, ServerConfig};
use slotbook_api::middleware::tenant::COMPANY_HEADER;
use slotbook_api::router::build_app_router;
use slotbook_api::state::AppState;
use slotbook_core::schedule::{next_occurrence, WorkRange};
use slotbook_core::seeding::SeedingContext;
use slotbook_core::tenant::TenantContext;
use slotbook_core::timezone::today_in;
use slotbook_core::types::{EntityId, Timestamp};
use slotbook_db::models::catalog::{
    Branch, CreateBranch, CreateEmployee, CreateService, Employee, Service,
};
use slotbook_db::models::company::{Client, Company, CreateClient, CreateCompany};
use slotbook_db::repositories::{ProvisioningRepo, WorkRangeRepo};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const ZONE: &str = "America/Sao_Paulo";

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        secret: "test-secret-for-integration-tests".to_string(),
        access_token_expiry_mins: 15,
    }
}

/// Build a test `ServerConfig` with safe defaults and no background job.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: test_jwt(),
        booking: BookingPolicy::default(),
        mirror_reconcile_interval_secs: 0,
    }
}

/// Build the full application router, the same stack `main.rs` serves.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        gate: Arc::new(RoleGate),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn token(grant: TokenGrant) -> String {
    generate_access_token(&grant, &test_jwt()).unwrap()
}

pub fn admin_token() -> String {
    token(TokenGrant {
        user_id: Uuid::new_v4(),
        role: "admin".to_string(),
        company_id: None,
        client_id: None,
    })
}

pub fn employee_token(company_id: EntityId) -> String {
    token(TokenGrant {
        user_id: Uuid::new_v4(),
        role: "employee".to_string(),
        company_id: Some(company_id),
        client_id: None,
    })
}

pub fn client_token(client_id: EntityId) -> String {
    token(TokenGrant {
        user_id: Uuid::new_v4(),
        role: "client".to_string(),
        company_id: None,
        client_id: Some(client_id),
    })
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Send one request through the router.
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    company_id: Option<EntityId>,
    body: Option<Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    if let Some(company_id) = company_id {
        builder = builder.header(COMPANY_HEADER, company_id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None, None).await
}

/// Authenticated request as an admin of `company_id`.
pub async fn admin(
    app: Router,
    method: Method,
    uri: &str,
    company_id: EntityId,
    body: Option<Value>,
) -> Response<Body> {
    send(app, method, uri, Some(&admin_token()), Some(company_id), body).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and the `code`/`reason` of an error response.
pub async fn assert_error(response: Response<Body>, status: StatusCode, code: &str, reason: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code, "unexpected body {json}");
    assert_eq!(json["reason"], reason, "unexpected body {json}");
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// The next Monday in Sao Paulo, never today.
pub fn next_monday() -> NaiveDate {
    next_occurrence(Weekday::Mon, today_in(Sao_Paulo, Utc::now()) + Duration::days(1))
}

/// Day offset of [`next_monday`] from today in Sao Paulo.
pub fn next_monday_offset() -> i64 {
    (next_monday() - today_in(Sao_Paulo, Utc::now())).num_days()
}

/// Next Monday at `hour:minute` Sao Paulo time.
pub fn monday_at(hour: u32, minute: u32) -> Timestamp {
    Sao_Paulo
        .from_local_datetime(&next_monday().and_hms_opt(hour, minute, 0).unwrap())
        .single()
        .unwrap()
        .with_timezone(&Utc)
}

// ---------------------------------------------------------------------------
// Data
// ---------------------------------------------------------------------------

/// A company with one Sao Paulo branch, one employee working Mondays
/// 09:00-17:00 there and a 60-minute service.
pub struct Salon {
    pub company: Company,
    pub tenant: TenantContext,
    pub branch: Branch,
    pub employee: Employee,
    pub service: Service,
}

pub async fn seed_client(pool: &PgPool, email: &str) -> Client {
    let seeding = SeedingContext::begin("api test");
    let mut conn = pool.acquire().await.unwrap();
    ProvisioningRepo::create_client(
        &mut conn,
        &seeding,
        &CreateClient {
            name: "Ana".to_string(),
            email: email.to_string(),
            time_zone: Some(ZONE.to_string()),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_salon(pool: &PgPool, name: &str, employee_density: i32) -> Salon {
    let seeding = SeedingContext::begin("api test");
    let mut conn = pool.acquire().await.unwrap();

    let company = ProvisioningRepo::create_company(
        &mut conn,
        &seeding,
        &CreateCompany {
            name: name.to_string(),
        },
    )
    .await
    .unwrap();
    let tenant = TenantContext::new(company.id);

    let branch = ProvisioningRepo::create_branch(
        &mut conn,
        &seeding,
        &tenant,
        &CreateBranch {
            name: "Paulista".to_string(),
            time_zone: ZONE.to_string(),
            total_service_density: None,
        },
    )
    .await
    .unwrap();
    let employee = ProvisioningRepo::create_employee(
        &mut conn,
        &seeding,
        &tenant,
        &CreateEmployee {
            name: "Marina".to_string(),
            surname: "Souza".to_string(),
            time_zone: ZONE.to_string(),
            slot_granularity: 30,
            total_service_density: employee_density,
        },
    )
    .await
    .unwrap();
    let service = ProvisioningRepo::create_service(
        &mut conn,
        &seeding,
        &tenant,
        &CreateService {
            name: "Coloring".to_string(),
            duration_minutes: 60,
        },
    )
    .await
    .unwrap();

    ProvisioningRepo::link_branch_service(&mut conn, &seeding, &tenant, branch.id, service.id)
        .await
        .unwrap();
    ProvisioningRepo::link_employee_service(&mut conn, &seeding, &tenant, employee.id, service.id)
        .await
        .unwrap();
    ProvisioningRepo::link_employee_branch(&mut conn, &seeding, &tenant, employee.id, branch.id)
        .await
        .unwrap();

    let range = WorkRange {
        id: Uuid::new_v4(),
        employee_id: employee.id,
        branch_id: branch.id,
        weekday: Weekday::Mon,
        start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        time_zone: Sao_Paulo,
        service_ids: vec![service.id],
    };
    WorkRangeRepo::create(&mut conn, &tenant, &range).await.unwrap();

    Salon {
        company,
        tenant,
        branch,
        employee,
        service,
    }
}

/// Create body for `client` at `start`.
pub fn booking_body(salon: &Salon, client_id: EntityId, start: Timestamp) -> Value {
    serde_json::json!({
        "company_id": salon.company.id,
        "branch_id": salon.branch.id,
        "employee_id": salon.employee.id,
        "service_id": salon.service.id,
        "client_id": client_id,
        "start_time": start.to_rfc3339(),
        "time_zone": ZONE,
    })
}

/// Book through the API as an admin and return the created appointment.
pub async fn book(pool: &PgPool, salon: &Salon, client_id: EntityId, start: Timestamp) -> Value {
    let response = admin(
        build_test_app(pool.clone()),
        Method::POST,
        "/api/v1/appointments",
        salon.company.id,
        Some(booking_body(salon, client_id, start)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"].clone()
}
