//! Shared fixtures for the repository integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveTime, TimeZone, Utc, Weekday};
use slotbook_core::booking::{BookingFacts, BookingRequest, PendingBooking, ValidatedBooking};
use slotbook_core::capacity::DensityUsage;
use slotbook_core::schedule::{next_occurrence, WorkRange};
use slotbook_core::seeding::SeedingContext;
use slotbook_core::tenant::TenantContext;
use slotbook_core::types::Timestamp;
use slotbook_db::models::catalog::{
    Branch, CreateBranch, CreateEmployee, CreateService, Employee, Service,
};
use slotbook_db::models::company::{Client, Company, CreateClient, CreateCompany};
use slotbook_db::repositories::ProvisioningRepo;
use sqlx::PgPool;
use uuid::Uuid;

/// One company with a UTC branch, an employee working Mondays 09:00-17:00
/// there, a 30-minute service and a client.
pub struct Seeded {
    pub company: Company,
    pub tenant: TenantContext,
    pub branch: Branch,
    pub employee: Employee,
    pub service: Service,
    pub client: Client,
    pub range: WorkRange,
}

pub async fn seed_company(pool: &PgPool, name: &str) -> Company {
    let seeding = SeedingContext::begin("db test");
    let mut conn = pool.acquire().await.unwrap();
    ProvisioningRepo::create_company(
        &mut conn,
        &seeding,
        &CreateCompany {
            name: name.to_string(),
        },
    )
    .await
    .unwrap()
}

pub async fn seed_client(pool: &PgPool, email: &str) -> Client {
    let seeding = SeedingContext::begin("db test");
    let mut conn = pool.acquire().await.unwrap();
    ProvisioningRepo::create_client(
        &mut conn,
        &seeding,
        &CreateClient {
            name: "Ana".to_string(),
            email: email.to_string(),
            time_zone: None,
        },
    )
    .await
    .unwrap()
}

pub async fn seed(pool: &PgPool, name: &str, client: Client) -> Seeded {
    let company = seed_company(pool, name).await;
    let tenant = TenantContext::new(company.id);
    let seeding = SeedingContext::begin("db test");
    let mut conn = pool.acquire().await.unwrap();

    let branch = ProvisioningRepo::create_branch(
        &mut conn,
        &seeding,
        &tenant,
        &CreateBranch {
            name: "Centro".to_string(),
            time_zone: "UTC".to_string(),
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
            name: "Bea".to_string(),
            surname: "Lima".to_string(),
            time_zone: "UTC".to_string(),
            slot_granularity: 30,
            total_service_density: 1,
        },
    )
    .await
    .unwrap();
    let service = ProvisioningRepo::create_service(
        &mut conn,
        &seeding,
        &tenant,
        &CreateService {
            name: "Haircut".to_string(),
            duration_minutes: 30,
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
        time_zone: chrono_tz::UTC,
        service_ids: vec![service.id],
    };

    Seeded {
        company,
        tenant,
        branch,
        employee,
        service,
        client,
        range,
    }
}

/// Next Monday (never today) at `hour:minute` UTC.
pub fn next_monday_at(hour: u32, minute: u32) -> Timestamp {
    let date = next_occurrence(Weekday::Mon, Utc::now().date_naive() + Duration::days(1));
    Utc.from_utc_datetime(&date.and_hms_opt(hour, minute, 0).unwrap())
}

/// Run the validator with facts that satisfy every rule.
pub fn validated(seeded: &Seeded, start: Timestamp) -> ValidatedBooking {
    let request = BookingRequest {
        company_id: Some(seeded.company.id),
        branch_id: Some(seeded.branch.id),
        employee_id: Some(seeded.employee.id),
        service_id: Some(seeded.service.id),
        client_id: Some(seeded.client.id),
        start_time: Some(start),
        time_zone: Some("UTC".to_string()),
    };
    let timed = PendingBooking::new(request, seeded.company.id, Utc::now())
        .unwrap()
        .with_service(Some(&seeded.service.profile()))
        .unwrap();
    let facts = BookingFacts {
        branch: Some(seeded.branch.profile().unwrap()),
        employee: Some(seeded.employee.profile().unwrap()),
        service_at_branch: true,
        employee_offers_service: true,
        employee_at_branch: true,
        work_ranges: vec![seeded.range.clone()],
        employee_usage: DensityUsage {
            overlapping: 0,
            total_density: 1,
            service_density: None,
        },
        branch_usage: DensityUsage {
            overlapping: 0,
            total_density: -1,
            service_density: None,
        },
        client_overlaps_same_tenant: 0,
        client_overlaps_cross_tenant: 0,
    };
    timed.validate(&facts).unwrap()
}
