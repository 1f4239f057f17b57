//! Demo data seeder.
//!
//! Creates one company with a Sao Paulo branch, an employee working weekdays
//! 09:00-17:00, a 30-minute service and a client, then prints their ids.
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run --bin slotbook-seed
//! SEED_COMPANY_NAME="Studio Norte" cargo run --bin slotbook-seed
//! ```

use anyhow::{Context, Result};
use chrono::{NaiveTime, Weekday};
use slotbook_core::schedule::WorkRange;
use slotbook_core::seeding::SeedingContext;
use slotbook_core::tenant::TenantContext;
use slotbook_core::timezone::parse_time_zone;
use slotbook_db::models::catalog::{CreateBranch, CreateEmployee, CreateService};
use slotbook_db::models::company::{CreateClient, CreateCompany};
use slotbook_db::repositories::{ProvisioningRepo, WorkRangeRepo};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const DEMO_ZONE: &str = "America/Sao_Paulo";
const WORK_DAYS: [Weekday; 5] = [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotbook_db=info,slotbook_seed=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let company_name = std::env::var("SEED_COMPANY_NAME").unwrap_or_else(|_| "Demo Salon".into());

    let pool = slotbook_db::create_pool(&database_url).await?;
    slotbook_db::run_migrations(&pool).await?;

    let seeding = SeedingContext::begin("demo seed");
    let zone = parse_time_zone(DEMO_ZONE)?;
    let mut tx = pool.begin().await?;

    let company = ProvisioningRepo::create_company(
        &mut tx,
        &seeding,
        &CreateCompany { name: company_name },
    )
    .await?;
    let tenant = TenantContext::new(company.id);

    let branch = ProvisioningRepo::create_branch(
        &mut tx,
        &seeding,
        &tenant,
        &CreateBranch {
            name: "Paulista".into(),
            time_zone: DEMO_ZONE.into(),
            total_service_density: None,
        },
    )
    .await?;
    let employee = ProvisioningRepo::create_employee(
        &mut tx,
        &seeding,
        &tenant,
        &CreateEmployee {
            name: "Marina".into(),
            surname: "Souza".into(),
            time_zone: DEMO_ZONE.into(),
            slot_granularity: 30,
            total_service_density: 1,
        },
    )
    .await?;
    let service = ProvisioningRepo::create_service(
        &mut tx,
        &seeding,
        &tenant,
        &CreateService {
            name: "Haircut".into(),
            duration_minutes: 30,
        },
    )
    .await?;

    ProvisioningRepo::link_branch_service(&mut tx, &seeding, &tenant, branch.id, service.id).await?;
    ProvisioningRepo::link_employee_service(&mut tx, &seeding, &tenant, employee.id, service.id).await?;
    ProvisioningRepo::link_employee_branch(&mut tx, &seeding, &tenant, employee.id, branch.id).await?;

    let nine = NaiveTime::from_hms_opt(9, 0, 0).context("invalid start time")?;
    let five = NaiveTime::from_hms_opt(17, 0, 0).context("invalid end time")?;
    for weekday in WORK_DAYS {
        let range = WorkRange {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            branch_id: branch.id,
            weekday,
            start: nine,
            end: five,
            time_zone: zone,
            service_ids: vec![service.id],
        };
        WorkRangeRepo::create(&mut tx, &tenant, &range).await?;
    }

    let client = ProvisioningRepo::create_client(
        &mut tx,
        &seeding,
        &CreateClient {
            name: "Ana Costa".into(),
            email: format!("ana+{}@example.com", company.id.simple()),
            time_zone: Some(DEMO_ZONE.into()),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        company_id = %company.id,
        branch_id = %branch.id,
        employee_id = %employee.id,
        service_id = %service.id,
        client_id = %client.id,
        "Demo data seeded",
    );
    Ok(())
}
