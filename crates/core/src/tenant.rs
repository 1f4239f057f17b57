//! Explicit tenant scoping for data access.
//!
//! Each company owns a Postgres schema named `company_<uuid without dashes>`.
//! Repositories never change the connection `search_path`; they build
//! schema-qualified table names from the [`TenantContext`] they are handed.

use crate::types::EntityId;

/// Schema holding cross-tenant tables (companies, clients, mirrors).
pub const PUBLIC_SCHEMA: &str = "public";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TenantContext {
    company_id: EntityId,
}

impl TenantContext {
    pub fn new(company_id: EntityId) -> Self {
        Self { company_id }
    }

    pub fn company_id(&self) -> EntityId {
        self.company_id
    }

    /// Schema name for this tenant. Lowercase hex only, safe to inline in SQL.
    pub fn schema(&self) -> String {
        format!("company_{}", self.company_id.simple())
    }

    /// Schema-qualified table name, e.g. `company_ab12...ef.appointments`.
    pub fn table(&self, name: &str) -> String {
        format!("{}.{name}", self.schema())
    }
}

/// Schema-qualified name of a shared table.
pub fn public_table(name: &str) -> String {
    format!("{PUBLIC_SCHEMA}.{name}")
}
