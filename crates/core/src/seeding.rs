//! Capability token for seed-time record creation.
//!
//! Catalog rows (companies, branches, employees, services, clients) are not
//! created by the scheduler. The provisioning functions that do create them
//! demand a `&SeedingContext`, which only seed tooling constructs.

/// Proof that the caller is running seed or provisioning tooling.
///
/// Not `Clone` or `Default`: a context has to be opened explicitly.
#[derive(Debug)]
pub struct SeedingContext {
    reason: String,
}

impl SeedingContext {
    pub fn begin(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_reason_for_logging() {
        let ctx = SeedingContext::begin("demo data");
        assert_eq!(ctx.reason(), "demo data");
    }
}
