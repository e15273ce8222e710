//! Read-only contracts for the services that own companies, reports and
//! activity fields, plus an in-memory implementation.

use crate::error::BoxError;
use crate::schema::{ActivityField, Company, Period, QuarterlyReport};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

pub type UpstreamResult<T> = std::result::Result<T, BoxError>;

#[async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Every company owned by `owner_id`, unpaginated, in a stable order.
    async fn list_companies_by_owner(&self, owner_id: Uuid) -> UpstreamResult<Vec<Company>>;
}

#[async_trait]
pub trait FinancialReportSource: Send + Sync {
    /// Reports of one company inside `period`, sorted by year then quarter.
    async fn company_reports_for_period(
        &self,
        company_id: Uuid,
        period: &Period,
    ) -> UpstreamResult<Vec<QuarterlyReport>>;
}

#[async_trait]
pub trait ActivityFieldCatalog: Send + Sync {
    /// Cost weight of the activity field the company operates in.
    async fn cost_for_company(&self, company_id: Uuid) -> UpstreamResult<f64>;

    /// Largest cost weight across all activity fields.
    async fn max_cost(&self) -> UpstreamResult<f64>;
}

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("company {0} not found")]
    CompanyNotFound(Uuid),

    #[error("activity field {0} not found")]
    ActivityFieldNotFound(Uuid),

    #[error("no activity fields registered")]
    NoActivityFields,
}

/// Keeps companies, activity fields and reports in memory. Company order is
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    companies: Vec<Company>,
    activity_fields: HashMap<Uuid, ActivityField>,
    reports: Vec<QuarterlyReport>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_activity_field(&mut self, field: ActivityField) -> &mut Self {
        self.activity_fields.insert(field.id, field);
        self
    }

    pub fn add_company(&mut self, company: Company) -> &mut Self {
        self.companies.push(company);
        self
    }

    pub fn add_report(&mut self, report: QuarterlyReport) -> &mut Self {
        self.reports.push(report);
        self
    }

    pub fn add_reports(&mut self, reports: impl IntoIterator<Item = QuarterlyReport>) -> &mut Self {
        self.reports.extend(reports);
        self
    }

    fn company(&self, company_id: Uuid) -> UpstreamResult<&Company> {
        self.companies
            .iter()
            .find(|c| c.id == company_id)
            .ok_or_else(|| LookupError::CompanyNotFound(company_id).into())
    }
}

#[async_trait]
impl CompanyDirectory for InMemoryDirectory {
    async fn list_companies_by_owner(&self, owner_id: Uuid) -> UpstreamResult<Vec<Company>> {
        Ok(self
            .companies
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FinancialReportSource for InMemoryDirectory {
    async fn company_reports_for_period(
        &self,
        company_id: Uuid,
        period: &Period,
    ) -> UpstreamResult<Vec<QuarterlyReport>> {
        let mut reports: Vec<QuarterlyReport> = self
            .reports
            .iter()
            .filter(|r| r.company_id == company_id && period.contains(r.year, r.quarter))
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.year, r.quarter));
        Ok(reports)
    }
}

#[async_trait]
impl ActivityFieldCatalog for InMemoryDirectory {
    async fn cost_for_company(&self, company_id: Uuid) -> UpstreamResult<f64> {
        let company = self.company(company_id)?;
        self.activity_fields
            .get(&company.activity_field_id)
            .map(|f| f.cost)
            .ok_or_else(|| LookupError::ActivityFieldNotFound(company.activity_field_id).into())
    }

    async fn max_cost(&self) -> UpstreamResult<f64> {
        self.activity_fields
            .values()
            .map(|f| f.cost)
            .reduce(f64::max)
            .ok_or_else(|| LookupError::NoActivityFields.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn company(owner_id: Uuid, activity_field_id: Uuid, name: &str) -> Company {
        Company {
            id: Uuid::new_v4(),
            owner_id,
            activity_field_id,
            name: name.to_string(),
            city: "Moscow".to_string(),
        }
    }

    #[tokio::test]
    async fn test_reports_filtered_and_sorted() {
        let owner = Uuid::new_v4();
        let field = Uuid::new_v4();
        let acme = company(owner, field, "Acme");
        let other = company(owner, field, "Other");

        let mut directory = InMemoryDirectory::new();
        directory
            .add_company(acme.clone())
            .add_company(other.clone())
            .add_report(QuarterlyReport::new(acme.id, 2023, 3, 1.0, 0.0))
            .add_report(QuarterlyReport::new(acme.id, 2023, 1, 1.0, 0.0))
            .add_report(QuarterlyReport::new(acme.id, 2022, 4, 1.0, 0.0))
            .add_report(QuarterlyReport::new(acme.id, 2024, 1, 1.0, 0.0))
            .add_report(QuarterlyReport::new(other.id, 2023, 2, 1.0, 0.0));

        let reports = directory
            .company_reports_for_period(acme.id, &Period::full_year(2023))
            .await
            .unwrap();
        let quarters: Vec<_> = reports.iter().map(|r| (r.year, r.quarter)).collect();
        assert_eq!(quarters, vec![(2023, 1), (2023, 3)]);

        let owned = directory.list_companies_by_owner(owner).await.unwrap();
        assert_eq!(owned, vec![acme, other]);
        assert!(directory
            .list_companies_by_owner(Uuid::new_v4())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_activity_field_costs() {
        let owner = Uuid::new_v4();
        let retail = ActivityField {
            id: Uuid::new_v4(),
            name: "Retail".to_string(),
            description: "Shops".to_string(),
            cost: 0.4,
        };
        let it = ActivityField {
            id: Uuid::new_v4(),
            name: "IT".to_string(),
            description: "Software".to_string(),
            cost: 1.6,
        };
        let shop = company(owner, retail.id, "Shop");
        let orphan = company(owner, Uuid::new_v4(), "Orphan");

        let mut directory = InMemoryDirectory::new();
        assert!(directory.max_cost().await.is_err());

        directory
            .add_activity_field(retail)
            .add_activity_field(it)
            .add_company(shop.clone())
            .add_company(orphan.clone());

        assert_eq!(directory.cost_for_company(shop.id).await.unwrap(), 0.4);
        assert_eq!(directory.max_cost().await.unwrap(), 1.6);
        assert!(directory.cost_for_company(orphan.id).await.is_err());
        assert!(directory.cost_for_company(Uuid::new_v4()).await.is_err());
    }
}
