use crate::aggregator::ReportAggregator;
use crate::config::EngineConfig;
use crate::directory::{ActivityFieldCatalog, CompanyDirectory, FinancialReportSource};
use crate::error::Result;
use crate::rating::RatingCalculator;
use crate::schema::{FinancialSummary, Period, ReportSet};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use uuid::Uuid;

/// Entry point for callers: holds the read collaborators and configuration and
/// exposes the owner-level operations. Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct FinancialEngine {
    companies: Arc<dyn CompanyDirectory>,
    reports: Arc<dyn FinancialReportSource>,
    activity_fields: Arc<dyn ActivityFieldCatalog>,
    config: Arc<EngineConfig>,
}

impl FinancialEngine {
    pub fn new(
        companies: Arc<dyn CompanyDirectory>,
        reports: Arc<dyn FinancialReportSource>,
        activity_fields: Arc<dyn ActivityFieldCatalog>,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            companies,
            reports,
            activity_fields,
            config: Arc::new(config),
        })
    }

    /// Builds an engine over one backend that serves all three read contracts.
    pub fn from_directory<D>(directory: D, config: EngineConfig) -> Result<Self>
    where
        D: CompanyDirectory + FinancialReportSource + ActivityFieldCatalog + 'static,
    {
        let directory = Arc::new(directory);
        Self::new(directory.clone(), directory.clone(), directory, config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn aggregator(&self) -> ReportAggregator<'_> {
        ReportAggregator::new(self.companies.as_ref(), self.reports.as_ref(), &self.config)
    }

    fn rating_calculator(&self) -> RatingCalculator<'_> {
        RatingCalculator::new(
            self.companies.as_ref(),
            self.reports.as_ref(),
            self.activity_fields.as_ref(),
            &self.config,
        )
    }

    pub async fn get_user_financial_report(
        &self,
        owner_id: Uuid,
        period: &Period,
    ) -> Result<ReportSet> {
        self.aggregator()
            .get_user_financial_report(owner_id, period)
            .await
    }

    /// Rating over the calendar year before the local current date.
    pub async fn calculate_user_rating(&self, owner_id: Uuid) -> Result<f64> {
        let today = Local::now().date_naive();
        self.calculate_user_rating_at(owner_id, today).await
    }

    pub async fn calculate_user_rating_at(&self, owner_id: Uuid, today: NaiveDate) -> Result<f64> {
        self.rating_calculator()
            .calculate_user_rating_at(owner_id, today)
            .await
    }

    /// Revenue, costs, profit and taxes of the calendar year before `today`.
    pub async fn previous_year_financials(
        &self,
        owner_id: Uuid,
        today: NaiveDate,
    ) -> Result<FinancialSummary> {
        let period = Period::previous_calendar_year(today);
        let report = self.get_user_financial_report(owner_id, &period).await?;
        Ok(FinancialSummary::from(&report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::InMemoryDirectory;
    use crate::error::EngineError;

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_operation_futures_are_send() {
        let engine =
            FinancialEngine::from_directory(InMemoryDirectory::new(), EngineConfig::default())
                .unwrap();
        let owner = Uuid::new_v4();
        let period = Period::full_year(2023);
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();

        assert_send(engine.get_user_financial_report(owner, &period));
        assert_send(engine.calculate_user_rating(owner));
        assert_send(engine.calculate_user_rating_at(owner, today));
        assert_send(engine.previous_year_financials(owner, today));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            max_concurrent_fetches: 0,
            ..EngineConfig::default()
        };
        let result = FinancialEngine::from_directory(InMemoryDirectory::new(), config);
        assert!(matches!(result, Err(EngineError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_owner_without_companies() {
        let engine =
            FinancialEngine::from_directory(InMemoryDirectory::new(), EngineConfig::default())
                .unwrap();
        let owner = Uuid::new_v4();

        let report = engine
            .get_user_financial_report(owner, &Period::full_year(2023))
            .await
            .unwrap();
        assert!(report.reports.is_empty());
        assert_eq!(report.taxes_accrued, 0.0);

        assert_eq!(engine.calculate_user_rating(owner).await.unwrap(), 0.0);
    }
}
