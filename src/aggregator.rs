use crate::config::EngineConfig;
use crate::directory::{CompanyDirectory, FinancialReportSource};
use crate::error::{EngineError, Result};
use crate::reconcile::YearWindowReconciler;
use crate::schema::{Company, Period, QuarterlyReport, ReportSet};
use crate::tax::{TaxAccumulator, TaxCalculator};
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use uuid::Uuid;

/// Owner-level financial report over a period: every company's raw reports,
/// with tax accrued on each complete company-year.
pub struct ReportAggregator<'a> {
    companies: &'a dyn CompanyDirectory,
    reports: &'a dyn FinancialReportSource,
    config: &'a EngineConfig,
}

// Result of fetching and taxing a single company
struct CompanySlice {
    reports: Vec<QuarterlyReport>,
    taxes: TaxAccumulator,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(
        companies: &'a dyn CompanyDirectory,
        reports: &'a dyn FinancialReportSource,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            companies,
            reports,
            config,
        }
    }

    pub async fn get_user_financial_report(
        &self,
        owner_id: Uuid,
        period: &Period,
    ) -> Result<ReportSet> {
        period.validate()?;
        info!("Building financial report for owner {} over {}", owner_id, period);

        let companies = list_owner_companies(self.companies, owner_id).await?;
        debug!("Owner {} has {} companies", owner_id, companies.len());

        let reconciler = YearWindowReconciler::new(self.config.reconcile_strategy);
        let calculator = TaxCalculator::new(&self.config.tax_schedule);

        // Futures are built up front so the stream owns them and borrows nothing
        // per item. `buffered` yields in input order, so reports stay grouped by
        // company in listing order and the first failing company wins.
        let fetches: Vec<_> = companies
            .iter()
            .map(|company| self.company_slice(company.id, period, &reconciler, &calculator))
            .collect();
        let slices: Vec<CompanySlice> = stream::iter(fetches)
            .buffered(self.config.max_concurrent_fetches.max(1))
            .try_collect()
            .await?;

        let mut report = ReportSet::new(*period);
        let mut taxes = TaxAccumulator::default();
        for slice in slices {
            report.reports.extend(slice.reports);
            taxes.merge(slice.taxes);
        }

        report.taxes_accrued = taxes.taxes;
        report.tax_load_percent = taxes.tax_load_percent(self.config.tax_load_epsilon);
        report.yearly_taxes = taxes.yearly;

        info!(
            "Owner {} over {}: {} reports, revenue {:.2}, taxes {:.2}, tax load {:.2}%",
            owner_id,
            period,
            report.reports.len(),
            report.revenue(),
            report.taxes_accrued,
            report.tax_load_percent
        );

        Ok(report)
    }

    async fn company_slice(
        &self,
        company_id: Uuid,
        period: &Period,
        reconciler: &YearWindowReconciler,
        calculator: &TaxCalculator<'_>,
    ) -> Result<CompanySlice> {
        let reports = fetch_company_reports(self.reports, company_id, period).await?;

        let mut windows = reconciler.reconcile(&reports, period);
        let taxes = calculator.tax_windows(windows.complete_windows_mut());
        debug!(
            "Company {}: {} reports, complete years {:?}, taxes {:.2}",
            company_id,
            reports.len(),
            windows.complete_years(),
            taxes.taxes
        );

        Ok(CompanySlice { reports, taxes })
    }
}

pub(crate) async fn list_owner_companies(
    directory: &dyn CompanyDirectory,
    owner_id: Uuid,
) -> Result<Vec<Company>> {
    directory
        .list_companies_by_owner(owner_id)
        .await
        .map_err(|e| {
            warn!("Listing companies of owner {} failed: {}", owner_id, e);
            EngineError::upstream("companies of owner", owner_id, e)
        })
}

pub(crate) async fn fetch_company_reports(
    source: &dyn FinancialReportSource,
    company_id: Uuid,
    period: &Period,
) -> Result<Vec<QuarterlyReport>> {
    source
        .company_reports_for_period(company_id, period)
        .await
        .map_err(|e| {
            warn!(
                "Fetching reports of company {} for {} failed: {}",
                company_id, period, e
            );
            EngineError::upstream("reports of company", company_id, e)
        })
}
