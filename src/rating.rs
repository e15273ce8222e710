use crate::aggregator::{fetch_company_reports, list_owner_companies, ReportAggregator};
use crate::config::EngineConfig;
use crate::directory::{ActivityFieldCatalog, CompanyDirectory, FinancialReportSource};
use crate::error::{EngineError, Result};
use crate::schema::{Company, Period, ReportSet};
use chrono::NaiveDate;
use log::{debug, info, warn};
use uuid::Uuid;

/// Combines the industry weight of the owner's most profitable company with the
/// owner's overall profit margin.
///
/// `rating = (cost / max_cost + profit / revenue) / 2`
///
/// Zero revenue or a non-positive `max_cost` has no meaningful rating and is
/// reported as [`EngineError::InvalidState`].
pub fn combine_rating(cost: f64, max_cost: f64, profit: f64, revenue: f64) -> Result<f64> {
    if max_cost <= 0.0 {
        return Err(EngineError::InvalidState(format!(
            "maximum activity field cost must be positive (got {})",
            max_cost
        )));
    }
    if revenue == 0.0 {
        return Err(EngineError::InvalidState(
            "cannot compute profit margin of zero revenue".to_string(),
        ));
    }

    Ok((cost / max_cost + profit / revenue) / 2.0)
}

pub struct RatingCalculator<'a> {
    companies: &'a dyn CompanyDirectory,
    reports: &'a dyn FinancialReportSource,
    activity_fields: &'a dyn ActivityFieldCatalog,
    config: &'a EngineConfig,
}

impl<'a> RatingCalculator<'a> {
    pub fn new(
        companies: &'a dyn CompanyDirectory,
        reports: &'a dyn FinancialReportSource,
        activity_fields: &'a dyn ActivityFieldCatalog,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            companies,
            reports,
            activity_fields,
            config,
        }
    }

    /// Rates `owner_id` on the calendar year preceding `today`. An owner with no
    /// company that made a profit that year is rated 0.
    pub async fn calculate_user_rating_at(&self, owner_id: Uuid, today: NaiveDate) -> Result<f64> {
        let period = Period::previous_calendar_year(today);
        info!("Calculating rating for owner {} over {}", owner_id, period);

        let companies = list_owner_companies(self.companies, owner_id).await?;
        let Some((best, best_profit)) = self.most_profitable_company(companies, &period).await?
        else {
            info!(
                "Owner {} has no profitable company in {}, rating 0",
                owner_id, period
            );
            return Ok(0.0);
        };
        debug!(
            "Most profitable company of owner {} is {} with profit {:.2}",
            owner_id, best.id, best_profit
        );

        let report = ReportAggregator::new(self.companies, self.reports, self.config)
            .get_user_financial_report(owner_id, &period)
            .await?;

        let cost = self
            .activity_fields
            .cost_for_company(best.id)
            .await
            .map_err(|e| {
                warn!("Fetching activity field cost of company {} failed: {}", best.id, e);
                EngineError::upstream("activity field cost of company", best.id, e)
            })?;
        let max_cost = self.activity_fields.max_cost().await.map_err(|e| {
            warn!("Fetching max activity field cost failed: {}", e);
            EngineError::upstream("max activity field cost", "all", e)
        })?;

        let (profit, revenue) = (report.profit(), report.revenue());
        debug!(
            "Rating inputs for owner {}: cost {}, max cost {}, profit {:.2}, revenue {:.2}",
            owner_id, cost, max_cost, profit, revenue
        );

        let rating = combine_rating(cost, max_cost, profit, revenue).inspect_err(|e| {
            warn!("Rating of owner {} is undefined: {}", owner_id, e);
        })?;
        info!("Owner {} rated {:.4}", owner_id, rating);

        Ok(rating)
    }

    /// Company with the strictly greatest positive profit over `period`, first
    /// one wins on ties.
    pub async fn most_profitable_company(
        &self,
        companies: Vec<Company>,
        period: &Period,
    ) -> Result<Option<(Company, f64)>> {
        let mut best: Option<(Company, f64)> = None;

        for company in companies {
            let mut report = ReportSet::new(*period);
            report.reports = fetch_company_reports(self.reports, company.id, period).await?;
            let profit = report.profit();

            let max_profit = best.as_ref().map_or(0.0, |(_, p)| *p);
            if profit > max_profit {
                best = Some((company, profit));
            }
        }

        Ok(best)
    }
}
