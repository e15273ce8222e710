use crate::error::{EngineError, Result};
use crate::utils::{
    is_valid_quarter, parse_period_string, previous_calendar_year, quarters_completed,
    FIRST_QUARTER, LAST_QUARTER,
};
use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Inclusive quarter range `[start_year.start_quarter, end_year.end_quarter]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, JsonSchema)]
pub struct Period {
    #[schemars(description = "Calendar year of the first quarter in the range")]
    pub start_year: i32,

    #[schemars(description = "First quarter of the range (1-4)")]
    pub start_quarter: u32,

    #[schemars(description = "Calendar year of the last quarter in the range")]
    pub end_year: i32,

    #[schemars(description = "Last quarter of the range (1-4), inclusive")]
    pub end_quarter: u32,
}

impl Period {
    pub fn new(start_year: i32, start_quarter: u32, end_year: i32, end_quarter: u32) -> Self {
        Self {
            start_year,
            start_quarter,
            end_year,
            end_quarter,
        }
    }

    pub fn full_year(year: i32) -> Self {
        Self::new(year, FIRST_QUARTER, year, LAST_QUARTER)
    }

    /// Q1..Q4 of the calendar year before `today`.
    pub fn previous_calendar_year(today: NaiveDate) -> Self {
        Self::full_year(previous_calendar_year(today))
    }

    pub fn is_valid(&self) -> bool {
        is_valid_quarter(self.start_quarter)
            && is_valid_quarter(self.end_quarter)
            && (self.start_year, self.start_quarter) <= (self.end_year, self.end_quarter)
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(EngineError::InvalidPeriod(*self))
        }
    }

    /// Quarter span the period covers within `year`, clamped at both edges.
    /// `None` when the year lies outside the period.
    pub fn quarter_span(&self, year: i32) -> Option<(u32, u32)> {
        if year < self.start_year || year > self.end_year {
            return None;
        }

        let start = if year == self.start_year {
            self.start_quarter
        } else {
            FIRST_QUARTER
        };
        let end = if year == self.end_year {
            self.end_quarter
        } else {
            LAST_QUARTER
        };

        (start <= end).then_some((start, end))
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    /// Every `(year, quarter)` in the period, ascending.
    pub fn quarters(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.years().flat_map(move |year| {
            self.quarter_span(year)
                .map(|(start, end)| start..=end)
                .into_iter()
                .flatten()
                .map(move |quarter| (year, quarter))
        })
    }

    pub fn contains(&self, year: i32, quarter: u32) -> bool {
        self.quarter_span(year)
            .is_some_and(|(start, end)| (start..=end).contains(&quarter))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-Q{}:{}-Q{}",
            self.start_year, self.start_quarter, self.end_year, self.end_quarter
        )
    }
}

impl FromStr for Period {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let ((start_year, start_quarter), (end_year, end_quarter)) = parse_period_string(s)?;
        let period = Self::new(start_year, start_quarter, end_year, end_quarter);
        period.validate()?;
        Ok(period)
    }
}

/// One company's financial disclosure for a single (year, quarter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct QuarterlyReport {
    pub id: Uuid,
    pub company_id: Uuid,

    #[schemars(description = "Revenue for the quarter in money units, never negative")]
    pub revenue: f64,

    #[schemars(description = "Costs for the quarter in money units, never negative")]
    pub costs: f64,

    pub year: i32,

    #[schemars(description = "Quarter of the year (1-4)")]
    pub quarter: u32,
}

impl QuarterlyReport {
    pub fn new(company_id: Uuid, year: i32, quarter: u32, revenue: f64, costs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            revenue,
            costs,
            year,
            quarter,
        }
    }

    pub fn profit(&self) -> f64 {
        self.revenue - self.costs
    }

    /// Checks a disclosure before it is accepted: amounts are non-negative, the
    /// quarter exists and has already ended as of `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.revenue < 0.0 {
            return Err(EngineError::InvalidReport {
                field: "revenue",
                details: format!("revenue cannot be negative (got {})", self.revenue),
            });
        }

        if self.costs < 0.0 {
            return Err(EngineError::InvalidReport {
                field: "costs",
                details: format!("costs cannot be negative (got {})", self.costs),
            });
        }

        if !is_valid_quarter(self.quarter) {
            return Err(EngineError::InvalidReport {
                field: "quarter",
                details: format!("quarter must be between 1 and 4 (got {})", self.quarter),
            });
        }

        if self.year > today.year() {
            return Err(EngineError::InvalidReport {
                field: "year",
                details: format!(
                    "year {} is after the current year {}",
                    self.year,
                    today.year()
                ),
            });
        }

        if self.year == today.year() && self.quarter > quarters_completed(today) {
            return Err(EngineError::InvalidReport {
                field: "quarter",
                details: format!("{}-Q{} has not finished yet", self.year, self.quarter),
            });
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Company {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub activity_field_id: Uuid,
    pub name: String,
    pub city: String,
}

/// Industry an owner's company operates in. `cost` is the attractiveness weight
/// used when rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ActivityField {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cost: f64,
}

/// Tax computed for one complete company-year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct YearlyTax {
    pub company_id: Uuid,
    pub year: i32,
    pub revenue: f64,
    pub profit: f64,
    pub rate: f64,
    pub tax: f64,
}

/// Reports over a period together with the taxes accrued on their complete years.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ReportSet {
    pub period: Period,
    pub reports: Vec<QuarterlyReport>,
    pub taxes_accrued: f64,
    pub tax_load_percent: f64,
    #[serde(default)]
    pub yearly_taxes: Vec<YearlyTax>,
}

impl ReportSet {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            reports: Vec::new(),
            taxes_accrued: 0.0,
            tax_load_percent: 0.0,
            yearly_taxes: Vec::new(),
        }
    }

    pub fn revenue(&self) -> f64 {
        self.reports.iter().map(|r| r.revenue).sum()
    }

    pub fn costs(&self) -> f64 {
        self.reports.iter().map(|r| r.costs).sum()
    }

    pub fn profit(&self) -> f64 {
        self.revenue() - self.costs()
    }
}

/// Flattened view of a [`ReportSet`] as presented to entrepreneurs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub revenue: f64,
    pub costs: f64,
    pub profit: f64,
    pub taxes: f64,
    pub tax_load: f64,
}

impl From<&ReportSet> for FinancialSummary {
    fn from(set: &ReportSet) -> Self {
        Self {
            revenue: set.revenue(),
            costs: set.costs(),
            profit: set.profit(),
            taxes: set.taxes_accrued,
            tax_load: set.tax_load_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_validity() {
        assert!(Period::new(2023, 1, 2023, 4).is_valid());
        assert!(Period::new(2023, 3, 2023, 3).is_valid());
        assert!(Period::new(2022, 4, 2023, 1).is_valid());
        assert!(!Period::new(2023, 2, 2023, 1).is_valid());
        assert!(!Period::new(2024, 1, 2023, 4).is_valid());
        assert!(!Period::new(2023, 0, 2023, 4).is_valid());
        assert!(!Period::new(2023, 1, 2023, 5).is_valid());

        let err = Period::new(2024, 1, 2023, 4).validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidPeriod(_)));
    }

    #[test]
    fn test_quarter_span_clamping() {
        let period = Period::new(2021, 3, 2023, 2);
        assert_eq!(period.quarter_span(2020), None);
        assert_eq!(period.quarter_span(2021), Some((3, 4)));
        assert_eq!(period.quarter_span(2022), Some((1, 4)));
        assert_eq!(period.quarter_span(2023), Some((1, 2)));
        assert_eq!(period.quarter_span(2024), None);

        let single = Period::new(2023, 2, 2023, 3);
        assert_eq!(single.quarter_span(2023), Some((2, 3)));
    }

    #[test]
    fn test_quarters_iteration() {
        let period = Period::new(2022, 4, 2023, 2);
        let quarters: Vec<_> = period.quarters().collect();
        assert_eq!(quarters, vec![(2022, 4), (2023, 1), (2023, 2)]);
        assert!(period.contains(2023, 1));
        assert!(!period.contains(2023, 3));
        assert!(!period.contains(2022, 3));
    }

    #[test]
    fn test_period_parse_and_display() {
        let period: Period = "2022-Q3:2023-Q1".parse().unwrap();
        assert_eq!(period, Period::new(2022, 3, 2023, 1));
        assert_eq!(period.to_string(), "2022-Q3:2023-Q1");

        let inverted = "2023-Q2:2023-Q1".parse::<Period>();
        assert!(matches!(inverted, Err(EngineError::InvalidPeriod(_))));
    }

    #[test]
    fn test_previous_calendar_year_period() {
        let period = Period::previous_calendar_year(date(2024, 5, 17));
        assert_eq!(period, Period::new(2023, 1, 2023, 4));
    }

    #[test]
    fn test_report_validation() {
        let company = Uuid::new_v4();
        let today = date(2024, 5, 17);

        assert!(QuarterlyReport::new(company, 2023, 4, 10.0, 5.0)
            .validate(today)
            .is_ok());
        assert!(QuarterlyReport::new(company, 2024, 1, 10.0, 5.0)
            .validate(today)
            .is_ok());

        let cases = [
            (QuarterlyReport::new(company, 2023, 1, -1.0, 0.0), "revenue"),
            (QuarterlyReport::new(company, 2023, 1, 1.0, -0.5), "costs"),
            (QuarterlyReport::new(company, 2023, 5, 1.0, 0.0), "quarter"),
            (QuarterlyReport::new(company, 2025, 1, 1.0, 0.0), "year"),
            (QuarterlyReport::new(company, 2024, 2, 1.0, 0.0), "quarter"),
        ];

        for (report, expected_field) in cases {
            match report.validate(today) {
                Err(EngineError::InvalidReport { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected InvalidReport on {}, got {:?}", expected_field, other),
            }
        }
    }

    #[test]
    fn test_report_set_totals() {
        let company = Uuid::new_v4();
        let mut set = ReportSet::new(Period::full_year(2023));
        set.reports
            .push(QuarterlyReport::new(company, 2023, 1, 1_000.0, 300.0));
        set.reports
            .push(QuarterlyReport::new(company, 2023, 2, 500.0, 900.0));
        set.taxes_accrued = 12.0;
        set.tax_load_percent = 0.8;

        assert_eq!(set.revenue(), 1_500.0);
        assert_eq!(set.costs(), 1_200.0);
        assert_eq!(set.profit(), 300.0);

        let summary = FinancialSummary::from(&set);
        assert_eq!(summary.profit, 300.0);
        assert_eq!(summary.taxes, 12.0);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("taxLoad"));
    }
}
