use crate::error::{EngineError, Result};
use crate::reconcile::YearWindow;
use crate::schema::YearlyTax;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TAX_LOAD_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxBracket {
    #[schemars(
        description = "Exclusive upper bound on yearly profit for this bracket. Null marks the open-ended top bracket."
    )]
    pub below: Option<f64>,

    #[schemars(description = "Rate applied to the whole yearly profit, as a fraction (0.07 = 7%)")]
    pub rate: f64,
}

/// Progressive bracket table. The first bracket whose `below` exceeds the
/// profit applies; profit that is zero or negative lands in the lowest bracket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxSchedule {
    pub brackets: Vec<TaxBracket>,
}

impl Default for TaxSchedule {
    fn default() -> Self {
        Self {
            brackets: vec![
                TaxBracket {
                    below: Some(10_000_000.0),
                    rate: 0.04,
                },
                TaxBracket {
                    below: Some(50_000_000.0),
                    rate: 0.07,
                },
                TaxBracket {
                    below: Some(150_000_000.0),
                    rate: 0.13,
                },
                TaxBracket {
                    below: Some(500_000_000.0),
                    rate: 0.20,
                },
                TaxBracket {
                    below: None,
                    rate: 0.30,
                },
            ],
        }
    }
}

impl TaxSchedule {
    pub fn validate(&self) -> Result<()> {
        let Some(last) = self.brackets.last() else {
            return Err(EngineError::InvalidConfig(
                "Tax schedule must contain at least one bracket".to_string(),
            ));
        };

        if last.below.is_some() {
            return Err(EngineError::InvalidConfig(
                "Last tax bracket must be open-ended (below = null)".to_string(),
            ));
        }

        let mut previous: Option<f64> = None;
        for (idx, bracket) in self.brackets.iter().enumerate() {
            if !(0.0..=1.0).contains(&bracket.rate) {
                return Err(EngineError::InvalidConfig(format!(
                    "Tax bracket #{} has rate {} outside [0, 1]",
                    idx, bracket.rate
                )));
            }

            if idx + 1 < self.brackets.len() {
                let Some(below) = bracket.below else {
                    return Err(EngineError::InvalidConfig(format!(
                        "Tax bracket #{} is open-ended but is not the last bracket",
                        idx
                    )));
                };
                if previous.is_some_and(|p| below <= p) {
                    return Err(EngineError::InvalidConfig(format!(
                        "Tax bracket #{} threshold {} is not above the previous threshold",
                        idx, below
                    )));
                }
                previous = Some(below);
            }
        }

        Ok(())
    }

    pub fn rate_for(&self, profit: f64) -> f64 {
        self.brackets
            .iter()
            .find(|b| b.below.map_or(true, |limit| profit < limit))
            .map(|b| b.rate)
            .unwrap_or(0.0)
    }

    pub fn tax_for(&self, profit: f64) -> f64 {
        profit * self.rate_for(profit)
    }
}

/// Running totals over every taxed company-year of one aggregation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxAccumulator {
    pub taxes: f64,
    pub taxed_revenue: f64,
    pub yearly: Vec<YearlyTax>,
}

impl TaxAccumulator {
    pub fn merge(&mut self, other: TaxAccumulator) {
        self.taxes += other.taxes;
        self.taxed_revenue += other.taxed_revenue;
        self.yearly.extend(other.yearly);
    }

    /// Taxes as a percentage of taxed revenue; 0 when that revenue is within
    /// `epsilon` of zero.
    pub fn tax_load_percent(&self, epsilon: f64) -> f64 {
        if self.taxed_revenue.abs() >= epsilon {
            self.taxes / self.taxed_revenue * 100.0
        } else {
            0.0
        }
    }
}

pub struct TaxCalculator<'a> {
    schedule: &'a TaxSchedule,
}

impl<'a> TaxCalculator<'a> {
    pub fn new(schedule: &'a TaxSchedule) -> Self {
        Self { schedule }
    }

    /// Taxes a complete window, records the tax on it and returns the breakdown
    /// entry. Incomplete windows are left untouched.
    pub fn tax_window(&self, window: &mut YearWindow) -> Option<YearlyTax> {
        if !window.is_complete() {
            return None;
        }

        let profit = window.profit();
        let revenue = window.revenue();
        let rate = self.schedule.rate_for(profit);
        let tax = profit * rate;
        window.tax = Some(tax);

        let company_id = window.reports.first().map(|r| r.company_id)?;
        debug!(
            "Taxed company {} year {}: profit {:.2} at {:.0}% = {:.2}",
            company_id,
            window.year,
            profit,
            rate * 100.0,
            tax
        );

        Some(YearlyTax {
            company_id,
            year: window.year,
            revenue,
            profit,
            rate,
            tax,
        })
    }

    pub fn tax_windows<'w>(
        &self,
        windows: impl IntoIterator<Item = &'w mut YearWindow>,
    ) -> TaxAccumulator {
        let mut acc = TaxAccumulator::default();
        for window in windows {
            if let Some(entry) = self.tax_window(window) {
                acc.taxes += entry.tax;
                acc.taxed_revenue += entry.revenue;
                acc.yearly.push(entry);
            }
        }
        acc
    }
}
