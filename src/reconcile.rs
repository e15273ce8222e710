//! Groups one company's quarterly reports into calendar-year windows.

use crate::schema::{Period, QuarterlyReport};
use crate::utils::{FIRST_QUARTER, LAST_QUARTER, QUARTERS_IN_YEAR};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStrategy {
    /// Consumes reports positionally with a single forward cursor, one report per
    /// expected quarter. Relies on gapless input: a missing quarter shifts the
    /// following reports into the wrong year.
    Sequential,

    /// Buckets reports by their own year and quarter fields. Reports outside the
    /// period and duplicate quarters are ignored.
    #[default]
    Keyed,
}

/// Reports attributed to a single calendar year of one company.
#[derive(Debug, Clone, PartialEq)]
pub struct YearWindow {
    pub year: i32,
    /// First and last quarter the period covers in this year.
    pub span: (u32, u32),
    pub reports: Vec<QuarterlyReport>,
    /// Set once the window has been taxed.
    pub tax: Option<f64>,
}

impl YearWindow {
    fn new(year: i32, span: (u32, u32)) -> Self {
        Self {
            year,
            span,
            reports: Vec::new(),
            tax: None,
        }
    }

    pub fn expected_quarters(&self) -> usize {
        (self.span.1 - self.span.0 + 1) as usize
    }

    /// Every quarter of the span has a report.
    pub fn is_covered(&self) -> bool {
        self.reports.len() == self.expected_quarters()
    }

    /// A full calendar year with all four reports present. Only complete windows
    /// are taxed.
    pub fn is_complete(&self) -> bool {
        self.span == (FIRST_QUARTER, LAST_QUARTER) && self.reports.len() == QUARTERS_IN_YEAR
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

#[derive(Debug, Clone, Default)]
pub struct YearWindows {
    windows: BTreeMap<i32, YearWindow>,
}

impl YearWindows {
    pub fn get(&self, year: i32) -> Option<&YearWindow> {
        self.windows.get(&year)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &YearWindow> {
        self.windows.values()
    }

    pub fn complete_windows(&self) -> impl Iterator<Item = &YearWindow> {
        self.windows.values().filter(|w| w.is_complete())
    }

    pub fn complete_windows_mut(&mut self) -> impl Iterator<Item = &mut YearWindow> {
        self.windows.values_mut().filter(|w| w.is_complete())
    }

    pub fn complete_years(&self) -> Vec<i32> {
        self.complete_windows().map(|w| w.year).collect()
    }
}

pub struct YearWindowReconciler {
    strategy: ReconcileStrategy,
}

impl YearWindowReconciler {
    pub fn new(strategy: ReconcileStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ReconcileStrategy {
        self.strategy
    }

    /// Builds windows for the first and last year of `period` and for every year
    /// that receives reports. `reports` must belong to a single company and be
    /// sorted by (year, quarter).
    pub fn reconcile(&self, reports: &[QuarterlyReport], period: &Period) -> YearWindows {
        let windows = match self.strategy {
            ReconcileStrategy::Sequential => Self::reconcile_sequential(reports, period),
            ReconcileStrategy::Keyed => Self::reconcile_keyed(reports, period),
        };

        let result = YearWindows { windows };
        debug!(
            "Reconciled {} reports over {} into {} year windows ({} complete) using {:?}",
            reports.len(),
            period,
            result.len(),
            result.complete_windows().count(),
            self.strategy
        );
        result
    }

    fn reconcile_sequential(
        reports: &[QuarterlyReport],
        period: &Period,
    ) -> BTreeMap<i32, YearWindow> {
        let mut windows = edge_windows(period);
        let mut cursor = reports.iter().peekable();

        for year in period.years() {
            if cursor.peek().is_none() {
                break;
            }
            let Some(span) = period.quarter_span(year) else {
                continue;
            };
            let window = windows
                .entry(year)
                .or_insert_with(|| YearWindow::new(year, span));

            for _ in span.0..=span.1 {
                match cursor.next() {
                    Some(report) => window.reports.push(report.clone()),
                    None => break,
                }
            }
        }

        windows
    }

    fn reconcile_keyed(reports: &[QuarterlyReport], period: &Period) -> BTreeMap<i32, YearWindow> {
        let mut windows = edge_windows(period);
        let mut seen: BTreeSet<(i32, u32)> = BTreeSet::new();

        for report in reports {
            if !period.contains(report.year, report.quarter) {
                debug!(
                    "Skipping report {} for {}-Q{}: outside {}",
                    report.id, report.year, report.quarter, period
                );
                continue;
            }
            if !seen.insert((report.year, report.quarter)) {
                debug!(
                    "Skipping duplicate report {} for {}-Q{}",
                    report.id, report.year, report.quarter
                );
                continue;
            }
            if let Some(span) = period.quarter_span(report.year) {
                windows
                    .entry(report.year)
                    .or_insert_with(|| YearWindow::new(report.year, span))
                    .reports
                    .push(report.clone());
            }
        }

        windows
    }
}

// Windows are created only for the period's edge years and for years that
// actually receive reports, so the map is bounded by the input, not the period.
fn edge_windows(period: &Period) -> BTreeMap<i32, YearWindow> {
    [period.start_year, period.end_year]
        .into_iter()
        .filter_map(|year| {
            period
                .quarter_span(year)
                .map(|span| (year, YearWindow::new(year, span)))
        })
        .collect()
}

impl Default for YearWindowReconciler {
    fn default() -> Self {
        Self::new(ReconcileStrategy::default())
    }
}
