//! # Owner Financials
//!
//! Reconciles the quarterly financial disclosures of an entrepreneur's companies
//! into calendar years, taxes every complete year on a progressive schedule and
//! rates the entrepreneur by their most profitable company.
//!
//! ## Core Concepts
//!
//! - **Period**: an inclusive range of quarters, e.g. `2022-Q3:2023-Q2`
//! - **Year Window**: the reports of one company attributed to one calendar year;
//!   only a window holding all four quarters is taxed
//! - **Report Set**: every report of every company of the owner over a period,
//!   with the accrued taxes and the tax load (taxes as a share of taxed revenue)
//! - **Rating**: `(cost / max_cost + profit / revenue) / 2`, where `cost` is the
//!   industry weight of the owner's most profitable company last year
//!
//! Companies, reports and activity fields are read through the async traits in
//! [`directory`]; [`InMemoryDirectory`] implements all of them.
//!
//! ## Example
//!
//! ```rust,ignore
//! use owner_financials::*;
//! use uuid::Uuid;
//!
//! let owner = Uuid::new_v4();
//! let field = ActivityField {
//!     id: Uuid::new_v4(),
//!     name: "IT".to_string(),
//!     description: "Software development".to_string(),
//!     cost: 1.5,
//! };
//! let company = Company {
//!     id: Uuid::new_v4(),
//!     owner_id: owner,
//!     activity_field_id: field.id,
//!     name: "Acme".to_string(),
//!     city: "Moscow".to_string(),
//! };
//!
//! let mut directory = InMemoryDirectory::new();
//! directory.add_activity_field(field).add_company(company.clone());
//! for quarter in 1..=4 {
//!     let report = QuarterlyReport::new(company.id, 2023, quarter, 1_000_000.0, 200_000.0);
//!     directory.add_report(report);
//! }
//!
//! let engine = FinancialEngine::from_directory(directory, EngineConfig::default())?;
//! let report = engine
//!     .get_user_financial_report(owner, &"2023-Q1:2023-Q4".parse()?)
//!     .await?;
//! assert_eq!(report.taxes_accrued, 128_000.0);
//! ```

pub mod aggregator;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod rating;
pub mod reconcile;
pub mod schema;
pub mod tax;
pub mod utils;

pub use aggregator::ReportAggregator;
pub use config::EngineConfig;
pub use directory::{
    ActivityFieldCatalog, CompanyDirectory, FinancialReportSource, InMemoryDirectory,
    LookupError, UpstreamResult,
};
pub use engine::FinancialEngine;
pub use error::{BoxError, EngineError, Result};
pub use rating::{combine_rating, RatingCalculator};
pub use reconcile::{ReconcileStrategy, YearWindow, YearWindowReconciler, YearWindows};
pub use schema::*;
pub use tax::{TaxAccumulator, TaxBracket, TaxCalculator, TaxSchedule, DEFAULT_TAX_LOAD_EPSILON};
