use crate::error::{EngineError, Result};
use crate::reconcile::ReconcileStrategy;
use crate::tax::{TaxSchedule, DEFAULT_TAX_LOAD_EPSILON};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_tax_load_epsilon() -> f64 {
    DEFAULT_TAX_LOAD_EPSILON
}

fn default_max_concurrent_fetches() -> usize {
    8
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct EngineConfig {
    #[serde(default)]
    #[schemars(description = "Progressive bracket table applied to each complete company-year")]
    pub tax_schedule: TaxSchedule,

    #[serde(default = "default_tax_load_epsilon")]
    #[schemars(
        description = "Taxed revenue below this magnitude yields a tax load of 0 instead of dividing by it"
    )]
    pub tax_load_epsilon: f64,

    #[serde(default)]
    #[schemars(description = "How quarterly reports are assigned to calendar years")]
    pub reconcile_strategy: ReconcileStrategy,

    #[serde(default = "default_max_concurrent_fetches")]
    #[schemars(
        description = "Upper bound on per-company report fetches in flight. 1 fetches sequentially."
    )]
    pub max_concurrent_fetches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tax_schedule: TaxSchedule::default(),
            tax_load_epsilon: default_tax_load_epsilon(),
            reconcile_strategy: ReconcileStrategy::default(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.tax_schedule.validate()?;

        if self.tax_load_epsilon.is_nan() || self.tax_load_epsilon < 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "tax_load_epsilon must be non-negative (got {})",
                self.tax_load_epsilon
            )));
        }

        if self.max_concurrent_fetches == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrent_fetches must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(EngineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
