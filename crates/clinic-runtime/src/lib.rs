#![deny(warnings)]

//! Scenario orchestrator: runs every clinic through the calculators for one
//! named scenario and assembles the six correlated result tables.
//!
//! The engine holds an immutable configuration snapshot. Per-clinic weekly
//! patient overrides are merged functionally at call time, so nothing is ever
//! mutated and nothing needs restoring afterwards.

use clinic_core::{
    validate_config, validate_scenario, validate_tax_schedule, PracticeConfig, ScenarioRegistry,
    TaxSchedule, ValidationError,
};
use clinic_econ::{
    cash_flow, clinic_report, default_price_adjustments, CashFlowEntry, ClinicSummary,
    GrowthProjection, GrowthYear, ServiceResult,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Errors that abort a scenario run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested scenario is not in the registry; never silently defaulted.
    #[error("invalid scenario {name:?}; valid scenarios: {}", .valid.join(", "))]
    UnknownScenario { name: String, valid: Vec<String> },
    /// Malformed configuration, scenario, or tax schedule.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}

/// One service-level result row, tagged with its clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceRow {
    pub clinic: String,
    #[serde(flatten)]
    pub result: ServiceResult,
}

/// One projected growth year, tagged with its clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthRow {
    pub clinic: String,
    #[serde(flatten)]
    pub year: GrowthYear,
}

/// One cumulative cash month, tagged with its clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    pub clinic: String,
    #[serde(flatten)]
    pub entry: CashFlowEntry,
}

/// Revenue and net profit under one price adjustment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSensitivityRow {
    pub clinic: String,
    /// Fractional adjustment applied to every price, e.g. -0.10.
    pub adjustment: Decimal,
    pub annual_revenue: Decimal,
    pub net_profit: Decimal,
}

/// Hours and utilization extract of a clinic summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtilizationRow {
    pub clinic: String,
    pub weekly_hours_available: Decimal,
    pub weekly_hours_booked: Decimal,
    pub utilization_pct: Decimal,
}

/// Everything one scenario run produces, as ordered tabular rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Name of the scenario that produced the bundle.
    pub scenario: String,
    pub services: Vec<ServiceRow>,
    pub summary: Vec<ClinicSummary>,
    pub growth: Vec<GrowthRow>,
    pub cash_flow: Vec<CashFlowRow>,
    pub price_sensitivity: Vec<PriceSensitivityRow>,
    pub utilization: Vec<UtilizationRow>,
}

/// Per-clinic weekly patient overrides. Keys that match no configured clinic
/// are ignored; absent keys fall back to the configured totals.
pub type Overrides = BTreeMap<String, u32>;

/// The scenario calculation engine over one validated configuration snapshot.
#[derive(Clone, Debug)]
pub struct ScenarioEngine {
    config: PracticeConfig,
    registry: ScenarioRegistry,
    tax: TaxSchedule,
}

impl ScenarioEngine {
    /// Build an engine, validating the configuration, every registered
    /// scenario, and the tax schedule up front.
    pub fn new(
        config: PracticeConfig,
        registry: ScenarioRegistry,
        tax: TaxSchedule,
    ) -> Result<Self, EngineError> {
        validate_config(&config)?;
        for (_, scenario) in registry.iter() {
            validate_scenario(scenario)?;
        }
        validate_tax_schedule(&tax)?;
        Ok(ScenarioEngine {
            config,
            registry,
            tax,
        })
    }

    /// Engine over the built-in practice, scenario registry, and UK schedule.
    pub fn builtin(flat_contribution_opt_in: bool) -> Result<Self, EngineError> {
        ScenarioEngine::new(
            PracticeConfig::builtin(),
            ScenarioRegistry::builtin(),
            TaxSchedule::uk_2025(flat_contribution_opt_in),
        )
    }

    /// The configuration snapshot the engine runs against.
    pub fn config(&self) -> &PracticeConfig {
        &self.config
    }

    /// Registered scenario names in insertion order.
    pub fn scenario_names(&self) -> Vec<&str> {
        self.registry.names().collect()
    }

    /// Run one scenario across every clinic and assemble the result tables.
    pub fn run(&self, scenario_name: &str, overrides: &Overrides) -> Result<ResultBundle, EngineError> {
        let scenario =
            self.registry
                .get(scenario_name)
                .ok_or_else(|| EngineError::UnknownScenario {
                    name: scenario_name.to_string(),
                    valid: self.registry.names().map(str::to_string).collect(),
                })?;

        let mut bundle = ResultBundle {
            scenario: scenario_name.to_string(),
            services: Vec::new(),
            summary: Vec::new(),
            growth: Vec::new(),
            cash_flow: Vec::new(),
            price_sensitivity: Vec::new(),
            utilization: Vec::new(),
        };

        for clinic in &self.config.clinics {
            let weekly_total = overrides
                .get(clinic.name.as_str())
                .copied()
                .unwrap_or(clinic.weekly_patients);
            let report = clinic_report(clinic, weekly_total, scenario, &self.config.costs, &self.tax);

            for result in &report.services {
                bundle.services.push(ServiceRow {
                    clinic: clinic.name.clone(),
                    result: result.clone(),
                });
            }
            for year in GrowthProjection::from_summary(&report.summary) {
                bundle.growth.push(GrowthRow {
                    clinic: clinic.name.clone(),
                    year,
                });
            }
            for entry in cash_flow(report.summary.tax.net_profit) {
                bundle.cash_flow.push(CashFlowRow {
                    clinic: clinic.name.clone(),
                    entry,
                });
            }
            for point in clinic_econ::price_sensitivity(
                clinic,
                weekly_total,
                scenario,
                &self.config.costs,
                &self.tax,
                &default_price_adjustments(),
            ) {
                bundle.price_sensitivity.push(PriceSensitivityRow {
                    clinic: clinic.name.clone(),
                    adjustment: point.adjustment,
                    annual_revenue: point.summary.annual_revenue,
                    net_profit: point.summary.tax.net_profit,
                });
            }
            bundle.utilization.push(UtilizationRow {
                clinic: clinic.name.clone(),
                weekly_hours_available: report.summary.weekly_hours_available,
                weekly_hours_booked: report.summary.weekly_hours_booked,
                utilization_pct: report.summary.utilization_pct,
            });

            info!(
                clinic = %clinic.name,
                weekly_total,
                gross_profit = %report.summary.gross_profit,
                "clinic computed"
            );
            bundle.summary.push(report.summary);
        }

        info!(
            scenario = scenario_name,
            clinics = bundle.summary.len(),
            "scenario complete"
        );
        Ok(bundle)
    }
}
