#![deny(warnings)]

//! Core domain model for the clinic profitability engine.
//!
//! This crate defines the serializable configuration types (clinics, service
//! catalogues, cost model, scenario registry, tax schedule) together with
//! validation helpers that guarantee basic invariants. Configuration is an
//! immutable snapshot: calculations never mutate it, overrides are merged
//! functionally by the caller.

use chrono::{NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::warn;

/// How a clinic's rent figure is quoted.
///
/// Any other period string in serialized configuration is rejected at
/// deserialization time; a guessed conversion would silently corrupt every
/// downstream figure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentPeriod {
    /// Amount is already per week.
    Weekly,
    /// Amount is per operating day.
    Daily,
    /// Amount covers a full year.
    Annual,
}

/// Rent owed for a clinic room, with the period the amount is quoted in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RentTerm {
    /// Quoted amount in currency units (>= 0).
    pub amount: Decimal,
    /// Period the amount covers.
    pub period: RentPeriod,
}

/// A bookable treatment offered at one clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Display name, unique within its clinic's catalogue.
    pub name: String,
    /// Appointment length in minutes (> 0).
    pub duration_min: u32,
    /// Price per appointment (>= 0).
    pub price: Decimal,
    /// Fraction of the clinic's weekly patients choosing this service, in [0, 1].
    pub popularity: Decimal,
}

/// A clinic location with its opening pattern, occupancy costs, and catalogue.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    /// Clinic name, the unique key across the configuration.
    pub name: String,
    /// Operating days, at least one.
    pub days: Vec<Weekday>,
    /// Opening time, strictly before `close`.
    pub open: NaiveTime,
    /// Closing time.
    pub close: NaiveTime,
    /// Room rent term.
    pub rent: RentTerm,
    /// Other fixed recurring cost per week (insurance, software, ...).
    pub weekly_fixed_cost: Decimal,
    /// Configured weekly patient total before any per-run override.
    pub weekly_patients: u32,
    /// Service catalogue.
    pub services: Vec<Service>,
}

/// Global cost constants shared by every clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Trading weeks per year.
    pub weeks_open: u32,
    /// Card processing fee as a fraction of revenue.
    pub payment_fee_percent: Decimal,
    /// Card processing fee fixed component per transaction.
    pub payment_fee_fixed: Decimal,
    /// Consumables used per attended appointment.
    pub consumable_cost_per_patient: Decimal,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel {
            weeks_open: 48,
            payment_fee_percent: Decimal::new(175, 4), // 1.75%
            payment_fee_fixed: Decimal::new(20, 2),
            consumable_cost_per_patient: Decimal::ONE,
        }
    }
}

/// The full immutable configuration snapshot an engine run works from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// Shared cost constants.
    pub costs: CostModel,
    /// All clinics, in presentation order.
    pub clinics: Vec<Clinic>,
}

/// Demand/efficiency parameters for one named what-if scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Probability a booked slot is unattended, in [0, 1].
    pub no_show_rate: Decimal,
    /// Fraction of available capacity actually booked, in [0, 1].
    pub appointment_fill_rate: Decimal,
    /// Average annual visits per unique client (> 0).
    pub client_repeat_rate: Decimal,
}

/// Named scenarios in insertion order.
///
/// Order matters for enumeration surfaces (menus, error messages), so this is
/// a vector of pairs rather than a map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRegistry {
    entries: Vec<(String, Scenario)>,
}

impl ScenarioRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named scenario, preserving first-insertion order.
    pub fn insert(&mut self, name: impl Into<String>, scenario: Scenario) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, s)) => *s = scenario,
            None => self.entries.push((name, scenario)),
        }
    }

    /// Look up a scenario by exact name.
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    /// Scenario names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// All entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scenario)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One marginal tax band: `rate` applies to the slice of the base between the
/// previous band's threshold and `up_to`. The top band has `up_to = None`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxBand {
    /// Upper threshold of the band, or `None` for the unbounded top band.
    pub up_to: Option<Decimal>,
    /// Marginal rate within the band, in [0, 1].
    pub rate: Decimal,
}

/// Progressive tax schedule, held as data so the calculator stays pure and
/// testable against arbitrary band layouts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxSchedule {
    /// Tax-free personal allowance deducted before the income bands apply.
    pub personal_allowance: Decimal,
    /// Income tax bands over taxable profit (profit minus allowance).
    pub income_bands: Vec<TaxBand>,
    /// Self-employment contribution bands over raw profit. The gate "no
    /// contribution below the allowance" is encoded as a leading zero-rate band.
    pub contribution_bands: Vec<TaxBand>,
    /// Weekly amount of the optional flat low-profit contribution.
    pub flat_weekly_contribution: Decimal,
    /// Flat contribution applies only while profit is below this ceiling.
    pub flat_contribution_ceiling: Decimal,
    /// Opt-in flag for the flat contribution.
    pub flat_contribution_opt_in: bool,
}

impl TaxSchedule {
    /// UK 2025/26 sole-trader schedule: income tax at 20/40/45% above a
    /// 12,570 allowance, Class 4 contributions at 6/2% between 12,570 and
    /// 50,270 and above, optional Class 2 at 3.50/week under 6,845 profit.
    pub fn uk_2025(flat_contribution_opt_in: bool) -> Self {
        TaxSchedule {
            personal_allowance: Decimal::from(12_570),
            income_bands: vec![
                TaxBand {
                    up_to: Some(Decimal::from(37_700)),
                    rate: Decimal::new(20, 2),
                },
                TaxBand {
                    up_to: Some(Decimal::from(112_570)),
                    rate: Decimal::new(40, 2),
                },
                TaxBand {
                    up_to: None,
                    rate: Decimal::new(45, 2),
                },
            ],
            contribution_bands: vec![
                TaxBand {
                    up_to: Some(Decimal::from(12_570)),
                    rate: Decimal::ZERO,
                },
                TaxBand {
                    up_to: Some(Decimal::from(50_270)),
                    rate: Decimal::new(6, 2),
                },
                TaxBand {
                    up_to: None,
                    rate: Decimal::new(2, 2),
                },
            ],
            flat_weekly_contribution: Decimal::new(350, 2),
            flat_contribution_ceiling: Decimal::from(6_845),
            flat_contribution_opt_in,
        }
    }
}

/// Validation errors for configuration invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Clinic or service name is empty.
    #[error("name must not be empty")]
    EmptyName,
    /// Clinic names are the unique configuration key.
    #[error("duplicate clinic name: {0}")]
    DuplicateClinic(String),
    /// A clinic needs at least one operating day.
    #[error("clinic {0:?} has no operating days")]
    NoOperatingDays(String),
    /// Opening time must precede closing time.
    #[error("clinic {0:?} must open before it closes")]
    OpensAfterClose(String),
    /// Appointment durations are strictly positive.
    #[error("service {0:?} must have a positive duration")]
    ZeroDuration(String),
    /// Prices, rents, fees, and costs are non-negative.
    #[error("negative monetary value is invalid")]
    NegativeMoney,
    /// Popularity shares are fractions of weekly demand.
    #[error("popularity share for {0:?} must be within [0, 1]")]
    PopularityOutOfRange(String),
    /// No-show and fill rates are probabilities.
    #[error("scenario rate must be within [0, 1]")]
    RateOutOfRange,
    /// Repeat rate divides visit volume into clients.
    #[error("client repeat rate must be > 0")]
    NonPositiveRepeatRate,
    /// A year of zero trading weeks makes every annual figure degenerate.
    #[error("weeks open must be > 0")]
    ZeroWeeksOpen,
    /// Band thresholds must increase strictly with exactly one unbounded top band.
    #[error("malformed tax bands: thresholds must increase and end unbounded")]
    MalformedTaxBands,
    /// Marginal rates are fractions.
    #[error("tax rate must be within [0, 1]")]
    TaxRateOutOfRange,
}

/// Validate one service entry.
pub fn validate_service(s: &Service) -> Result<(), ValidationError> {
    if s.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if s.duration_min == 0 {
        return Err(ValidationError::ZeroDuration(s.name.clone()));
    }
    if s.price < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    if s.popularity < Decimal::ZERO || s.popularity > Decimal::ONE {
        return Err(ValidationError::PopularityOutOfRange(s.name.clone()));
    }
    Ok(())
}

/// Validate a clinic and its catalogue.
///
/// Popularity shares are expected to sum to 1.0 but this is deliberately not
/// an error: existing catalogues ship with small gaps, and the aggregation
/// model simply scales demand by the actual sum. A deviation beyond 0.001 is
/// logged so the configuration author can see the under/over-count.
pub fn validate_clinic(c: &Clinic) -> Result<(), ValidationError> {
    if c.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if c.days.is_empty() {
        return Err(ValidationError::NoOperatingDays(c.name.clone()));
    }
    if c.open >= c.close {
        return Err(ValidationError::OpensAfterClose(c.name.clone()));
    }
    if c.rent.amount < Decimal::ZERO || c.weekly_fixed_cost < Decimal::ZERO {
        return Err(ValidationError::NegativeMoney);
    }
    let mut share_sum = Decimal::ZERO;
    for s in &c.services {
        validate_service(s)?;
        share_sum += s.popularity;
    }
    if !c.services.is_empty() && (share_sum - Decimal::ONE).abs() > Decimal::new(1, 3) {
        warn!(
            clinic = %c.name,
            share_sum = %share_sum,
            "service popularity shares do not sum to 1.0; weekly demand scales by the actual sum"
        );
    }
    Ok(())
}

/// Validate the shared cost constants.
pub fn validate_cost_model(m: &CostModel) -> Result<(), ValidationError> {
    if m.weeks_open == 0 {
        return Err(ValidationError::ZeroWeeksOpen);
    }
    if m.payment_fee_percent < Decimal::ZERO
        || m.payment_fee_fixed < Decimal::ZERO
        || m.consumable_cost_per_patient < Decimal::ZERO
    {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(())
}

/// Validate a scenario's demand parameters.
pub fn validate_scenario(s: &Scenario) -> Result<(), ValidationError> {
    let unit = Decimal::ZERO..=Decimal::ONE;
    if !unit.contains(&s.no_show_rate) || !unit.contains(&s.appointment_fill_rate) {
        return Err(ValidationError::RateOutOfRange);
    }
    if s.client_repeat_rate <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveRepeatRate);
    }
    Ok(())
}

fn validate_bands(bands: &[TaxBand]) -> Result<(), ValidationError> {
    if bands.is_empty() {
        return Err(ValidationError::MalformedTaxBands);
    }
    let mut prev: Option<Decimal> = None;
    for (i, band) in bands.iter().enumerate() {
        if band.rate < Decimal::ZERO || band.rate > Decimal::ONE {
            return Err(ValidationError::TaxRateOutOfRange);
        }
        match band.up_to {
            Some(t) => {
                if i == bands.len() - 1 {
                    return Err(ValidationError::MalformedTaxBands);
                }
                if t <= prev.unwrap_or(Decimal::ZERO) {
                    return Err(ValidationError::MalformedTaxBands);
                }
                prev = Some(t);
            }
            None => {
                if i != bands.len() - 1 {
                    return Err(ValidationError::MalformedTaxBands);
                }
            }
        }
    }
    Ok(())
}

/// Validate a tax schedule.
pub fn validate_tax_schedule(t: &TaxSchedule) -> Result<(), ValidationError> {
    if t.personal_allowance < Decimal::ZERO
        || t.flat_weekly_contribution < Decimal::ZERO
        || t.flat_contribution_ceiling < Decimal::ZERO
    {
        return Err(ValidationError::NegativeMoney);
    }
    validate_bands(&t.income_bands)?;
    validate_bands(&t.contribution_bands)?;
    Ok(())
}

/// Validate a full configuration snapshot, including name uniqueness.
pub fn validate_config(cfg: &PracticeConfig) -> Result<(), ValidationError> {
    validate_cost_model(&cfg.costs)?;
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for clinic in &cfg.clinics {
        validate_clinic(clinic)?;
        if !names.insert(&clinic.name) {
            return Err(ValidationError::DuplicateClinic(clinic.name.clone()));
        }
    }
    Ok(())
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("literal time")
}

/// Catalogue entry shorthand: price in pence, popularity in hundredths.
fn svc(name: &str, duration_min: u32, price_pence: i64, popularity_pct: i64) -> Service {
    Service {
        name: name.to_string(),
        duration_min,
        price: Decimal::new(price_pence, 2),
        popularity: Decimal::new(popularity_pct, 2),
    }
}

impl PracticeConfig {
    /// The built-in three-clinic practice configuration.
    pub fn builtin() -> Self {
        use Weekday::*;
        PracticeConfig {
            costs: CostModel::default(),
            clinics: vec![
                Clinic {
                    name: "Vista Clinic".to_string(),
                    days: vec![Mon],
                    open: hm(10, 0),
                    close: hm(20, 0),
                    rent: RentTerm {
                        amount: Decimal::from(65),
                        period: RentPeriod::Weekly,
                    },
                    weekly_fixed_cost: Decimal::from(5),
                    weekly_patients: 3,
                    services: vec![
                        svc("Sports Massage 30m", 30, 40_00, 25),
                        svc("Sports Massage 60m", 60, 70_00, 25),
                        svc("Sports Therapy 30m", 30, 40_00, 25),
                        svc("Sports Therapy 60m", 60, 70_00, 25),
                    ],
                },
                Clinic {
                    name: "Niks Skin".to_string(),
                    days: vec![Wed, Thu],
                    open: hm(9, 30),
                    close: hm(20, 0),
                    rent: RentTerm {
                        amount: Decimal::from(140),
                        period: RentPeriod::Weekly,
                    },
                    weekly_fixed_cost: Decimal::ZERO,
                    weekly_patients: 11,
                    services: vec![
                        svc("Baby & Me 30m", 30, 40_00, 10),
                        svc("Dry Needling 1 Area 30m", 30, 40_00, 10),
                        svc("Dry Needling 2 Areas 45m", 45, 50_00, 20),
                        svc("Sports Therapy 1st Con 60m", 60, 70_00, 20),
                        svc("Myofascial Dry Cupping (1 Area)", 30, 40_00, 10),
                        svc("Myofascial Dry Cupping (Full Body)", 60, 70_00, 10),
                        svc("Put Your Hands In The Air 30m", 30, 40_00, 5),
                        svc("Run Down Legs", 30, 40_00, 5),
                        svc("Sports Therapy Treatment 30m", 30, 40_00, 5),
                        svc("That Time Of The Month", 30, 40_00, 5),
                    ],
                },
                Clinic {
                    name: "Jaydes Spa".to_string(),
                    days: vec![Fri],
                    open: hm(10, 0),
                    close: hm(20, 0),
                    rent: RentTerm {
                        amount: Decimal::from(65),
                        period: RentPeriod::Weekly,
                    },
                    weekly_fixed_cost: Decimal::from(5),
                    weekly_patients: 10,
                    services: vec![
                        svc("Full Body MOT 60m (Public)", 60, 75_00, 10),
                        svc("Full Body MOT 60m (Resident)", 60, 67_50, 10),
                        svc("The Posture Reset 30m (Public)", 30, 45_00, 8),
                        svc("The Posture Reset 30m (Resident)", 30, 40_50, 8),
                        svc("Run-Down Legs 30m (Public)", 30, 45_00, 8),
                        svc("Run-Down Legs 30m (Resident)", 30, 40_50, 8),
                        svc("Put Your Hands In The Air 30m (Public)", 30, 45_00, 8),
                        svc("Put Your Hands In The Air 30m (Resident)", 30, 40_50, 8),
                        svc("That Time of the Month 30m (Public)", 30, 45_00, 7),
                        svc("That Time of the Month 30m (Resident)", 30, 40_50, 7),
                        svc("Baby & Me 30m (Public)", 30, 45_00, 7),
                        svc("Baby & Me 30m (Resident)", 30, 40_50, 7),
                    ],
                },
            ],
        }
    }
}

/// Scenario shorthand: rates in hundredths, repeat rate in tenths.
fn scn(no_show_pct: i64, fill_pct: i64, repeat_tenths: i64) -> Scenario {
    Scenario {
        no_show_rate: Decimal::new(no_show_pct, 2),
        appointment_fill_rate: Decimal::new(fill_pct, 2),
        client_repeat_rate: Decimal::new(repeat_tenths, 1),
    }
}

impl ScenarioRegistry {
    /// The built-in registry of fifteen demand scenarios.
    pub fn builtin() -> Self {
        let mut r = ScenarioRegistry::new();
        r.insert("Baseline", scn(10, 85, 35)); // typical operations
        r.insert("Growth", scn(5, 95, 40)); // high efficiency
        r.insert("Stress test", scn(15, 75, 25)); // challenging conditions
        r.insert("Holiday", scn(25, 50, 18)); // seasonal slowdown
        r.insert("Marketing boost", scn(8, 90, 50)); // successful campaign
        r.insert("Referral program", scn(12, 88, 45)); // word-of-mouth growth
        r.insert("Weather disruption", scn(30, 60, 20)); // severe weather
        r.insert("Flu season", scn(18, 80, 30)); // higher seasonal demand
        r.insert("Economic downturn", scn(20, 65, 22)); // fewer discretionary visits
        r.insert("Tech upgrade", scn(7, 92, 42)); // automation and reminders
        r.insert("Weekend special", scn(15, 70, 28)); // weekend availability
        r.insert("Vip membership", scn(3, 98, 60)); // premium loyalty
        r.insert("New competitor", scn(14, 72, 27)); // market share loss
        r.insert("Staff shortage", scn(12, 55, 24)); // reduced capacity
        r.insert("Social media campaign", scn(10, 93, 48)); // online buzz
        r
    }
}
