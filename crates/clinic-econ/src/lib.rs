#![deny(warnings)]

//! Profitability calculators for the clinic engine.
//!
//! Pure functions from configuration + scenario to derived value objects:
//! - progressive tax over a data-driven band schedule
//! - per-service weekly demand, revenue, variable cost, and rate metrics
//! - clinic-level aggregation with utilization, capacity, and break-even
//! - projections: compounding growth, cumulative cash flow, price sweeps
//!
//! Numeric edge cases (zero hours, zero patients, non-positive profit or unit
//! margin) are legitimate business states, not faults: every division is
//! guarded and falls back to a documented value instead of an error.

use clinic_core::{Clinic, CostModel, RentPeriod, Scenario, Service, TaxBand, TaxSchedule};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tax breakdown for one annual pre-tax profit figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    /// Income tax across the progressive bands.
    pub income_tax: Decimal,
    /// Self-employment contribution across its bands.
    pub profit_contribution: Decimal,
    /// Optional flat low-profit contribution (opt-in, ceiling-gated).
    pub flat_contribution: Decimal,
    /// Sum of all components.
    pub total_tax: Decimal,
    /// Profit after tax; equals profit when profit <= 0 (a loss is not taxed).
    pub net_profit: Decimal,
    /// Net profit as a percentage of pre-tax profit; 0 when profit <= 0.
    pub net_margin_pct: Decimal,
}

/// Marginal-rate tax over `base`, accumulated band by band.
fn marginal_tax(base: Decimal, bands: &[TaxBand]) -> Decimal {
    let mut tax = Decimal::ZERO;
    let mut lower = Decimal::ZERO;
    for band in bands {
        let upper = band.up_to.unwrap_or(base);
        let span = (base.min(upper) - lower).max(Decimal::ZERO);
        tax += span * band.rate;
        if base <= upper {
            break;
        }
        lower = upper;
    }
    tax
}

/// Compute the tax breakdown for one annual profit value.
///
/// Income bands apply to profit minus the personal allowance (floored at 0);
/// contribution bands apply to raw profit. Non-positive profit short-circuits
/// to an all-zero breakdown with `net_profit = profit`.
pub fn compute_tax(profit: Decimal, schedule: &TaxSchedule, weeks_open: u32) -> TaxResult {
    if profit <= Decimal::ZERO {
        return TaxResult {
            income_tax: Decimal::ZERO,
            profit_contribution: Decimal::ZERO,
            flat_contribution: Decimal::ZERO,
            total_tax: Decimal::ZERO,
            net_profit: profit,
            net_margin_pct: Decimal::ZERO,
        };
    }
    let taxable = (profit - schedule.personal_allowance).max(Decimal::ZERO);
    let income_tax = marginal_tax(taxable, &schedule.income_bands);
    let profit_contribution = marginal_tax(profit, &schedule.contribution_bands);
    let flat_contribution =
        if schedule.flat_contribution_opt_in && profit < schedule.flat_contribution_ceiling {
            schedule.flat_weekly_contribution * Decimal::from(weeks_open)
        } else {
            Decimal::ZERO
        };
    let total_tax = income_tax + profit_contribution + flat_contribution;
    let net_profit = profit - total_tax;
    TaxResult {
        income_tax,
        profit_contribution,
        flat_contribution,
        total_tax,
        net_profit,
        net_margin_pct: net_profit / profit * Decimal::from(100),
    }
}

/// Annual profitability of one service at a given clinic-wide weekly volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceResult {
    /// Service name.
    pub service: String,
    /// Appointment length in minutes.
    pub duration_min: u32,
    /// Patients per week actually served, after no-show attrition.
    pub patients_per_week: Decimal,
    /// Revenue over the trading year.
    pub annual_revenue: Decimal,
    /// Payment processing plus consumables over the trading year.
    pub variable_cost: Decimal,
    /// `annual_revenue - variable_cost`; may be negative.
    pub profit: Decimal,
    /// Profit per treatment hour; 0 when no hours are delivered.
    pub profit_per_hour: Decimal,
    /// Revenue per treatment hour; 0 when no hours are delivered.
    pub revenue_per_hour: Decimal,
    /// Revenue per unique client, converting visits via the repeat rate.
    pub revenue_per_client: Decimal,
}

/// Derive one service's annual result from the clinic's weekly patient total.
pub fn service_result(
    service: &Service,
    clinic_weekly_total: Decimal,
    scenario: &Scenario,
    costs: &CostModel,
) -> ServiceResult {
    let weeks = Decimal::from(costs.weeks_open);
    let patients_per_week =
        clinic_weekly_total * service.popularity * (Decimal::ONE - scenario.no_show_rate);
    let annual_revenue = patients_per_week * service.price * weeks;
    let payment_cost = annual_revenue * costs.payment_fee_percent
        + patients_per_week * weeks * costs.payment_fee_fixed;
    let consumables = patients_per_week * weeks * costs.consumable_cost_per_patient;
    let variable_cost = payment_cost + consumables;
    let profit = annual_revenue - variable_cost;

    let annual_hours =
        patients_per_week * Decimal::from(service.duration_min) / Decimal::from(60) * weeks;
    let (profit_per_hour, revenue_per_hour) = if annual_hours.is_zero() {
        (Decimal::ZERO, Decimal::ZERO)
    } else {
        (profit / annual_hours, annual_revenue / annual_hours)
    };
    // Revenue over unique clients, where clients = annual visits / repeat
    // rate. Rearranged to a single division to keep exact values exact.
    let revenue_per_client = if patients_per_week.is_zero() {
        Decimal::ZERO
    } else {
        annual_revenue * scenario.client_repeat_rate / (patients_per_week * weeks)
    };

    ServiceResult {
        service: service.name.clone(),
        duration_min: service.duration_min,
        patients_per_week,
        annual_revenue,
        variable_cost,
        profit,
        profit_per_hour,
        revenue_per_hour,
        revenue_per_client,
    }
}

/// Whether the clinic's booked hours fit the available hours.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapacityStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "OVERBOOKED")]
    Overbooked,
}

/// Weekly patient volume at which margin covers fixed costs.
///
/// `Unbounded` is an explicit flag, not a numeric sentinel: with a unit
/// margin of zero or less no volume ever breaks even.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakEven {
    Patients(Decimal),
    Unbounded,
}

impl BreakEven {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, BreakEven::Unbounded)
    }
}

/// Clinic-level financial summary for one scenario run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicSummary {
    /// Clinic name.
    pub clinic: String,
    /// Sum of service revenues.
    pub annual_revenue: Decimal,
    /// Sum of service variable costs.
    pub variable_costs: Decimal,
    /// Annualized rent plus recurring weekly fixed cost.
    pub fixed_costs: Decimal,
    /// Revenue minus variable and fixed costs, before tax.
    pub gross_profit: Decimal,
    /// Tax breakdown of the gross profit.
    pub tax: TaxResult,
    /// Weekly hours open scaled by the scenario fill rate.
    pub weekly_hours_available: Decimal,
    /// Weekly treatment hours implied by served patients.
    pub weekly_hours_booked: Decimal,
    /// Booked over available hours, as a percentage; 0 when nothing is available.
    pub utilization_pct: Decimal,
    /// OK or OVERBOOKED.
    pub capacity: CapacityStatus,
    /// Weekly break-even patient count.
    pub break_even: BreakEven,
}

/// Per-service results plus the clinic summary they roll up into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClinicReport {
    pub services: Vec<ServiceResult>,
    pub summary: ClinicSummary,
}

/// Rent normalized to a weekly figure, whatever period it is quoted in.
pub fn weekly_rent(clinic: &Clinic, weeks_open: u32) -> Decimal {
    match clinic.rent.period {
        RentPeriod::Weekly => clinic.rent.amount,
        RentPeriod::Daily => clinic.rent.amount * Decimal::from(clinic.days.len() as u64),
        RentPeriod::Annual => clinic.rent.amount / Decimal::from(weeks_open),
    }
}

/// Weekly opening hours derived from the daily window and operating days.
pub fn weekly_hours(clinic: &Clinic) -> Decimal {
    let minutes = (clinic.close - clinic.open).num_minutes();
    Decimal::from(minutes) / Decimal::from(60) * Decimal::from(clinic.days.len() as u64)
}

/// Aggregate all services of a clinic into a financial summary.
///
/// `weekly_total` is the effective weekly patient count (the configured value
/// or a per-run override); the clinic itself is never mutated.
pub fn clinic_report(
    clinic: &Clinic,
    weekly_total: u32,
    scenario: &Scenario,
    costs: &CostModel,
    tax: &TaxSchedule,
) -> ClinicReport {
    let weeks = Decimal::from(costs.weeks_open);
    let total = Decimal::from(weekly_total);
    let services: Vec<ServiceResult> = clinic
        .services
        .iter()
        .map(|s| service_result(s, total, scenario, costs))
        .collect();

    let annual_revenue: Decimal = services.iter().map(|r| r.annual_revenue).sum();
    let variable_costs: Decimal = services.iter().map(|r| r.variable_cost).sum();
    let rent_per_week = weekly_rent(clinic, costs.weeks_open);
    let fixed_costs = (rent_per_week + clinic.weekly_fixed_cost) * weeks;
    let gross_profit = annual_revenue - variable_costs - fixed_costs;

    let weekly_hours_booked: Decimal = services
        .iter()
        .map(|r| r.patients_per_week * Decimal::from(r.duration_min) / Decimal::from(60))
        .sum();
    let weekly_hours_available = weekly_hours(clinic) * scenario.appointment_fill_rate;
    let utilization_pct = if weekly_hours_available.is_zero() {
        Decimal::ZERO
    } else {
        weekly_hours_booked / weekly_hours_available * Decimal::from(100)
    };
    let capacity = if weekly_hours_booked > weekly_hours_available {
        CapacityStatus::Overbooked
    } else {
        CapacityStatus::Ok
    };

    let weekly_fixed = rent_per_week + clinic.weekly_fixed_cost;
    let annual_visits = total * weeks;
    let break_even = if annual_visits.is_zero() {
        BreakEven::Unbounded
    } else {
        let unit_margin = (annual_revenue - variable_costs) / annual_visits;
        if unit_margin <= Decimal::ZERO {
            BreakEven::Unbounded
        } else {
            BreakEven::Patients(weekly_fixed / unit_margin)
        }
    };

    let tax_result = compute_tax(gross_profit, tax, costs.weeks_open);
    debug!(
        clinic = %clinic.name,
        revenue = %annual_revenue,
        gross_profit = %gross_profit,
        utilization = %utilization_pct,
        "aggregated clinic"
    );

    ClinicReport {
        services,
        summary: ClinicSummary {
            clinic: clinic.name.clone(),
            annual_revenue,
            variable_costs,
            fixed_costs,
            gross_profit,
            tax: tax_result,
            weekly_hours_available,
            weekly_hours_booked,
            utilization_pct,
            capacity,
            break_even,
        },
    }
}

/// One projected year of compounding growth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrowthYear {
    /// 1-based year index; year 1 is the unscaled base year.
    pub year: u32,
    pub projected_revenue: Decimal,
    pub projected_profit: Decimal,
}

/// Default annual growth rate for projections (5%).
pub fn default_growth_rate() -> Decimal {
    Decimal::new(5, 2)
}

/// Default projection horizon in years.
pub const DEFAULT_GROWTH_HORIZON: u32 = 5;

/// Lazy, finite year-over-year growth projection.
///
/// Year `n` scales the base revenue and net profit by `(1 + rate)^(n - 1)`,
/// built by repeated multiplication so no float exponentiation is involved.
/// Clone to restart from year 1.
#[derive(Clone, Debug)]
pub struct GrowthProjection {
    base_revenue: Decimal,
    base_net_profit: Decimal,
    growth_rate: Decimal,
    horizon_years: u32,
    next_year: u32,
    multiplier: Decimal,
}

impl GrowthProjection {
    pub fn new(
        base_revenue: Decimal,
        base_net_profit: Decimal,
        growth_rate: Decimal,
        horizon_years: u32,
    ) -> Self {
        GrowthProjection {
            base_revenue,
            base_net_profit,
            growth_rate,
            horizon_years,
            next_year: 1,
            multiplier: Decimal::ONE,
        }
    }

    /// Projection from a clinic summary with the default 5% / 5-year settings.
    pub fn from_summary(summary: &ClinicSummary) -> Self {
        Self::new(
            summary.annual_revenue,
            summary.tax.net_profit,
            default_growth_rate(),
            DEFAULT_GROWTH_HORIZON,
        )
    }
}

impl Iterator for GrowthProjection {
    type Item = GrowthYear;

    fn next(&mut self) -> Option<GrowthYear> {
        if self.next_year > self.horizon_years {
            return None;
        }
        let item = GrowthYear {
            year: self.next_year,
            projected_revenue: self.base_revenue * self.multiplier,
            projected_profit: self.base_net_profit * self.multiplier,
        };
        self.next_year += 1;
        self.multiplier *= Decimal::ONE + self.growth_rate;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.horizon_years.saturating_sub(self.next_year - 1) as usize;
        (left, Some(left))
    }
}

/// Number of entries produced by [`cash_flow`].
pub const CASH_FLOW_MONTHS: u32 = 12;

/// One month of cumulative cash.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CashFlowEntry {
    /// 1-based month index.
    pub month: u32,
    /// Running sum of `net_profit / 12` up to this month.
    pub cumulative_cash: Decimal,
}

/// Cumulative monthly cash assuming the annual net profit lands uniformly.
pub fn cash_flow(net_profit: Decimal) -> Vec<CashFlowEntry> {
    let monthly = net_profit / Decimal::from(CASH_FLOW_MONTHS);
    let mut cash = Decimal::ZERO;
    (1..=CASH_FLOW_MONTHS)
        .map(|month| {
            cash += monthly;
            CashFlowEntry {
                month,
                cumulative_cash: cash,
            }
        })
        .collect()
}

/// Default price adjustments for the sensitivity sweep: -10%, 0%, +10%.
pub fn default_price_adjustments() -> [Decimal; 3] {
    [Decimal::new(-10, 2), Decimal::ZERO, Decimal::new(10, 2)]
}

/// Clinic summary recomputed under one price adjustment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Fractional price adjustment applied to every service (e.g. -0.10).
    pub adjustment: Decimal,
    /// Full summary under the adjusted catalogue.
    pub summary: ClinicSummary,
}

/// Re-aggregate the clinic once per price adjustment.
///
/// Each pass works on an adjusted clone of the catalogue; the input clinic is
/// untouched, so no adjustment can leak into later runs.
pub fn price_sensitivity(
    clinic: &Clinic,
    weekly_total: u32,
    scenario: &Scenario,
    costs: &CostModel,
    tax: &TaxSchedule,
    adjustments: &[Decimal],
) -> Vec<PricePoint> {
    adjustments
        .iter()
        .map(|&adjustment| {
            let mut adjusted = clinic.clone();
            for service in &mut adjusted.services {
                service.price *= Decimal::ONE + adjustment;
            }
            let report = clinic_report(&adjusted, weekly_total, scenario, costs, tax);
            PricePoint {
                adjustment,
                summary: report.summary,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use clinic_core::RentTerm;
    use proptest::prelude::*;

    fn schedule() -> TaxSchedule {
        TaxSchedule::uk_2025(false)
    }

    fn scenario() -> Scenario {
        Scenario {
            no_show_rate: Decimal::new(10, 2),
            appointment_fill_rate: Decimal::new(85, 2),
            client_repeat_rate: Decimal::new(35, 1),
        }
    }

    fn costs() -> CostModel {
        CostModel::default()
    }

    fn service(price: Decimal, popularity: Decimal) -> Service {
        Service {
            name: "Massage 30m".to_string(),
            duration_min: 30,
            price,
            popularity,
        }
    }

    fn clinic() -> Clinic {
        Clinic {
            name: "Vista Clinic".to_string(),
            days: vec![Weekday::Mon],
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            close: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            rent: RentTerm {
                amount: Decimal::from(65),
                period: RentPeriod::Weekly,
            },
            weekly_fixed_cost: Decimal::from(5),
            weekly_patients: 3,
            services: vec![service(Decimal::from(40), Decimal::ONE)],
        }
    }

    #[test]
    fn tax_zero_profit_is_all_zero() {
        let t = compute_tax(Decimal::ZERO, &schedule(), 48);
        assert_eq!(t.income_tax, Decimal::ZERO);
        assert_eq!(t.profit_contribution, Decimal::ZERO);
        assert_eq!(t.flat_contribution, Decimal::ZERO);
        assert_eq!(t.total_tax, Decimal::ZERO);
        assert_eq!(t.net_profit, Decimal::ZERO);
        assert_eq!(t.net_margin_pct, Decimal::ZERO);
    }

    #[test]
    fn tax_loss_is_not_a_refund() {
        let t = compute_tax(Decimal::from(-5_000), &schedule(), 48);
        assert_eq!(t.total_tax, Decimal::ZERO);
        assert_eq!(t.net_profit, Decimal::from(-5_000));
        assert_eq!(t.net_margin_pct, Decimal::ZERO);
    }

    #[test]
    fn tax_basic_band_worked_example() {
        // 20,000 profit: income tax (20000-12570)*0.20, contribution
        // (min(20000, 50270)-12570)*0.06, no higher bands touched.
        let t = compute_tax(Decimal::from(20_000), &schedule(), 48);
        assert_eq!(t.income_tax, Decimal::new(1_486_00, 2));
        assert_eq!(t.profit_contribution, Decimal::new(445_80, 2));
        assert_eq!(t.flat_contribution, Decimal::ZERO);
        assert_eq!(t.total_tax, Decimal::new(1_931_80, 2));
        assert_eq!(t.net_profit, Decimal::new(18_068_20, 2));
    }

    #[test]
    fn tax_crosses_every_band() {
        // 150,000 profit: taxable 137,430 spans all three income bands;
        // contribution hits the 2% band above 50,270.
        let t = compute_tax(Decimal::from(150_000), &schedule(), 48);
        assert_eq!(t.income_tax, Decimal::new(48_675_00, 2));
        assert_eq!(t.profit_contribution, Decimal::new(4_256_60, 2));
    }

    #[test]
    fn flat_contribution_gating() {
        let opted_in = TaxSchedule::uk_2025(true);
        let t = compute_tax(Decimal::from(5_000), &opted_in, 48);
        assert_eq!(t.flat_contribution, Decimal::new(168_00, 2)); // 3.50 * 48
        assert_eq!(t.income_tax, Decimal::ZERO);
        assert_eq!(t.profit_contribution, Decimal::ZERO);

        // Not opted in, or at/above the ceiling: no flat contribution.
        assert_eq!(
            compute_tax(Decimal::from(5_000), &schedule(), 48).flat_contribution,
            Decimal::ZERO
        );
        assert_eq!(
            compute_tax(Decimal::from(6_845), &opted_in, 48).flat_contribution,
            Decimal::ZERO
        );
    }

    #[test]
    fn service_worked_example() {
        // 3 patients/week * 0.25 popularity * 0.9 attendance = 0.675 served.
        let svc = service(Decimal::from(40), Decimal::new(25, 2));
        let r = service_result(&svc, Decimal::from(3), &scenario(), &costs());
        assert_eq!(r.patients_per_week, Decimal::new(675, 3));
        assert_eq!(r.annual_revenue, Decimal::new(1_296_00, 2));
        // payment 1296*0.0175 + 0.675*48*0.20 = 29.16; consumables 32.40
        assert_eq!(r.variable_cost, Decimal::new(61_56, 2));
        assert_eq!(r.profit, Decimal::new(1_234_44, 2));
        assert_eq!(r.revenue_per_hour, Decimal::from(80));
        assert_eq!(r.profit_per_hour, Decimal::new(76_20, 2));
        // revenue per client reduces to price * repeat rate.
        assert_eq!(r.revenue_per_client, Decimal::from(140));
    }

    #[test]
    fn dormant_service_rates_are_zero() {
        let svc = service(Decimal::from(40), Decimal::ZERO);
        let r = service_result(&svc, Decimal::from(10), &scenario(), &costs());
        assert_eq!(r.patients_per_week, Decimal::ZERO);
        assert_eq!(r.annual_revenue, Decimal::ZERO);
        assert_eq!(r.profit_per_hour, Decimal::ZERO);
        assert_eq!(r.revenue_per_hour, Decimal::ZERO);
        assert_eq!(r.revenue_per_client, Decimal::ZERO);
    }

    #[test]
    fn rent_normalizes_per_period() {
        let mut c = clinic();
        c.days = vec![Weekday::Mon, Weekday::Tue];
        c.rent.period = RentPeriod::Weekly;
        c.rent.amount = Decimal::from(65);
        assert_eq!(weekly_rent(&c, 48), Decimal::from(65));
        c.rent.period = RentPeriod::Daily;
        c.rent.amount = Decimal::from(30);
        assert_eq!(weekly_rent(&c, 48), Decimal::from(60));
        c.rent.period = RentPeriod::Annual;
        c.rent.amount = Decimal::from(4_800);
        assert_eq!(weekly_rent(&c, 48), Decimal::from(100));
    }

    #[test]
    fn weekly_hours_from_window_and_days() {
        let mut c = clinic();
        c.open = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
        c.close = NaiveTime::from_hms_opt(20, 0, 0).unwrap();
        c.days = vec![Weekday::Wed, Weekday::Thu];
        assert_eq!(weekly_hours(&c), Decimal::from(21));
    }

    #[test]
    fn utilization_and_capacity() {
        // 3 patients * 0.9 attendance * 0.5h = 1.35 booked hours;
        // available 10h * 0.85 = 8.5; utilization 1.35/8.5*100.
        let report = clinic_report(&clinic(), 3, &scenario(), &costs(), &schedule());
        let s = &report.summary;
        assert_eq!(s.weekly_hours_booked, Decimal::new(135, 2));
        assert_eq!(s.weekly_hours_available, Decimal::new(850, 2));
        assert_eq!(
            s.utilization_pct,
            s.weekly_hours_booked / s.weekly_hours_available * Decimal::from(100)
        );
        assert_eq!(s.capacity, CapacityStatus::Ok);
    }

    #[test]
    fn overbooked_when_demand_exceeds_available() {
        let mut sc = scenario();
        sc.appointment_fill_rate = Decimal::new(5, 2); // 0.5h available
        let report = clinic_report(&clinic(), 3, &sc, &costs(), &schedule());
        assert_eq!(report.summary.capacity, CapacityStatus::Overbooked);
        assert!(report.summary.weekly_hours_booked > report.summary.weekly_hours_available);
    }

    #[test]
    fn break_even_finite_case() {
        // Strip variable costs so the unit margin is exactly the price:
        // weekly fixed 70 / margin 40 = 1.75 patients.
        let mut c = clinic();
        let mut cm = costs();
        cm.payment_fee_percent = Decimal::ZERO;
        cm.payment_fee_fixed = Decimal::ZERO;
        cm.consumable_cost_per_patient = Decimal::ZERO;
        let mut sc = scenario();
        sc.no_show_rate = Decimal::ZERO;
        c.services = vec![service(Decimal::from(40), Decimal::ONE)];
        let report = clinic_report(&c, 3, &sc, &cm, &schedule());
        assert_eq!(
            report.summary.break_even,
            BreakEven::Patients(Decimal::new(175, 2))
        );
    }

    #[test]
    fn break_even_unbounded_on_nonpositive_margin() {
        // Free service with a per-patient consumable: margin is negative.
        let mut c = clinic();
        c.services = vec![service(Decimal::ZERO, Decimal::ONE)];
        let report = clinic_report(&c, 3, &scenario(), &costs(), &schedule());
        assert!(report.summary.break_even.is_unbounded());
        // Zero weekly volume can never break even either.
        let report = clinic_report(&clinic(), 0, &scenario(), &costs(), &schedule());
        assert!(report.summary.break_even.is_unbounded());
    }

    #[test]
    fn growth_year_one_is_the_base() {
        let mut g = GrowthProjection::new(
            Decimal::from(10_000),
            Decimal::from(2_000),
            default_growth_rate(),
            DEFAULT_GROWTH_HORIZON,
        );
        let first = g.next().unwrap();
        assert_eq!(first.year, 1);
        assert_eq!(first.projected_revenue, Decimal::from(10_000));
        assert_eq!(first.projected_profit, Decimal::from(2_000));
    }

    #[test]
    fn growth_compounds_and_restarts() {
        let g = GrowthProjection::new(
            Decimal::from(10_000),
            Decimal::from(2_000),
            default_growth_rate(),
            DEFAULT_GROWTH_HORIZON,
        );
        let years: Vec<GrowthYear> = g.clone().collect();
        assert_eq!(years.len(), 5);
        // Year 3 = base * 1.05^2.
        assert_eq!(years[2].projected_revenue, Decimal::new(11_025_00, 2));
        // Restartable: a clone replays the identical sequence.
        let again: Vec<GrowthYear> = g.collect();
        assert_eq!(again, years);
    }

    #[test]
    fn cash_flow_accumulates_to_net_profit() {
        let entries = cash_flow(Decimal::from(1_200));
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[0].cumulative_cash, Decimal::from(100));
        assert_eq!(entries[11].cumulative_cash, Decimal::from(1_200));
        for w in entries.windows(2) {
            assert!(w[1].cumulative_cash > w[0].cumulative_cash);
        }
    }

    #[test]
    fn cash_flow_rounding_stays_tiny() {
        let net = Decimal::from(100);
        let entries = cash_flow(net);
        let drift = (entries[11].cumulative_cash - net).abs();
        assert!(drift < Decimal::new(1, 6));
    }

    #[test]
    fn zero_price_adjustment_reproduces_base_summary() {
        let c = clinic();
        let base = clinic_report(&c, 3, &scenario(), &costs(), &schedule()).summary;
        let points = price_sensitivity(
            &c,
            3,
            &scenario(),
            &costs(),
            &schedule(),
            &default_price_adjustments(),
        );
        assert_eq!(points.len(), 3);
        assert_eq!(points[1].adjustment, Decimal::ZERO);
        assert_eq!(points[1].summary, base);
        assert!(points[0].summary.annual_revenue < base.annual_revenue);
        assert!(points[2].summary.annual_revenue > base.annual_revenue);
    }

    #[test]
    fn price_sweep_leaves_catalogue_untouched() {
        let c = clinic();
        let before = c.clone();
        let _ = price_sensitivity(
            &c,
            3,
            &scenario(),
            &costs(),
            &schedule(),
            &default_price_adjustments(),
        );
        assert_eq!(c, before);
    }

    proptest! {
        #[test]
        fn profit_identity_and_nonnegative_variable_cost(
            total in 0u32..200,
            price_pence in 0i64..50_000,
            pop_pct in 0i64..=100,
            no_show_pct in 0i64..=100,
        ) {
            let svc = service(Decimal::new(price_pence, 2), Decimal::new(pop_pct, 2));
            let sc = Scenario {
                no_show_rate: Decimal::new(no_show_pct, 2),
                appointment_fill_rate: Decimal::new(85, 2),
                client_repeat_rate: Decimal::new(35, 1),
            };
            let r = service_result(&svc, Decimal::from(total), &sc, &costs());
            prop_assert!(r.variable_cost >= Decimal::ZERO);
            prop_assert_eq!(r.profit, r.annual_revenue - r.variable_cost);
            prop_assert!(r.annual_revenue >= Decimal::ZERO);
            prop_assert!(r.patients_per_week >= Decimal::ZERO);
        }

        #[test]
        fn tax_never_exceeds_profit(profit in 0i64..500_000) {
            let t = compute_tax(Decimal::from(profit), &schedule(), 48);
            prop_assert!(t.total_tax >= Decimal::ZERO);
            prop_assert!(t.total_tax <= Decimal::from(profit));
            prop_assert_eq!(t.net_profit, Decimal::from(profit) - t.total_tax);
        }

        #[test]
        fn tax_is_monotonic_in_profit(lo in 0i64..250_000, delta in 0i64..250_000) {
            let t_lo = compute_tax(Decimal::from(lo), &schedule(), 48);
            let t_hi = compute_tax(Decimal::from(lo + delta), &schedule(), 48);
            prop_assert!(t_hi.total_tax >= t_lo.total_tax);
            prop_assert!(t_hi.net_profit >= t_lo.net_profit);
        }
    }
}
