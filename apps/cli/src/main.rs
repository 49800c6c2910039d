#![deny(warnings)]

//! Headless CLI for the clinic profitability engine.
//!
//! Lists scenarios, runs one against the built-in or a YAML-supplied
//! configuration, and prints the result tables (or dumps them as JSON for
//! downstream export tooling).

use anyhow::{anyhow, Result};
use clinic_core::{PracticeConfig, ScenarioRegistry, TaxSchedule};
use clinic_econ::{BreakEven, CapacityStatus};
use clinic_runtime::{Overrides, ResultBundle, ScenarioEngine};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    scenario: Option<String>,
    config_path: Option<String>,
    overrides: Overrides,
    list: bool,
    json: bool,
    flat_contribution: bool,
}

fn parse_override(spec: &str) -> Result<(String, u32)> {
    let (clinic, count) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("override must look like 'Clinic Name=12', got {spec:?}"))?;
    let count: u32 = count
        .trim()
        .parse()
        .map_err(|_| anyhow!("override patient count must be a whole number, got {count:?}"))?;
    Ok((clinic.trim().to_string(), count))
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--config" => args.config_path = it.next(),
            "--override" => {
                let spec = it
                    .next()
                    .ok_or_else(|| anyhow!("--override needs a 'Clinic Name=12' argument"))?;
                let (clinic, count) = parse_override(&spec)?;
                args.overrides.insert(clinic, count);
            }
            "--list" => args.list = true,
            "--json" => args.json = true,
            "--flat-contribution" => args.flat_contribution = true,
            other => return Err(anyhow!("unknown argument {other:?}")),
        }
    }
    Ok(args)
}

fn money(v: Decimal) -> Decimal {
    v.round_dp(2)
}

fn print_bundle(bundle: &ResultBundle) {
    println!("Scenario: {}\n", bundle.scenario);

    println!("== Clinic summaries ==");
    for s in &bundle.summary {
        let capacity = match s.capacity {
            CapacityStatus::Ok => "OK",
            CapacityStatus::Overbooked => "OVERBOOKED",
        };
        let break_even = match s.break_even {
            BreakEven::Patients(p) => format!("{}", p.round_dp(2)),
            BreakEven::Unbounded => "unbounded".to_string(),
        };
        println!(
            "{} | revenue: {} | variable: {} | fixed: {} | gross: {} | tax: {} | net: {} ({}%)",
            s.clinic,
            money(s.annual_revenue),
            money(s.variable_costs),
            money(s.fixed_costs),
            money(s.gross_profit),
            money(s.tax.total_tax),
            money(s.tax.net_profit),
            s.tax.net_margin_pct.round_dp(1),
        );
        println!(
            "    hours booked/available: {}/{} | utilization: {}% | capacity: {} | break-even patients/week: {}",
            s.weekly_hours_booked.round_dp(2),
            s.weekly_hours_available.round_dp(2),
            s.utilization_pct.round_dp(1),
            capacity,
            break_even,
        );
    }

    println!("\n== Services ==");
    for row in &bundle.services {
        println!(
            "{} | {} | patients/wk: {} | revenue: {} | profit: {} | profit/hr: {}",
            row.clinic,
            row.result.service,
            row.result.patients_per_week.round_dp(2),
            money(row.result.annual_revenue),
            money(row.result.profit),
            money(row.result.profit_per_hour),
        );
    }

    println!("\n== Growth projection ==");
    for row in &bundle.growth {
        println!(
            "{} | Year {} | revenue: {} | profit: {}",
            row.clinic,
            row.year.year,
            money(row.year.projected_revenue),
            money(row.year.projected_profit),
        );
    }

    println!("\n== Cash flow ==");
    for row in &bundle.cash_flow {
        println!(
            "{} | Month {} | cumulative: {}",
            row.clinic,
            row.entry.month,
            money(row.entry.cumulative_cash),
        );
    }

    println!("\n== Price sensitivity ==");
    for row in &bundle.price_sensitivity {
        println!(
            "{} | {}% | revenue: {} | net profit: {}",
            row.clinic,
            (row.adjustment * Decimal::from(100)).normalize(),
            money(row.annual_revenue),
            money(row.net_profit),
        );
    }
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(scenario = ?args.scenario, config = ?args.config_path, "starting CLI");

    let config = match &args.config_path {
        Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        None => PracticeConfig::builtin(),
    };
    let engine = ScenarioEngine::new(
        config,
        ScenarioRegistry::builtin(),
        TaxSchedule::uk_2025(args.flat_contribution),
    )?;

    if args.list {
        for name in engine.scenario_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let scenario = args.scenario.ok_or_else(|| {
        anyhow!(
            "usage: cli --scenario <name> [--config <file.yaml>] [--override 'Clinic=12']... \
             [--json] [--flat-contribution] | --list"
        )
    })?;
    let bundle = engine.run(&scenario, &args.overrides)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
    } else {
        print_bundle(&bundle);
    }
    Ok(())
}
