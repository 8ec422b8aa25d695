use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

use udecimal::{Measurement, PrecisionConfig, Registry, ToDecimal};

// Planck length and Planck time (m, s), with their shared relative uncertainty
const PLANCK_LENGTH: &str = "1.6162766206611180522713996571396999523066990915327485055067481156347056762414493260984856521610351926821546026E-35";
const PLANCK_LENGTH_SIGMA: &str = "1.8162316130468192721471811515228257968831629054325003216549355848920345534162418161994628500970988994354638375E-40";
const PLANCK_TIME: &str = "5.3913184856075266985915958470833177274482972201146851583129156492479396404343478383918705925585199100711019308E-44";

#[derive(Debug, Serialize)]
struct Example {
    name: &'static str,
    result: Measurement,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let json = env::args().skip(1).any(|arg| arg == "--json");

    let config = PrecisionConfig::from_env().context("invalid precision configuration")?;
    info!(digits = config.digits, guard_digits = config.guard_digits, "precision configured");
    let registry = Registry::with_config(config)?;

    let examples = vec![
        Example {
            name: "independent division",
            result: independent_division(&registry)?,
        },
        Example {
            name: "correlated product",
            result: correlated_product(&registry)?,
        },
        Example {
            name: "power with covariance",
            result: power_with_covariance(&registry)?,
        },
        Example {
            name: "speed of light from Planck units",
            result: planck_ratio(&registry)?,
        },
    ];

    if json {
        println!("{}", serde_json::to_string_pretty(&examples)?);
        return Ok(());
    }

    println!("🎯 udecimal {} - uncertainty propagation", udecimal::VERSION);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Precision: {} digits ({} guard)", config.digits, config.guard_digits);

    for example in &examples {
        println!("\n📐 {}", example.name);
        println!("   value:       {}", example.result.value);
        println!("   uncertainty: {}", example.result.uncertainty);
    }

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ {} examples propagated", examples.len());

    Ok(())
}

/// (10.0 ± 0.1) / (5.0 ± 0.05), no covariance
fn independent_division(registry: &Registry) -> Result<Measurement> {
    let a = registry.quantity("10.0", "0.1")?;
    let b = registry.quantity("5.0", "0.05")?;
    let c = registry.div(a, b)?;
    Ok(registry.measurement(c)?)
}

/// (3.0 ± 0.1) · (4.0 ± 0.2) with cov = 0.015
fn correlated_product(registry: &Registry) -> Result<Measurement> {
    let x = registry.quantity("3.0", "0.1")?;
    let y = registry.quantity("4.0", "0.2")?;
    registry.set_covariance(x, y, "0.015")?;
    let z = registry.mul(x, y)?;
    Ok(registry.measurement(z)?)
}

/// (2.0 ± 0.1) ^ (3.0 ± 0.2) with cov = 0.005
fn power_with_covariance(registry: &Registry) -> Result<Measurement> {
    let a = registry.quantity("2.0", "0.1")?;
    let p = registry.quantity("3.0", "0.2")?;
    registry.set_covariance(a, p, "0.005")?;
    let y = registry.pow(a, p)?;
    Ok(registry.measurement(y)?)
}

/// l_P / t_P with full correlation; the uncertainty cancels to zero
fn planck_ratio(registry: &Registry) -> Result<Measurement> {
    let l = PLANCK_LENGTH.to_decimal()?;
    let dl = PLANCK_LENGTH_SIGMA.to_decimal()?;
    let t = PLANCK_TIME.to_decimal()?;
    let dt = &t * (&dl / &l);

    let length = registry.quantity(&l, &dl)?;
    let time = registry.quantity(&t, &dt)?;
    registry.set_covariance(length, time, &dl * &dt)?;

    let c = registry.div(length, time)?;
    Ok(registry.measurement(c)?)
}
