//! Synthetic coffee-shop data for trying the dashboard without a file.
//!
//! The output is random by nature; pass a seeded RNG (see [`build_demo_seeded`])
//! when a reproducible table is needed.

use crate::types::{CellValue, Table};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::str::FromStr;

pub const DEMO_DAYS: u64 = 60;

const PRODUCTS: [&str; 5] = ["Latte", "Espresso", "Cappuccino", "Croissant", "Sandwich"];
const COLUMNS: [&str; 7] = ["Date", "Product", "Revenue", "COGS", "Marketing", "Rent", "Salary"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemoKind {
    Loss,
    Growth,
}

impl DemoKind {
    /// Source name the demo table is registered under.
    pub fn source_name(self) -> &'static str {
        match self {
            DemoKind::Loss => "demo_loss.csv",
            DemoKind::Growth => "demo_growth.csv",
        }
    }
}

impl fmt::Display for DemoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemoKind::Loss => f.write_str("loss"),
            DemoKind::Growth => f.write_str("growth"),
        }
    }
}

impl FromStr for DemoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "loss" => Ok(DemoKind::Loss),
            "growth" => Ok(DemoKind::Growth),
            _ => Err(format!("Invalid demo '{}'. Valid values: loss, growth", s)),
        }
    }
}

struct Baseline {
    revenue: f64,
    marketing: f64,
    rent: f64,
    salary: f64,
    cogs: f64,
}

impl Baseline {
    fn for_kind(kind: DemoKind) -> Self {
        match kind {
            DemoKind::Growth => Self {
                revenue: 120.0,
                marketing: 8.0,
                rent: 25.0,
                salary: 35.0,
                cogs: 35.0,
            },
            DemoKind::Loss => Self {
                revenue: 90.0,
                marketing: 18.0,
                rent: 25.0,
                salary: 45.0,
                cogs: 48.0,
            },
        }
    }
}

pub fn demo_session_name(kind: DemoKind) -> &'static str {
    kind.source_name()
}

/// One row per day for `DEMO_DAYS` days starting at `start`.
pub fn build_demo<R: Rng + ?Sized>(kind: DemoKind, start: NaiveDate, rng: &mut R) -> Table {
    let base = Baseline::for_kind(kind);
    let mut rows = Vec::with_capacity(DEMO_DAYS as usize);

    for i in 0..DEMO_DAYS {
        let day = start + Days::new(i);
        let step = i as f64;
        let trend = match kind {
            DemoKind::Growth => 1.0 + step * 0.01,
            DemoKind::Loss => 1.0 - step * 0.005,
        };
        let noise = 0.85 + rng.gen::<f64>() * 0.3;

        let revenue = (base.revenue * trend * noise).max(10.0);
        let cogs = (base.cogs * trend * (0.9 + rng.gen::<f64>() * 0.25)).max(1.0);
        let marketing = (base.marketing * (0.8 + rng.gen::<f64>() * 0.5)).max(1.0);
        let rent = base.rent;
        let salary = (base.salary * (0.95 + rng.gen::<f64>() * 0.1)).max(1.0);
        let product = PRODUCTS[rng.gen_range(0..PRODUCTS.len())];

        rows.push(vec![
            CellValue::Text(day.format("%Y-%m-%d").to_string()),
            CellValue::text(product),
            CellValue::Text(format!("{:.2}", revenue)),
            CellValue::Text(format!("{:.2}", cogs)),
            CellValue::Text(format!("{:.2}", marketing)),
            CellValue::Text(format!("{:.2}", rent)),
            CellValue::Text(format!("{:.2}", salary)),
        ]);
    }

    Table::new(COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

/// Demo table from a fixed seed, or from OS entropy when `seed` is `None`.
pub fn build_demo_seeded(kind: DemoKind, start: NaiveDate, seed: Option<u64>) -> Table {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    build_demo(kind, start, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::suggest;
    use crate::reports::compute_kpis;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_seeded_demo_is_reproducible() {
        let a = build_demo_seeded(DemoKind::Growth, start(), Some(7));
        let b = build_demo_seeded(DemoKind::Growth, start(), Some(7));
        assert_eq!(a, b);
        assert_eq!(a.row_count(), DEMO_DAYS as usize);
        assert_eq!(a.columns(), COLUMNS);
    }

    #[test]
    fn test_demo_kinds_land_on_expected_side() {
        for seed in 0..5 {
            let growth = build_demo_seeded(DemoKind::Growth, start(), Some(seed));
            let mut m = suggest(growth.columns());
            for extra in ["Marketing", "Rent", "Salary"] {
                m.toggle_cost_column(extra);
            }
            assert!(compute_kpis(&growth, &m).profit > 0.0);

            let loss = build_demo_seeded(DemoKind::Loss, start(), Some(seed));
            assert!(compute_kpis(&loss, &m).profit < 0.0);
        }
    }

    #[test]
    fn test_demo_kind_parsing() {
        assert_eq!("Growth".parse::<DemoKind>(), Ok(DemoKind::Growth));
        assert_eq!(" loss ".parse::<DemoKind>(), Ok(DemoKind::Loss));
        assert!("boom".parse::<DemoKind>().is_err());
        assert_eq!(demo_session_name(DemoKind::Loss), "demo_loss.csv");
        assert_eq!(DemoKind::Growth.to_string(), "growth");
    }
}
