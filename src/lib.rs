//! # KPI Report
//!
//! Turn a small business's sales/expense spreadsheet into a one-screen KPI
//! dashboard.
//!
//! ## Core Concepts
//!
//! - **Table**: raw rows from a CSV, an Excel sheet or a published Google Sheet
//! - **Column mapping**: which columns hold revenue, costs, product and date,
//!   suggested from header names and editable by the user
//! - **Dashboard**: KPIs, a 0-100 health score, a daily trend and a cost
//!   breakdown, all recomputed from the (table, mapping) pair
//!
//! ## Example
//!
//! ```rust,ignore
//! use kpi_report::*;
//!
//! let table = load_file("sales.csv")?;
//! let mut session = Session::new(Some(MappingStore::new(".kpi_report/mappings.json")));
//! session.load("sales.csv", table);
//! session.toggle_cost("Rent")?;
//!
//! let dashboard = session.dashboard().unwrap();
//! println!("{} ({})", dashboard.health.score, dashboard.health.label);
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod health;
pub mod loader;
pub mod mapper;
pub mod output;
pub mod reports;
pub mod session;
pub mod store;
pub mod types;
pub mod util;

pub use config::Settings;
pub use demo::{build_demo, build_demo_seeded, demo_session_name, DemoKind};
pub use error::{ReportError, Result};
pub use health::compute_health;
pub use loader::{fetch_sheet, fetch_sheet_with, load_file, parse_csv, sheets_csv_url, SHEETS_SOURCE_NAME};
pub use mapper::{suggest, suggest_column};
pub use output::{read_report, write_report, ExportReport};
pub use reports::{analyze, compute_kpis, cost_breakdown, group_trend};
pub use session::Session;
pub use store::{FeedbackItem, FeedbackStats, FeedbackStore, MappingStore, Vote};
pub use types::*;
pub use util::{parse_date, parse_number};
