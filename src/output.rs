use crate::error::Result;
use crate::types::{
    CellValue, ColumnRoleMapping, CostBreakdownEntry, CostRow, Dashboard, HealthResult, KpiResult,
    KpiRow, Table, TrendPoint, TrendRow,
};
use crate::util::{format_int, format_money, format_number};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table as TextTable, Tabled};

/// Rows copied verbatim into an export.
pub const SAMPLE_ROWS: usize = 10;

/// The downloadable report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReport {
    pub generated_at: DateTime<Utc>,
    pub source: String,
    pub mapping: ColumnRoleMapping,
    pub kpis: KpiResult,
    pub health: HealthResult,
    pub trend: Vec<TrendPoint>,
    pub cost_breakdown: Vec<CostBreakdownEntry>,
    /// Keys follow the table's column order.
    pub sample_rows: Vec<Map<String, Value>>,
    pub columns: Vec<String>,
}

impl ExportReport {
    pub fn new(
        source: &str,
        table: &Table,
        mapping: &ColumnRoleMapping,
        dashboard: &Dashboard,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let sample_rows: Vec<Map<String, Value>> = table
            .rows()
            .iter()
            .take(SAMPLE_ROWS)
            .map(|row| {
                table
                    .columns()
                    .iter()
                    .cloned()
                    .zip(row.iter().map(cell_json))
                    .collect()
            })
            .collect();

        Self {
            generated_at,
            source: if source.is_empty() {
                "unknown".to_string()
            } else {
                source.to_string()
            },
            mapping: mapping.clone(),
            kpis: dashboard.kpis.clone(),
            health: dashboard.health.clone(),
            trend: dashboard.trend.clone(),
            cost_breakdown: dashboard.cost_breakdown.clone(),
            sample_rows,
            columns: table.columns().to_vec(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("report_{}.json", self.generated_at.format("%Y-%m-%d"))
    }
}

fn cell_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::Null,
        CellValue::Number(n) => Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null),
        CellValue::Text(s) => Value::String(s.clone()),
    }
}

pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write `report_YYYY-MM-DD.json` into `dir` and return its path.
pub fn write_report(dir: impl AsRef<Path>, report: &ExportReport) -> Result<PathBuf> {
    let path = dir.as_ref().join(report.file_name());
    write_json(&path, report)?;
    info!("Report exported to {}", path.display());
    Ok(path)
}

pub fn read_report(path: impl AsRef<Path>) -> Result<ExportReport> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

pub fn kpi_rows(k: &KpiResult) -> Vec<KpiRow> {
    let row = |metric: &str, value: String| KpiRow {
        metric: metric.to_string(),
        value,
    };
    vec![
        row("Revenue", format_money(k.revenue)),
        row("Cost", format_money(k.cost)),
        row("Profit", format_money(k.profit)),
        row("Margin", format!("{}%", format_number(k.margin_pct, 1))),
        row("Orders", format_int(k.order_count as u64)),
        row("Avg order value", format_money(k.avg_order_value)),
        row(
            "Top product",
            if k.top_product_revenue > 0.0 {
                format!("{} ({})", k.top_product, format_money(k.top_product_revenue))
            } else {
                k.top_product.clone()
            },
        ),
    ]
}

pub fn trend_rows(trend: &[TrendPoint]) -> Vec<TrendRow> {
    trend
        .iter()
        .map(|p| TrendRow {
            date: p.bucket_label.clone(),
            revenue: format_number(p.revenue, 2),
            cost: format_number(p.cost, 2),
            profit: format_number(p.profit, 2),
        })
        .collect()
}

pub fn cost_rows(entries: &[CostBreakdownEntry]) -> Vec<CostRow> {
    entries
        .iter()
        .enumerate()
        .map(|(idx, e)| CostRow {
            rank: idx + 1,
            column: e.column_name.clone(),
            total: format_number(e.total_value, 2),
        })
        .collect()
}

pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    TextTable::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

/// Print the full dashboard to stdout.
pub fn print_dashboard(source: &str, d: &Dashboard) {
    println!("Dashboard: {}\n", source);
    preview_table_rows(&kpi_rows(&d.kpis), usize::MAX);

    println!(
        "Business health: {}/100 ({})",
        d.health.score, d.health.label
    );
    println!("{}", d.health.summary);
    for driver in &d.health.drivers {
        println!("  - {}", driver);
    }
    println!();

    if !d.kpis.warnings.is_empty() {
        println!("Warnings:");
        for w in &d.kpis.warnings {
            println!("  ! {}", w);
        }
        println!();
    }

    println!("Recommendations:");
    for (i, r) in d.kpis.recommendations.iter().enumerate() {
        println!("  {}. {}", i + 1, r);
    }
    println!();

    println!("Trend (last {} days):", d.trend.len());
    preview_table_rows(&trend_rows(&d.trend), usize::MAX);

    println!("Cost breakdown:");
    preview_table_rows(&cost_rows(&d.cost_breakdown), usize::MAX);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::analyze;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sample() -> (Table, ColumnRoleMapping) {
        let rows = (0..12)
            .map(|i| {
                vec![
                    CellValue::text(format!("2024-02-{:02}", i + 1)),
                    CellValue::text(format!("{}.37", 100 + i)),
                    CellValue::text("33.3"),
                ]
            })
            .collect();
        let table = Table::new(vec!["Date".into(), "Sales".into(), "COGS".into()], rows);
        let mapping = ColumnRoleMapping {
            revenue_column: Some("Sales".into()),
            cost_columns: vec!["COGS".into()],
            product_column: None,
            date_column: Some("Date".into()),
        };
        (table, mapping)
    }

    #[test]
    fn test_export_round_trip_preserves_kpis() {
        let (table, mapping) = sample();
        let dashboard = analyze(&table, &mapping);
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let report = ExportReport::new("sales.csv", &table, &mapping, &dashboard, at);

        let dir = TempDir::new().unwrap();
        let path = write_report(dir.path(), &report).unwrap();
        assert!(path.ends_with("report_2024-03-01.json"));

        let back = read_report(&path).unwrap();
        assert_eq!(back.kpis, dashboard.kpis);
        assert_eq!(back, report);
        assert_eq!(back.sample_rows.len(), SAMPLE_ROWS);
        assert_eq!(back.columns, vec!["Date", "Sales", "COGS"]);
    }

    #[test]
    fn test_export_uses_camel_case_keys() {
        let (table, mapping) = sample();
        let dashboard = analyze(&table, &mapping);
        let report = ExportReport::new("", &table, &mapping, &dashboard, Utc::now());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "unknown");
        assert!(json["kpis"]["marginPct"].is_number());
        assert!(json["mapping"]["costColumns"].is_array());
        assert!(json["trend"][0]["bucketLabel"].is_string());
        assert!(json["costBreakdown"][0]["totalValue"].is_number());
        assert_eq!(json["sampleRows"][0]["Sales"], "100.37");
    }

    #[test]
    fn test_sample_rows_keep_column_order() {
        let (table, mapping) = sample();
        let dashboard = analyze(&table, &mapping);
        let report = ExportReport::new("sales.csv", &table, &mapping, &dashboard, Utc::now());

        let keys: Vec<&str> = report.sample_rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Date", "Sales", "COGS"]);

        let text = serde_json::to_string(&report).unwrap();
        let back: ExportReport = serde_json::from_str(&text).unwrap();
        let keys: Vec<&str> = back.sample_rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Date", "Sales", "COGS"]);
    }

    #[test]
    fn test_sample_row_cells_keep_their_type() {
        let table = Table::new(
            vec!["Qty".into(), "Note".into(), "Blank".into()],
            vec![vec![CellValue::Number(3.5), CellValue::text("ok")]],
        );
        let mapping = ColumnRoleMapping::default();
        let dashboard = analyze(&table, &mapping);
        let report = ExportReport::new("x.xlsx", &table, &mapping, &dashboard, Utc::now());
        let row = &report.sample_rows[0];
        assert_eq!(row["Qty"], 3.5);
        assert_eq!(row["Note"], "ok");
        assert!(row["Blank"].is_null());
    }

    #[test]
    fn test_render_table_handles_empty() {
        assert_eq!(render_table::<TrendRow>(&[], 5), "(no rows)");
        let rendered = render_table(&cost_rows(&[CostBreakdownEntry {
            column_name: "Rent".into(),
            total_value: 1500.0,
        }]), 5);
        assert!(rendered.contains("Rent"));
        assert!(rendered.contains("1,500.00"));
    }
}
