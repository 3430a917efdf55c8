use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// A single raw cell as it came out of the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

/// In-memory table: unique, ordered column names plus rows aligned to them.
///
/// Every row holds exactly `columns.len()` cells; short rows are padded with
/// `CellValue::Empty` and surplus cells are dropped on construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let columns = unique_headers(headers);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

// Blank headers become `__EMPTY`; repeats get `_1`, `_2`, ... appended.
fn unique_headers(headers: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for raw in headers {
        let base = if raw.trim().is_empty() {
            "__EMPTY".to_string()
        } else {
            raw
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while out.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        out.push(candidate);
    }
    out
}

/// Which table columns play which semantic role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRoleMapping {
    #[serde(default)]
    pub revenue_column: Option<String>,
    #[serde(default)]
    pub cost_columns: Vec<String>,
    #[serde(default)]
    pub product_column: Option<String>,
    #[serde(default)]
    pub date_column: Option<String>,
}

/// Mapping checked against a concrete table; stale names are dropped.
#[derive(Debug, Clone, Default)]
pub struct ResolvedMapping {
    pub revenue: Option<usize>,
    pub costs: Vec<(String, usize)>,
    pub product: Option<usize>,
    pub date: Option<usize>,
}

impl ColumnRoleMapping {
    pub fn resolve(&self, table: &Table) -> ResolvedMapping {
        let lookup = |name: &Option<String>| {
            name.as_deref()
                .filter(|n| !n.is_empty())
                .and_then(|n| table.column_index(n))
        };
        let mut costs: Vec<(String, usize)> = Vec::new();
        for name in &self.cost_columns {
            if let Some(idx) = table.column_index(name) {
                if !costs.iter().any(|(_, i)| *i == idx) {
                    costs.push((name.clone(), idx));
                }
            }
        }
        ResolvedMapping {
            revenue: lookup(&self.revenue_column),
            costs,
            product: lookup(&self.product_column),
            date: lookup(&self.date_column),
        }
    }

    /// Adds the column to the cost set, or removes it if already present.
    pub fn toggle_cost_column(&mut self, column: &str) {
        if let Some(pos) = self.cost_columns.iter().position(|c| c == column) {
            self.cost_columns.remove(pos);
        } else {
            self.cost_columns.push(column.to_string());
        }
    }

    /// Restore a previously saved mapping on top of this one.
    ///
    /// The saved cost list always wins, even when empty. Product and date win
    /// whenever present; a cleared role is saved as `Some("")`, which
    /// `resolve` treats as unset. Only an empty revenue column falls back to
    /// the current value.
    pub fn overlay(&mut self, saved: &ColumnRoleMapping) {
        if saved.revenue_column.as_deref().is_some_and(|c| !c.is_empty()) {
            self.revenue_column = saved.revenue_column.clone();
        }
        self.cost_columns = saved.cost_columns.clone();
        if saved.product_column.is_some() {
            self.product_column = saved.product_column.clone();
        }
        if saved.date_column.is_some() {
            self.date_column = saved.date_column.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub margin_pct: f64,
    pub order_count: usize,
    pub avg_order_value: f64,
    pub top_product: String,
    pub top_product_revenue: f64,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthLabel {
    Critical,
    #[serde(rename = "At-Risk")]
    AtRisk,
    Stable,
    Growing,
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthLabel::Critical => "Critical",
            HealthLabel::AtRisk => "At-Risk",
            HealthLabel::Stable => "Stable",
            HealthLabel::Growing => "Growing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResult {
    pub score: u8,
    pub label: HealthLabel,
    pub summary: String,
    pub drivers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub bucket_label: String,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdownEntry {
    pub column_name: String,
    pub total_value: f64,
}

/// Everything derived from one (table, mapping) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub kpis: KpiResult,
    pub health: HealthResult,
    pub trend: Vec<TrendPoint>,
    pub cost_breakdown: Vec<CostBreakdownEntry>,
}

#[derive(Debug, Tabled, Clone)]
pub struct KpiRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct TrendRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Revenue")]
    pub revenue: String,
    #[tabled(rename = "Cost")]
    pub cost: String,
    #[tabled(rename = "Profit")]
    pub profit: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CostRow {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "Column")]
    pub column: String,
    #[tabled(rename = "Total")]
    pub total: String,
}
