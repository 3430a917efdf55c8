use crate::health::compute_health;
use crate::types::{
    CellValue, ColumnRoleMapping, CostBreakdownEntry, Dashboard, KpiResult, Table, TrendPoint,
};
use crate::util::{parse_date, parse_number};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Most recent buckets kept in a trend series.
pub const TREND_WINDOW: usize = 30;

pub const NO_PRODUCT: &str = "N/A";

pub const WARN_NO_REVENUE: &str = "Revenue column is not selected. Revenue assumed as 0.";
pub const WARN_NO_COST: &str =
    "No cost columns selected. Cost assumed as 0 (profit may look inflated).";

const REC_ZERO_REVENUE: &str = "Revenue is 0 (or revenue column not selected). Select the correct revenue column or check your data.";
const REC_LOSS: [&str; 3] = [
    "You’re operating at a loss. Identify the largest expense categories and cut non-essential spend.",
    "Focus on your most profitable offers; pause low-margin products/services.",
    "Avoid heavy discounting unless you can keep margins positive.",
];
const REC_GROWTH: [&str; 2] = [
    "You’re profitable. Reinvest in the best ROI channels and monitor cost growth weekly.",
    "Increase average order value via bundles, upsells, or minimum-order incentives.",
];
const REC_THIN_MARGIN: &str = "Margin is thin (<10%). Consider pricing adjustments, supplier negotiation, or reducing variable costs.";

/// Run the whole derivation for one table and mapping.
pub fn analyze(table: &Table, mapping: &ColumnRoleMapping) -> Dashboard {
    let kpis = compute_kpis(table, mapping);
    let health = compute_health(&kpis);
    Dashboard {
        trend: group_trend(table, mapping),
        cost_breakdown: cost_breakdown(table, mapping),
        kpis,
        health,
    }
}

pub fn compute_kpis(table: &Table, mapping: &ColumnRoleMapping) -> KpiResult {
    // Per-product revenue in first-seen order so ties go to the earliest.
    #[derive(Default)]
    struct ProductAcc {
        order: Vec<(String, f64)>,
        index: HashMap<String, usize>,
    }

    let resolved = mapping.resolve(table);
    let order_count = table.row_count();

    let mut warnings = Vec::new();
    if resolved.revenue.is_none() {
        warnings.push(WARN_NO_REVENUE.to_string());
    }
    if resolved.costs.is_empty() {
        warnings.push(WARN_NO_COST.to_string());
    }

    let mut revenue = 0.0;
    let mut cost = 0.0;
    let mut products = ProductAcc::default();

    for row in table.rows() {
        let r = resolved.revenue.map(|i| parse_number(&row[i])).unwrap_or(0.0);
        revenue += r;

        let row_cost: f64 = resolved
            .costs
            .iter()
            .map(|(_, i)| parse_number(&row[*i]))
            .sum();
        cost += row_cost;

        if let Some(p) = resolved.product {
            let key = product_key(&row[p]);
            match products.index.get(&key) {
                Some(&slot) => products.order[slot].1 += r,
                None => {
                    products.index.insert(key.clone(), products.order.len());
                    products.order.push((key, r));
                }
            }
        }
    }

    let profit = revenue - cost;
    let margin_pct = if revenue > 0.0 {
        (profit / revenue) * 100.0
    } else {
        0.0
    };
    let avg_order_value = if order_count > 0 {
        revenue / order_count as f64
    } else {
        0.0
    };

    let mut top_product = NO_PRODUCT.to_string();
    let mut top_product_revenue = 0.0;
    for (name, rev) in products.order {
        if rev > top_product_revenue {
            top_product_revenue = rev;
            top_product = name;
        }
    }

    let mut recommendations: Vec<String> = Vec::new();
    if revenue == 0.0 {
        recommendations.push(REC_ZERO_REVENUE.to_string());
    } else if profit < 0.0 {
        recommendations.extend(REC_LOSS.iter().map(|s| s.to_string()));
    } else {
        recommendations.extend(REC_GROWTH.iter().map(|s| s.to_string()));
    }
    if margin_pct > 0.0 && margin_pct < 10.0 {
        recommendations.push(REC_THIN_MARGIN.to_string());
    }
    if top_product != NO_PRODUCT {
        recommendations.push(format!(
            "Top product is \"{}\". Prevent stockouts and consider promoting it more.",
            top_product
        ));
    }

    KpiResult {
        revenue,
        cost,
        profit,
        margin_pct,
        order_count,
        avg_order_value,
        top_product,
        top_product_revenue,
        warnings,
        recommendations,
    }
}

fn product_key(cell: &CellValue) -> String {
    let s = cell.to_string();
    let s = s.trim();
    if s.is_empty() {
        "Unknown".to_string()
    } else {
        s.to_string()
    }
}

/// Daily revenue/cost/profit series, oldest first, capped at `TREND_WINDOW`.
///
/// Rows without a readable date are skipped here but still count towards the
/// KPI totals.
pub fn group_trend(table: &Table, mapping: &ColumnRoleMapping) -> Vec<TrendPoint> {
    #[derive(Default)]
    struct Acc {
        revenue: f64,
        cost: f64,
    }

    let resolved = mapping.resolve(table);
    let (Some(date_idx), Some(rev_idx)) = (resolved.date, resolved.revenue) else {
        return Vec::new();
    };
    if table.is_empty() {
        return Vec::new();
    }

    let mut buckets: BTreeMap<NaiveDate, Acc> = BTreeMap::new();
    for row in table.rows() {
        let Some(day) = parse_date(&row[date_idx]) else {
            continue;
        };
        let e = buckets.entry(day).or_default();
        e.revenue += parse_number(&row[rev_idx]);
        e.cost += resolved
            .costs
            .iter()
            .map(|(_, i)| parse_number(&row[*i]))
            .sum::<f64>();
    }

    let skip = buckets.len().saturating_sub(TREND_WINDOW);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(day, acc)| TrendPoint {
            bucket_label: day.format("%Y-%m-%d").to_string(),
            revenue: acc.revenue,
            cost: acc.cost,
            profit: acc.revenue - acc.cost,
        })
        .collect()
}

/// Column totals for every selected cost column, largest first.
pub fn cost_breakdown(table: &Table, mapping: &ColumnRoleMapping) -> Vec<CostBreakdownEntry> {
    let resolved = mapping.resolve(table);
    let mut entries: Vec<CostBreakdownEntry> = resolved
        .costs
        .iter()
        .map(|(name, idx)| CostBreakdownEntry {
            column_name: name.clone(),
            total_value: table.rows().iter().map(|r| parse_number(&r[*idx])).sum(),
        })
        .collect();
    // `sort_by` is stable, so equal totals keep the mapping order.
    entries.sort_by(|a, b| {
        b.total_value
            .partial_cmp(&a.total_value)
            .unwrap_or(Ordering::Equal)
    });
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| CellValue::text(*c)).collect())
                .collect(),
        )
    }

    fn mapping(revenue: &str, costs: &[&str], product: Option<&str>, date: Option<&str>) -> ColumnRoleMapping {
        ColumnRoleMapping {
            revenue_column: Some(revenue.to_string()),
            cost_columns: costs.iter().map(|s| s.to_string()).collect(),
            product_column: product.map(str::to_string),
            date_column: date.map(str::to_string),
        }
    }

    #[test]
    fn test_kpis_profitable_with_top_product() {
        let t = table(
            &["Product", "Revenue", "COGS", "Fees"],
            &[
                &["Latte", "100", "30", "5"],
                &["Bagel", "50", "20", "5"],
                &["Latte", "100", "30", "5"],
            ],
        );
        let k = compute_kpis(&t, &mapping("Revenue", &["COGS", "Fees"], Some("Product"), None));
        assert_eq!(k.revenue, 250.0);
        assert_eq!(k.cost, 95.0);
        assert_eq!(k.profit, 155.0);
        assert!((k.margin_pct - 62.0).abs() < 1e-9);
        assert_eq!(k.order_count, 3);
        assert!((k.avg_order_value - 250.0 / 3.0).abs() < 1e-9);
        assert_eq!(k.top_product, "Latte");
        assert_eq!(k.top_product_revenue, 200.0);
        assert!(k.warnings.is_empty());
        assert_eq!(k.recommendations.len(), 3);
        assert_eq!(k.recommendations[0], REC_GROWTH[0]);
        assert!(k.recommendations[0].starts_with("You\u{2019}re profitable."));
        assert!(k.recommendations[2].contains("\"Latte\""));
    }

    #[test]
    fn test_kpis_loss_with_thin_margin_rules() {
        let t = table(&["Revenue", "Cost"], &[&["100", "130"]]);
        let k = compute_kpis(&t, &mapping("Revenue", &["Cost"], None, None));
        assert_eq!(k.profit, -30.0);
        assert_eq!(k.top_product, NO_PRODUCT);
        assert_eq!(k.recommendations, REC_LOSS.iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert!(k.recommendations[0].starts_with("You\u{2019}re operating at a loss."));

        let t = table(&["Revenue", "Cost"], &[&["100", "95"]]);
        let k = compute_kpis(&t, &mapping("Revenue", &["Cost"], None, None));
        assert_eq!(k.recommendations.len(), 3);
        assert_eq!(k.recommendations[2], REC_THIN_MARGIN);
    }

    #[test]
    fn test_kpis_without_mapping_warns_and_zeroes() {
        let t = table(&["a", "b"], &[&["1", "2"], &["3", "4"]]);
        let k = compute_kpis(&t, &ColumnRoleMapping::default());
        assert_eq!(k.revenue, 0.0);
        assert_eq!(k.margin_pct, 0.0);
        assert_eq!(k.avg_order_value, 0.0);
        assert_eq!(k.warnings, vec![WARN_NO_REVENUE, WARN_NO_COST]);
        assert_eq!(k.recommendations, vec![REC_ZERO_REVENUE]);
    }

    #[test]
    fn test_margin_zero_when_revenue_not_positive() {
        let t = table(&["Revenue", "Cost"], &[&["-50", "10"]]);
        let k = compute_kpis(&t, &mapping("Revenue", &["Cost"], None, None));
        assert_eq!(k.margin_pct, 0.0);
        assert_eq!(k.profit, k.revenue - k.cost);
    }

    #[test]
    fn test_empty_table_has_zero_aov() {
        let t = table(&["Revenue"], &[]);
        let k = compute_kpis(&t, &mapping("Revenue", &[], None, None));
        assert_eq!(k.order_count, 0);
        assert_eq!(k.avg_order_value, 0.0);
    }

    #[test]
    fn test_top_product_tie_keeps_first_seen_and_blank_is_unknown() {
        let t = table(
            &["Item", "Revenue"],
            &[&["B", "10"], &["A", "10"], &["", "15"]],
        );
        let k = compute_kpis(&t, &mapping("Revenue", &[], Some("Item"), None));
        assert_eq!(k.top_product, "Unknown");

        let t = table(&["Item", "Revenue"], &[&["B", "10"], &["A", "10"]]);
        let k = compute_kpis(&t, &mapping("Revenue", &[], Some("Item"), None));
        assert_eq!(k.top_product, "B");
    }

    #[test]
    fn test_compute_kpis_is_idempotent() {
        let t = table(
            &["Product", "Revenue", "Cost"],
            &[&["x", "1.1", "0.3"], &["y", "2,2", "0.7"], &["x", "3.3", "1,1"]],
        );
        let m = mapping("Revenue", &["Cost"], Some("Product"), None);
        assert_eq!(compute_kpis(&t, &m), compute_kpis(&t, &m));
    }

    #[test]
    fn test_trend_merges_same_day_and_drops_undated() {
        let t = table(
            &["Date", "Revenue", "Cost"],
            &[
                &["2024-01-02", "10", "4"],
                &["2024-01-01", "5", "1"],
                &["02.01.2024", "20", "6"],
                &["not a date", "1000", "0"],
            ],
        );
        let trend = group_trend(&t, &mapping("Revenue", &["Cost"], None, Some("Date")));
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].bucket_label, "2024-01-01");
        assert_eq!(trend[1].bucket_label, "2024-01-02");
        assert_eq!(trend[1].revenue, 30.0);
        assert_eq!(trend[1].cost, 10.0);
        assert_eq!(trend[1].profit, 20.0);
    }

    #[test]
    fn test_trend_requires_date_and_revenue() {
        let t = table(&["Date", "Revenue"], &[&["2024-01-01", "1"]]);
        let mut m = mapping("Revenue", &[], None, None);
        assert!(group_trend(&t, &m).is_empty());
        m.date_column = Some("Date".into());
        m.revenue_column = None;
        assert!(group_trend(&t, &m).is_empty());
    }

    #[test]
    fn test_trend_keeps_last_thirty_days() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<Vec<CellValue>> = (0..35)
            .map(|i| {
                let day = start + chrono::Days::new(i);
                vec![
                    CellValue::text(day.format("%Y-%m-%d").to_string()),
                    CellValue::Number(i as f64),
                ]
            })
            .collect();
        let t = Table::new(vec!["Date".into(), "Revenue".into()], rows);
        let trend = group_trend(&t, &mapping("Revenue", &[], None, Some("Date")));
        assert_eq!(trend.len(), TREND_WINDOW);
        assert_eq!(trend[0].bucket_label, "2024-01-06");
        assert_eq!(trend[29].bucket_label, "2024-02-04");
    }

    #[test]
    fn test_cost_breakdown_sorted_desc_stable() {
        let t = table(
            &["Rent", "COGS", "Fees", "Tax"],
            &[&["10", "50", "5", "5"], &["10", "50", "5", "5"]],
        );
        let b = cost_breakdown(&t, &mapping("x", &["Fees", "Rent", "COGS", "Tax"], None, None));
        let names: Vec<&str> = b.iter().map(|e| e.column_name.as_str()).collect();
        assert_eq!(names, vec!["COGS", "Rent", "Fees", "Tax"]);
        assert_eq!(b[0].total_value, 100.0);
    }

    #[test]
    fn test_analyze_bundles_everything() {
        let t = table(&["Date", "Revenue", "Cost"], &[&["2024-05-01", "100", "40"]]);
        let d = analyze(&t, &mapping("Revenue", &["Cost"], None, Some("Date")));
        assert_eq!(d.kpis.profit, 60.0);
        assert_eq!(d.trend.len(), 1);
        assert_eq!(d.cost_breakdown.len(), 1);
        assert_eq!(d.health, compute_health(&d.kpis));
    }
}
