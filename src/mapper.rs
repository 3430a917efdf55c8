// Best-effort column role suggestion.
//
// Each role has a fixed keyword list in priority order. The suggestion is only
// a starting point; the user can always override it.
use crate::types::ColumnRoleMapping;
use crate::util::normalize_key;
use log::debug;

pub const REVENUE_CANDIDATES: [&str; 9] = [
    "revenue",
    "sales",
    "amount",
    "total",
    "price",
    "value",
    "ordertotal",
    "net",
    "income",
];

pub const COST_CANDIDATES: [&str; 12] = [
    "cost",
    "expense",
    "expenses",
    "cogs",
    "spend",
    "fees",
    "shipping",
    "delivery",
    "tax",
    "rent",
    "salary",
    "marketing",
];

pub const PRODUCT_CANDIDATES: [&str; 5] = ["product", "item", "name", "sku", "category"];

pub const DATE_CANDIDATES: [&str; 5] = ["date", "day", "timestamp", "createdat", "orderdate"];

/// Pick the column that best matches `candidates`.
///
/// An exact match on the normalized name for any candidate beats every
/// substring match. Within a pass, earlier candidates beat later ones, and
/// only then does column order decide.
pub fn suggest_column(columns: &[String], candidates: &[&str]) -> Option<String> {
    let normalized: Vec<(String, &String)> =
        columns.iter().map(|c| (normalize_key(c), c)).collect();

    for cand in candidates {
        let cn = normalize_key(cand);
        if let Some((_, raw)) = normalized.iter().find(|(n, _)| *n == cn) {
            return Some((*raw).clone());
        }
    }
    for cand in candidates {
        let cn = normalize_key(cand);
        if let Some((_, raw)) = normalized
            .iter()
            .find(|(n, _)| !n.is_empty() && (n.contains(&cn) || cn.contains(n.as_str())))
        {
            return Some((*raw).clone());
        }
    }
    None
}

/// Suggest a full role mapping for a freshly loaded column list.
///
/// Only one cost column is auto-selected; more can be toggled in by hand.
pub fn suggest(columns: &[String]) -> ColumnRoleMapping {
    let mapping = ColumnRoleMapping {
        revenue_column: suggest_column(columns, &REVENUE_CANDIDATES),
        cost_columns: suggest_column(columns, &COST_CANDIDATES)
            .into_iter()
            .collect(),
        product_column: suggest_column(columns, &PRODUCT_CANDIDATES),
        date_column: suggest_column(columns, &DATE_CANDIDATES),
    };
    debug!("Suggested column mapping: {:?}", mapping);
    mapping
}
