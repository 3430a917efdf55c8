//! Rule-based business health score.
//!
//! Starts from a neutral 50 and applies one adjustment per rule group
//! (profit, margin, cost ratio, volume, average order value). Each
//! adjustment that fires also records a short driver explaining it.

use crate::reports::NO_PRODUCT;
use crate::types::{HealthLabel, HealthResult, KpiResult};

const BASE_SCORE: i32 = 50;
const MAX_DRIVERS: usize = 4;

pub fn compute_health(k: &KpiResult) -> HealthResult {
    let margin = k.margin_pct;
    let cost_ratio = if k.revenue > 0.0 {
        k.cost / k.revenue
    } else {
        1.0
    };
    let aov = k.avg_order_value;

    let mut score = BASE_SCORE;
    let mut drivers: Vec<String> = Vec::new();
    let mut apply = |delta: i32, driver: &str| {
        score += delta;
        drivers.push(driver.to_string());
    };

    if k.profit < 0.0 {
        apply(-30, "Negative profit (loss).");
    } else {
        apply(20, "Positive profit.");
    }

    if margin < 0.0 {
        apply(-10, "Negative margin.");
    } else if margin < 10.0 {
        apply(-10, "Thin margin (<10%).");
    } else if margin < 25.0 {
        apply(5, "Healthy margin (10–25%).");
    } else {
        apply(15, "Strong margin (25%+).");
    }

    if cost_ratio > 0.95 {
        apply(-15, "Costs consuming most revenue.");
    } else if cost_ratio > 0.8 {
        apply(-5, "Costs relatively high.");
    } else if cost_ratio < 0.6 {
        apply(10, "Costs well-controlled.");
    }

    if k.order_count >= 200 {
        apply(5, "Sufficient volume.");
    } else if k.order_count < 20 {
        apply(-5, "Low volume (noisy).");
    }

    if aov > 0.0 && aov < 20.0 {
        apply(-3, "Low AOV.");
    } else if aov >= 100.0 {
        apply(3, "High AOV.");
    }

    let score = score.clamp(0, 100) as u8;
    drivers.truncate(MAX_DRIVERS);

    HealthResult {
        score,
        label: label_for(score),
        summary: summarize(k),
        drivers,
    }
}

pub fn label_for(score: u8) -> HealthLabel {
    match score {
        0..=34 => HealthLabel::Critical,
        35..=54 => HealthLabel::AtRisk,
        55..=74 => HealthLabel::Stable,
        _ => HealthLabel::Growing,
    }
}

fn summarize(k: &KpiResult) -> String {
    let mut parts: Vec<String> = Vec::new();
    if k.profit < 0.0 {
        parts.push("Business is currently operating at a loss.".into());
        parts.push("Main priority: reduce the largest costs and protect margin.".into());
    } else {
        parts.push("Business is profitable.".into());
        if k.margin_pct < 10.0 {
            parts.push("However, margin is thin, so small cost increases can flip profit.".into());
        } else {
            parts.push("Margin looks healthy, so you can scale the best-performing channels.".into());
        }
    }
    if k.top_product != NO_PRODUCT {
        parts.push(format!(
            "Top product: \"{}\" (focus inventory & promotion).",
            k.top_product
        ));
    }
    parts.join(" ")
}
