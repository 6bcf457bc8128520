use crate::models::LineItemId;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Every Basis collection endpoint wraps its results in `data`.
#[derive(Debug, Deserialize)]
pub(super) struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    pub(super) data: Vec<T>,
}

// GET /campaigns/{id}/line_items
#[derive(Debug, Clone, Deserialize)]
pub struct BasisLineItem {
    pub id: Option<LineItemId>,
    pub name: Option<String>,
}

// GET /stats/line_item?campaign_id={id}
// Only the fields the pacing report consumes are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasisStatsRecord {
    pub line_item_id: Option<LineItemId>,
    pub data_through_date: Option<String>,
    pub delivery_metrics: Option<DeliveryMetrics>,
    pub performance_metrics: Option<PerformanceMetrics>,
}

// Metric values that cannot be read as a number are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryMetrics {
    #[serde(default, deserialize_with = "count")]
    pub delivered_impressions: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub delivered_clicks: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub delivered_viewable_impressions: Option<u64>,
    #[serde(default, deserialize_with = "count")]
    pub delivered_measurable_impressions: Option<u64>,
    #[serde(default, deserialize_with = "amount")]
    pub total_spend: Option<Decimal>,
    #[serde(default, deserialize_with = "count")]
    pub auctions_won: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(default, deserialize_with = "ratio")]
    pub pacing_pct_spend: Option<f64>,
    #[serde(default, deserialize_with = "ratio")]
    pub click_through_rate: Option<f64>,
}

fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Non-negative whole numbers, including `12.0` and `"12"`.
fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match &value {
        Value::Number(n) if n.is_u64() => n.as_u64(),
        other => numeric(other)
            .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
            .map(|n| n as u64),
    }))
}

fn ratio<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(numeric))
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match &value {
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) => s.trim().parse::<Decimal>().ok(),
        _ => None,
    }))
}
