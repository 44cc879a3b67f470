use super::domain::{numeric_value, OrderId, OrderRecord, RawRecord, VisitRecord};
use serde_json::Value;

pub fn normalize_visits(records: &[RawRecord]) -> Vec<VisitRecord> {
    records
        .iter()
        .map(|record| VisitRecord {
            sales_rep: text(record, "rep_name"),
            customer_name: text(record, "shop_name").trim().to_string(),
            erp_code: text(record, "erp_code").trim().to_string(),
            time_spent: text(record, "timespent"),
        })
        .collect()
}

pub fn normalize_orders(records: &[RawRecord]) -> Vec<OrderRecord> {
    records
        .iter()
        .map(|record| OrderRecord {
            sales_rep: text(record, "sales_rep"),
            customer_name: text(record, "customer_name").trim().to_string(),
            customer_code: text(record, "customer_code").trim().to_string(),
            order_id: record.get("id").and_then(OrderId::from_value),
            order_value: record.get("balance").map(parse_balance).unwrap_or(0.0),
        })
        .collect()
}

/// Parses an order balance such as `"1,234.50"`. Missing and non-numeric balances count as
/// zero. Negative balances (credit notes, refunds) are clamped to zero as well, so order
/// values stay non-negative and a refund never reduces a rep's visit or call totals.
pub fn parse_balance(value: &Value) -> f64 {
    numeric_value(value).max(0.0)
}

fn text(record: &RawRecord, key: &str) -> String {
    match record.get(key) {
        Some(Value::String(value)) => value.clone(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}
