use super::domain::{CalledRecord, MatchSource, OrderRecord, ReconciledRecord, VisitRecord};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Visits joined against orders, plus the orders treated as calls.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Reconciliation {
    pub unified: Vec<ReconciledRecord>,
    pub called_only: Vec<CalledRecord>,
    pub coverage: OrderCoverage,
}

/// Audit of how each input order was counted. Positions index into the order list passed
/// to [`reconcile`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrderCoverage {
    /// Orders counted both against a visit and as a call.
    pub double_counted: Vec<usize>,
    /// Orders whose customer was visited but which no visit row picked up.
    pub unaccounted: Vec<usize>,
    /// Orders attached to more than one visit row (join ties).
    pub repeated: Vec<usize>,
}

impl OrderCoverage {
    pub fn is_exact(&self) -> bool {
        self.double_counted.is_empty() && self.unaccounted.is_empty() && self.repeated.is_empty()
    }
}

type OrderIndex<'a> = HashMap<&'a str, Vec<(usize, &'a OrderRecord)>>;

/// Joins visits to orders by ERP code first and customer name second.
///
/// Every visit yields at least one row. A visit whose key matches several orders yields one
/// row per order; ties are kept as-is.
pub fn reconcile(visits: &[VisitRecord], orders: &[OrderRecord]) -> Reconciliation {
    let by_code = index_by(orders, |order| order.customer_code.as_str());
    let by_name = index_by(orders, |order| order.customer_name.as_str());

    let mut unified = Vec::with_capacity(visits.len());
    let mut attachments = vec![0usize; orders.len()];

    for visit in visits {
        let code_matches = lookup(&by_code, &visit.erp_code);
        let name_matches = lookup(&by_name, &visit.customer_name);

        if !code_matches.is_empty() {
            let fallback = name_matches.first().map(|(_, order)| *order);
            for (position, order) in code_matches {
                attachments[*position] += 1;
                unified.push(matched_row(visit, order, fallback, MatchSource::ErpCode));
            }
        } else if !name_matches.is_empty() {
            for (position, order) in name_matches {
                attachments[*position] += 1;
                unified.push(matched_row(visit, order, None, MatchSource::CustomerName));
            }
        } else {
            unified.push(unmatched_row(visit));
        }
    }

    let visited_names: HashSet<&str> = visits
        .iter()
        .map(|visit| visit.customer_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();

    let mut called_only = Vec::new();
    let mut coverage = OrderCoverage::default();

    for (position, order) in orders.iter().enumerate() {
        let called = !visited_names.contains(order.customer_name.as_str());
        if called {
            called_only.push(CalledRecord {
                order: order.clone(),
                customer_called: order.customer_name.clone(),
            });
        }

        match (attachments[position], called) {
            (0, false) => coverage.unaccounted.push(position),
            (0, true) => {}
            (_, true) => coverage.double_counted.push(position),
            (_, false) => {}
        }
        if attachments[position] > 1 {
            coverage.repeated.push(position);
        }
    }

    Reconciliation {
        unified,
        called_only,
        coverage,
    }
}

fn index_by<'a, F>(orders: &'a [OrderRecord], key: F) -> OrderIndex<'a>
where
    F: Fn(&'a OrderRecord) -> &'a str,
{
    let mut index: OrderIndex<'a> = HashMap::new();
    for (position, order) in orders.iter().enumerate() {
        let value = key(order);
        // An empty key is "unknown", not a shared value.
        if value.is_empty() {
            continue;
        }
        index.entry(value).or_default().push((position, order));
    }
    index
}

fn lookup<'i, 'a>(index: &'i OrderIndex<'a>, key: &str) -> &'i [(usize, &'a OrderRecord)] {
    if key.is_empty() {
        return &[];
    }
    index.get(key).map(Vec::as_slice).unwrap_or(&[])
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn matched_row(
    visit: &VisitRecord,
    order: &OrderRecord,
    fallback: Option<&OrderRecord>,
    matched_by: MatchSource,
) -> ReconciledRecord {
    let customer_code = non_empty(&order.customer_code)
        .or_else(|| fallback.and_then(|other| non_empty(&other.customer_code)));
    let order_sales_rep = non_empty(&order.sales_rep)
        .or_else(|| fallback.and_then(|other| non_empty(&other.sales_rep)));
    let order_customer_name = non_empty(&order.customer_name)
        .or_else(|| fallback.and_then(|other| non_empty(&other.customer_name)));
    let order_id = order
        .order_id
        .clone()
        .or_else(|| fallback.and_then(|other| other.order_id.clone()));

    let final_customer_name = non_empty(&visit.customer_name)
        .or_else(|| order_customer_name.clone())
        .unwrap_or_default();
    let final_sales_rep = non_empty(&visit.sales_rep).or_else(|| order_sales_rep.clone());

    ReconciledRecord {
        visit: visit.clone(),
        order_value: Some(order.order_value),
        customer_code,
        order_sales_rep,
        order_customer_name,
        order_id,
        final_customer_name,
        final_sales_rep,
        matched_by,
    }
}

fn unmatched_row(visit: &VisitRecord) -> ReconciledRecord {
    ReconciledRecord {
        visit: visit.clone(),
        order_value: None,
        customer_code: None,
        order_sales_rep: None,
        order_customer_name: None,
        order_id: None,
        final_customer_name: visit.customer_name.clone(),
        final_sales_rep: non_empty(&visit.sales_rep),
        matched_by: MatchSource::Unmatched,
    }
}
