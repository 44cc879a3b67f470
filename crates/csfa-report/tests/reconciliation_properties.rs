// Property-based tests for visit/order reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::HashSet;

use csfa_report::workflows::sales::domain::RawRecord;
use csfa_report::workflows::sales::SalesReport;
use proptest::prelude::*;
use serde_json::json;

const REPS: [&str; 3] = ["Ana", "Bo", "Cid"];

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// One day of activity over a pool of customers. Each customer has a unique name and either
/// a unique ERP code or none. `None` stands for a record with blank name and code.
#[derive(Debug, Clone)]
struct Day {
    customers: Vec<(String, String)>,
    visits: Vec<(Option<usize>, usize)>,
    orders: Vec<(Option<usize>, usize, u32)>,
}

impl Day {
    fn customer(&self, slot: Option<usize>) -> (&str, &str) {
        slot.map(|index| {
            let (name, code) = &self.customers[index];
            (name.as_str(), code.as_str())
        })
        .unwrap_or(("", ""))
    }

    fn visit_records(&self) -> Vec<RawRecord> {
        self.visits
            .iter()
            .map(|(slot, rep)| {
                let (name, code) = self.customer(*slot);
                record(json!({
                    "rep_name": REPS[*rep],
                    "shop_name": name,
                    "erp_code": code,
                    "timespent": "10m"
                }))
            })
            .collect()
    }

    fn order_records(&self) -> Vec<RawRecord> {
        self.orders
            .iter()
            .enumerate()
            .map(|(position, (slot, rep, cents))| {
                let (name, code) = self.customer(*slot);
                record(json!({
                    "sales_rep": REPS[*rep],
                    "customer_name": name,
                    "customer_code": code,
                    "id": position + 1,
                    "balance": format!("{}.{:02}", cents / 100, cents % 100)
                }))
            })
            .collect()
    }

    fn orders_for(&self, slot: Option<usize>) -> usize {
        match slot {
            Some(_) => self.orders.iter().filter(|(other, ..)| *other == slot).count(),
            None => 0,
        }
    }

    /// Keeps the first visit to each named customer; blank visits stay.
    fn with_distinct_visits(&self) -> Self {
        let mut seen = HashSet::new();
        let visits = self
            .visits
            .iter()
            .copied()
            .filter(|(slot, _)| slot.map_or(true, |index| seen.insert(index)))
            .collect();
        Self {
            visits,
            ..self.clone()
        }
    }

    fn build(&self) -> SalesReport {
        SalesReport::build(&self.visit_records(), &self.order_records())
    }
}

fn record(value: serde_json::Value) -> RawRecord {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn arb_day() -> impl Strategy<Value = Day> {
    proptest::collection::btree_set("[A-Z][a-z]{2,6}", 1..6)
        .prop_flat_map(|names| {
            let pool: Vec<String> = names.into_iter().collect();
            let count = pool.len();
            let customers = proptest::collection::vec(any::<bool>(), count).prop_map(move |coded| {
                pool.iter()
                    .zip(coded)
                    .enumerate()
                    .map(|(index, (name, has_code))| {
                        let code = if has_code { format!("ERP{index}") } else { String::new() };
                        (name.clone(), code)
                    })
                    .collect::<Vec<_>>()
            });
            let visits = proptest::collection::vec(
                (proptest::option::weighted(0.8, 0..count), 0..REPS.len()),
                0..8,
            );
            let orders = proptest::collection::vec(
                (
                    proptest::option::weighted(0.8, 0..count),
                    0..REPS.len(),
                    0u32..5_000_000,
                ),
                0..12,
            );
            (customers, visits, orders)
        })
        .prop_map(|(customers, visits, orders)| Day {
            customers,
            visits,
            orders,
        })
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config())]

    #[test]
    fn every_visit_yields_one_row_per_matching_order(day in arb_day()) {
        let report = day.build();
        let unified = &report.reconciliation.unified;

        let mut cursor = 0;
        for (index, (slot, _)) in day.visits.iter().enumerate() {
            let expected = day.orders_for(*slot).max(1);
            prop_assert!(cursor + expected <= unified.len());
            for row in &unified[cursor..cursor + expected] {
                prop_assert_eq!(&row.visit, &report.visits[index]);
            }
            cursor += expected;
        }
        prop_assert_eq!(cursor, unified.len());
    }

    #[test]
    fn order_customers_are_split_between_visits_and_calls(day in arb_day()) {
        let report = day.build();

        let order_customers: HashSet<&str> = report
            .orders
            .iter()
            .map(|order| order.customer_name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        let reconciled: HashSet<&str> = report
            .reconciliation
            .unified
            .iter()
            .filter_map(|row| row.order_customer_name.as_deref())
            .collect();
        let called: HashSet<&str> = report
            .reconciliation
            .called_only
            .iter()
            .map(|record| record.customer_called.as_str())
            .filter(|name| !name.is_empty())
            .collect();

        prop_assert!(reconciled.is_disjoint(&called));
        let covered: HashSet<&str> = reconciled.union(&called).copied().collect();
        prop_assert_eq!(order_customers, covered);
    }

    #[test]
    fn each_order_value_is_counted_once_without_repeat_visits(day in arb_day()) {
        let report = day.with_distinct_visits().build();

        let expected: f64 = report.orders.iter().map(|order| order.order_value).sum();
        let total = report.totals().total_revenue();
        prop_assert!((total - expected).abs() < 1e-6, "total {} expected {}", total, expected);
        prop_assert!(report.reconciliation.coverage.is_exact());
    }

    #[test]
    fn building_twice_gives_identical_reports(day in arb_day()) {
        let first = day.build();
        let second = day.build();

        prop_assert_eq!(&first.reps, &second.reps);
        prop_assert_eq!(&first.summaries, &second.summaries);
        prop_assert_eq!(&first.activities, &second.activities);
    }
}
