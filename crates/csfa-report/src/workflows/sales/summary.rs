use super::domain::SalespersonSummary;
use super::reconcile::Reconciliation;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Every rep that appears on either side of the reconciliation, sorted ascending.
pub fn sales_reps(reconciliation: &Reconciliation) -> Vec<String> {
    let visit_reps = reconciliation
        .unified
        .iter()
        .filter_map(|row| row.final_sales_rep.as_deref());
    let call_reps = reconciliation
        .called_only
        .iter()
        .map(|record| record.order.sales_rep.as_str());

    visit_reps
        .chain(call_reps)
        .filter(|rep| !rep.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// One summary row per rep, in the order given.
pub fn summarize(reps: &[String], reconciliation: &Reconciliation) -> Vec<SalespersonSummary> {
    reps.iter()
        .map(|rep| {
            let visits: Vec<_> = reconciliation
                .unified
                .iter()
                .filter(|row| row.final_sales_rep.as_deref() == Some(rep.as_str()))
                .collect();
            let calls: Vec<_> = reconciliation
                .called_only
                .iter()
                .filter(|record| record.order.sales_rep == *rep)
                .collect();

            SalespersonSummary {
                rep: rep.clone(),
                customers_visited: visits
                    .iter()
                    .map(|row| row.final_customer_name.as_str())
                    .collect::<HashSet<_>>()
                    .len(),
                order_value_from_visits: visits.iter().map(|row| row.value()).sum(),
                customers_called: calls
                    .iter()
                    .map(|record| record.customer_called.as_str())
                    .collect::<HashSet<_>>()
                    .len(),
                order_value_from_calls: calls.iter().map(|record| record.order.order_value).sum(),
            }
        })
        .collect()
}

/// Column totals of the summary table, used for the email KPIs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportTotals {
    pub salespersons: usize,
    pub customers_visited: usize,
    pub customers_called: usize,
    pub order_value_from_visits: f64,
    pub order_value_from_calls: f64,
}

impl ReportTotals {
    pub fn from_summaries(summaries: &[SalespersonSummary]) -> Self {
        summaries.iter().fold(
            Self {
                salespersons: summaries.len(),
                ..Self::default()
            },
            |mut totals, row| {
                totals.customers_visited += row.customers_visited;
                totals.customers_called += row.customers_called;
                totals.order_value_from_visits += row.order_value_from_visits;
                totals.order_value_from_calls += row.order_value_from_calls;
                totals
            },
        )
    }

    pub fn total_customers(&self) -> usize {
        self.customers_visited + self.customers_called
    }

    pub fn total_revenue(&self) -> f64 {
        self.order_value_from_visits + self.order_value_from_calls
    }

    pub fn customers_per_rep(&self) -> f64 {
        ratio(self.total_customers() as f64, self.salespersons)
    }

    pub fn value_per_customer(&self) -> f64 {
        ratio(self.total_revenue(), self.total_customers())
    }

    pub fn averages(&self) -> ReportAverages {
        ReportAverages {
            customers_visited: ratio(self.customers_visited as f64, self.salespersons),
            customers_called: ratio(self.customers_called as f64, self.salespersons),
            order_value_from_visits: ratio(self.order_value_from_visits, self.salespersons),
            order_value_from_calls: ratio(self.order_value_from_calls, self.salespersons),
        }
    }
}

/// Per-rep means of each summary column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportAverages {
    pub customers_visited: f64,
    pub customers_called: f64,
    pub order_value_from_visits: f64,
    pub order_value_from_calls: f64,
}

fn ratio(numerator: f64, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sales::domain::{OrderId, OrderRecord, VisitRecord};
    use crate::workflows::sales::reconcile::reconcile;

    fn visit(rep: &str, name: &str, erp: &str) -> VisitRecord {
        VisitRecord {
            sales_rep: rep.to_string(),
            customer_name: name.to_string(),
            erp_code: erp.to_string(),
            time_spent: String::new(),
        }
    }

    fn order(rep: &str, name: &str, code: &str, id: u64, value: f64) -> OrderRecord {
        OrderRecord {
            sales_rep: rep.to_string(),
            customer_name: name.to_string(),
            customer_code: code.to_string(),
            order_id: Some(OrderId::from(id)),
            order_value: value,
        }
    }

    #[test]
    fn reps_are_sorted_and_exclude_blank_names() {
        let visits = [visit("Carla", "Acme", ""), visit("", "Nameless", "")];
        let orders = [order("Ana", "Zed", "", 1, 5.0), order("", "Orphan", "", 2, 1.0)];
        let reconciliation = reconcile(&visits, &orders);

        assert_eq!(sales_reps(&reconciliation), vec!["Ana", "Carla"]);
    }

    #[test]
    fn summary_counts_distinct_customers_and_sums_values() {
        let visits = [
            visit("Ana", "Acme", "E1"),
            visit("Ana", "Acme", "E1"),
            visit("Ana", "Beta", ""),
        ];
        let orders = [
            order("Ana", "Acme", "E1", 1, 100.0),
            order("Ana", "Zed", "", 2, 40.0),
            order("Ana", "Zed", "", 3, 60.0),
        ];
        let reconciliation = reconcile(&visits, &orders);
        let reps = sales_reps(&reconciliation);
        let summary = summarize(&reps, &reconciliation);

        assert_eq!(summary.len(), 1);
        let ana = &summary[0];
        assert_eq!(ana.customers_visited, 2);
        assert_eq!(ana.order_value_from_visits, 200.0);
        assert_eq!(ana.customers_called, 1);
        assert_eq!(ana.order_value_from_calls, 100.0);
    }

    #[test]
    fn empty_inputs_summarize_to_nothing() {
        let reconciliation = reconcile(&[], &[]);
        let reps = sales_reps(&reconciliation);
        assert!(reps.is_empty());
        assert!(summarize(&reps, &reconciliation).is_empty());

        let totals = ReportTotals::from_summaries(&[]);
        assert_eq!(totals.customers_per_rep(), 0.0);
        assert_eq!(totals.value_per_customer(), 0.0);
        assert_eq!(totals.averages(), ReportAverages::default());
    }

    #[test]
    fn totals_and_averages_follow_summary_rows() {
        let rows = vec![
            SalespersonSummary {
                rep: "Ana".into(),
                customers_visited: 3,
                order_value_from_visits: 900.0,
                customers_called: 1,
                order_value_from_calls: 100.0,
            },
            SalespersonSummary {
                rep: "Bo".into(),
                customers_visited: 1,
                order_value_from_visits: 0.0,
                customers_called: 3,
                order_value_from_calls: 500.0,
            },
        ];

        let totals = ReportTotals::from_summaries(&rows);
        assert_eq!(totals.salespersons, 2);
        assert_eq!(totals.total_customers(), 8);
        assert_eq!(totals.total_revenue(), 1500.0);
        assert_eq!(totals.customers_per_rep(), 4.0);
        assert_eq!(totals.value_per_customer(), 187.5);
        assert_eq!(totals.averages().order_value_from_calls, 300.0);
    }
}
