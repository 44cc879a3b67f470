//! Turns raw upstream records into the report artifacts: the spreadsheet, the plain-text
//! summary mirror and the email body.

pub mod email;
pub mod text;
pub mod workbook;

use super::activity::{classify, ActivityMap};
use super::domain::{OrderId, OrderRecord, RawRecord, SalespersonSummary, VisitRecord};
use super::normalizer::{normalize_orders, normalize_visits};
use super::reconcile::{reconcile, Reconciliation};
use super::summary::{sales_reps, summarize, ReportTotals};
use serde::Serialize;

/// Customer activity for one rep, in the order rep sheets are written.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepActivity {
    pub rep: String,
    pub customers: ActivityMap,
}

/// Everything derived from one day's visits and orders before any detail lookups.
#[derive(Debug, Clone, Serialize)]
pub struct SalesReport {
    pub visits: Vec<VisitRecord>,
    pub orders: Vec<OrderRecord>,
    pub reconciliation: Reconciliation,
    pub reps: Vec<String>,
    pub summaries: Vec<SalespersonSummary>,
    pub activities: Vec<RepActivity>,
}

impl SalesReport {
    pub fn build(visits_raw: &[RawRecord], orders_raw: &[RawRecord]) -> Self {
        let visits = normalize_visits(visits_raw);
        let orders = normalize_orders(orders_raw);
        let reconciliation = reconcile(&visits, &orders);
        let reps = sales_reps(&reconciliation);
        let summaries = summarize(&reps, &reconciliation);
        let activities = reps
            .iter()
            .map(|rep| RepActivity {
                rep: rep.clone(),
                customers: classify(rep, &reconciliation, &orders),
            })
            .collect();

        Self {
            visits,
            orders,
            reconciliation,
            reps,
            summaries,
            activities,
        }
    }

    pub fn totals(&self) -> ReportTotals {
        ReportTotals::from_summaries(&self.summaries)
    }

    /// Every order id referenced from a rep sheet, duplicates included.
    pub fn order_ids(&self) -> impl Iterator<Item = &OrderId> {
        self.activities
            .iter()
            .flat_map(|activity| activity.customers.values())
            .flat_map(|customer| customer.order_ids.iter())
    }
}
