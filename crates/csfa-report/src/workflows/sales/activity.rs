use super::domain::{Classification, CustomerActivity, OrderRecord};
use super::reconcile::Reconciliation;
use std::collections::BTreeMap;

/// Per-customer activity for one rep, keyed (and therefore sorted) by customer name.
pub type ActivityMap = BTreeMap<String, CustomerActivity>;

/// Builds the customer activity map that drives a rep's detail sheet.
///
/// Visits seed the map, calls upgrade it, and every order of the rep in `orders` attaches its
/// id, adding "No Visit" customers where nothing else was recorded. Classifications only
/// move up the lattice.
pub fn classify(rep: &str, reconciliation: &Reconciliation, orders: &[OrderRecord]) -> ActivityMap {
    let mut customers = ActivityMap::new();

    for row in reconciliation
        .unified
        .iter()
        .filter(|row| row.final_sales_rep.as_deref() == Some(rep))
    {
        let entry = upgrade(
            &mut customers,
            &row.final_customer_name,
            Classification::Visited,
        );
        entry.time_spent = row.visit.time_spent.clone();
    }

    for record in reconciliation
        .called_only
        .iter()
        .filter(|record| record.order.sales_rep == rep)
    {
        upgrade(&mut customers, &record.customer_called, Classification::Called);
    }

    for order in orders
        .iter()
        .filter(|order| order.sales_rep == rep && !order.customer_name.is_empty())
    {
        let entry = upgrade(&mut customers, &order.customer_name, Classification::NoVisit);
        if let Some(order_id) = &order.order_id {
            entry.order_ids.push(order_id.clone());
        }
    }

    customers
}

fn upgrade<'m>(
    customers: &'m mut ActivityMap,
    customer: &str,
    classification: Classification,
) -> &'m mut CustomerActivity {
    let entry = customers
        .entry(customer.to_string())
        .or_insert_with(|| CustomerActivity::new(classification));
    entry.classification = entry.classification.merge(classification);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::sales::domain::{CalledRecord, OrderId, VisitRecord};
    use crate::workflows::sales::reconcile::reconcile;

    fn visit(rep: &str, name: &str, time: &str) -> VisitRecord {
        VisitRecord {
            sales_rep: rep.to_string(),
            customer_name: name.to_string(),
            erp_code: String::new(),
            time_spent: time.to_string(),
        }
    }

    fn order(rep: &str, name: &str, id: u64) -> OrderRecord {
        OrderRecord {
            sales_rep: rep.to_string(),
            customer_name: name.to_string(),
            customer_code: String::new(),
            order_id: Some(OrderId::from(id)),
            order_value: 10.0,
        }
    }

    #[test]
    fn visits_calls_and_orders_build_sorted_activity() {
        let visits = [visit("Ana", "Kappa", "45m"), visit("Ana", "Acme", "20m")];
        let orders = [order("Ana", "Acme", 1), order("Ana", "Zed", 2), order("Ana", "Zed", 3)];
        let reconciliation = reconcile(&visits, &orders);

        let activity = classify("Ana", &reconciliation, &orders);
        let names: Vec<&str> = activity.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["Acme", "Kappa", "Zed"]);

        let acme = &activity["Acme"];
        assert_eq!(acme.classification, Classification::Visited);
        assert_eq!(acme.time_spent, "20m");
        assert_eq!(acme.order_ids, vec![OrderId::from(1)]);

        assert!(activity["Kappa"].order_ids.is_empty());

        let zed = &activity["Zed"];
        assert_eq!(zed.classification, Classification::Called);
        assert_eq!(zed.time_spent, "");
        assert_eq!(zed.order_ids, vec![OrderId::from(2), OrderId::from(3)]);
    }

    #[test]
    fn visit_then_call_upgrades_and_keeps_time_spent() {
        let visits = [visit("Ana", "Acme", "30m"), visit("Bo", "Beta", "10m")];
        let orders = [order("Ana", "Gamma", 7)];
        let mut reconciliation = reconcile(&visits, &orders);

        // Both sides name the same customer for the same rep.
        reconciliation.called_only.push(CalledRecord {
            order: order("Ana", "Acme", 8),
            customer_called: "Acme".into(),
        });

        let activity = classify("Ana", &reconciliation, &orders);
        let acme = &activity["Acme"];
        assert_eq!(acme.classification, Classification::VisitedAndCalled);
        assert_eq!(acme.time_spent, "30m");
        assert!(!activity.contains_key("Beta"));
    }

    #[test]
    fn orders_without_visit_or_call_are_no_visit() {
        let reconciliation = Reconciliation::default();
        let orders = [order("Ana", "Delta", 4), order("Ana", "", 5), order("Bo", "Delta", 6)];

        let activity = classify("Ana", &reconciliation, &orders);
        assert_eq!(activity.len(), 1);
        assert_eq!(activity["Delta"].classification, Classification::NoVisit);
        assert_eq!(activity["Delta"].order_ids, vec![OrderId::from(4)]);
    }

    #[test]
    fn unknown_rep_has_no_activity() {
        let orders = [order("Ana", "Acme", 1)];
        let reconciliation = reconcile(&[], &orders);
        assert!(classify("Nobody", &reconciliation, &orders).is_empty());
    }
}
