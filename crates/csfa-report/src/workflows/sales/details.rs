use super::domain::{OrderId, OrderLine};
use super::gateway::SalesDataGateway;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, PoisonError};
use std::thread;
use tracing::{debug, error};

pub type OrderLines = BTreeMap<OrderId, Vec<OrderLine>>;

type Resolved = (OrderId, Vec<OrderLine>);

/// Fetches product lines for every distinct order id with at most `workers` requests in
/// flight. An order whose lookup fails is logged and left out of the result.
pub fn resolve_order_lines<'a, I>(
    gateway: &dyn SalesDataGateway,
    order_ids: I,
    workers: usize,
) -> OrderLines
where
    I: IntoIterator<Item = &'a OrderId>,
{
    let pending: BTreeSet<&OrderId> = order_ids.into_iter().collect();
    if pending.is_empty() {
        return OrderLines::new();
    }

    let workers = workers.clamp(1, pending.len());
    debug!(orders = pending.len(), workers, "resolving order lines");

    let (job_tx, job_rx) = mpsc::channel();
    for order_id in pending {
        if job_tx.send(order_id).is_err() {
            break;
        }
    }
    drop(job_tx);
    let jobs = Mutex::new(job_rx);
    let (done_tx, done_rx) = mpsc::channel();

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let jobs = &jobs;
                let done = done_tx.clone();
                scope.spawn(move || fetch_jobs(gateway, jobs, done))
            })
            .collect();
        drop(done_tx);

        for handle in handles {
            if handle.join().is_err() {
                error!("order detail worker panicked");
            }
        }
    });

    done_rx.into_iter().collect()
}

/// Pulls ids until the job queue is drained, sending each resolved order back.
fn fetch_jobs(
    gateway: &dyn SalesDataGateway,
    jobs: &Mutex<Receiver<&OrderId>>,
    done: Sender<Resolved>,
) {
    loop {
        let next = jobs.lock().unwrap_or_else(PoisonError::into_inner).recv();
        let Ok(order_id) = next else {
            break;
        };

        match gateway.fetch_order_details(order_id) {
            Ok(details) => {
                if done.send((order_id.clone(), details.entries)).is_err() {
                    break;
                }
            }
            Err(err) => error!(%order_id, error = %err, "failed to fetch order details"),
        }
    }
}
