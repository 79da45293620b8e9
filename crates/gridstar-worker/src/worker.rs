//! A dedicated thread owning the searched grid.
//!
//! Requests and responses travel as JSON strings over two channels. Each
//! request registers a one-shot reply channel in a pending table under its
//! correlation id; a reader thread routes responses back through it. When
//! the worker stops, the reader drops every pending entry so waiting
//! tickets fail instead of hanging.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::envelope::{Constructed, GridSpec, Method, PathArgs, PathOutput, Request, Response};
use crate::error::{Error, Result};
use crate::rules::RuleRegistry;
use crate::session::Session;

#[derive(Default)]
struct Pending {
    closed: bool,
    waiting: HashMap<u64, Sender<Response>>,
}

type PendingTable = Arc<Mutex<Pending>>;

fn lock(table: &PendingTable) -> MutexGuard<'_, Pending> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a worker thread.
///
/// Requests are answered one at a time, in the order they were sent.
/// Dropping the handle lets the worker finish the queued requests, then
/// joins its threads.
pub struct Worker {
    requests: Option<Sender<String>>,
    pending: PendingTable,
    next_id: AtomicU64,
    threads: Vec<JoinHandle<()>>,
}

impl Worker {
    /// Start the worker and its reader thread. `registry` resolves named
    /// cost rules inside the worker.
    pub fn spawn(registry: RuleRegistry) -> Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<String>();
        let (response_tx, response_rx) = mpsc::channel::<String>();
        let pending = PendingTable::default();

        let worker = thread::Builder::new()
            .name("gridstar-worker".into())
            .spawn(move || serve(request_rx, response_tx, registry))
            .map_err(|e| Error::Transport(format!("cannot start worker thread: {e}")))?;

        let table = Arc::clone(&pending);
        let reader = thread::Builder::new()
            .name("gridstar-worker-reader".into())
            .spawn(move || route(response_rx, table))
            .map_err(|e| Error::Transport(format!("cannot start reader thread: {e}")))?;

        Ok(Self {
            requests: Some(request_tx),
            pending,
            next_id: AtomicU64::new(1),
            threads: vec![worker, reader],
        })
    }

    /// Send a grid to build. It replaces the grid of earlier constructs for
    /// every request sent afterwards.
    pub fn construct(&self, spec: &GridSpec) -> Result<Ticket<Constructed>> {
        self.send(Method::Construct, spec)
    }

    pub fn path(&self, args: &PathArgs) -> Result<Ticket<PathOutput>> {
        self.send(Method::Path, args)
    }

    /// Number of requests still waiting for an answer.
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).waiting.len()
    }

    fn send<A: Serialize, T>(&self, method: Method, args: &A) -> Result<Ticket<T>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Request::new(method, id, args)?)?;
        let (tx, rx) = mpsc::channel();
        {
            let mut table = lock(&self.pending);
            if table.closed {
                return Err(Error::Transport("worker has stopped".into()));
            }
            table.waiting.insert(id, tx);
        }
        let delivered = self
            .requests
            .as_ref()
            .is_some_and(|requests| requests.send(text).is_ok());
        if !delivered {
            lock(&self.pending).waiting.remove(&id);
            return Err(Error::Transport(format!("cannot deliver request {id}")));
        }
        log::trace!("sent request {id} ({method:?})");
        Ok(Ticket {
            id,
            reply: rx,
            output: PhantomData,
        })
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.requests = None;
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                log::warn!("thread {name:?} panicked");
            }
        }
    }
}

/// Pending answer to one request.
#[derive(Debug)]
pub struct Ticket<T> {
    id: u64,
    reply: Receiver<Response>,
    output: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Ticket<T> {
    /// Correlation id of the request.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the worker answers.
    pub fn wait(self) -> Result<T> {
        let response = self.reply.recv().map_err(|_| {
            Error::Transport(format!("worker stopped before answering request {}", self.id))
        })?;
        if let Some(error) = response.error {
            return Err(Error::Remote(error));
        }
        let output = response
            .output
            .ok_or_else(|| Error::Remote(format!("empty response to request {}", self.id)))?;
        Ok(serde_json::from_value(output)?)
    }
}

/// Worker loop: answer requests until the host hangs up.
fn serve(requests: Receiver<String>, responses: Sender<String>, registry: RuleRegistry) {
    let mut session = Session::new(registry);
    log::debug!("worker started");
    for text in requests {
        let request: Request = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("dropping malformed request: {e}");
                continue;
            }
        };
        let response = session.handle(request);
        let encoded = match serde_json::to_string(&response) {
            Ok(encoded) => encoded,
            Err(e) => {
                // Still answer, so the ticket does not wait forever.
                let failed = Response::failed(response.method, response.id, e);
                match serde_json::to_string(&failed) {
                    Ok(encoded) => encoded,
                    Err(_) => continue,
                }
            }
        };
        if responses.send(encoded).is_err() {
            break;
        }
    }
    log::debug!("worker stopped");
}

/// Reader loop: hand each response to the ticket waiting for it.
fn route(responses: Receiver<String>, pending: PendingTable) {
    for text in responses {
        let response: Response = match serde_json::from_str(&text) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("dropping malformed response: {e}");
                continue;
            }
        };
        let waiting = lock(&pending).waiting.remove(&response.id);
        match waiting {
            Some(reply) => {
                // The ticket may have been dropped.
                let _ = reply.send(response);
            }
            None => log::warn!("response to unknown request {}", response.id),
        }
    }
    let mut table = lock(&pending);
    table.closed = true;
    if !table.waiting.is_empty() {
        log::warn!("worker stopped with {} request(s) pending", table.waiting.len());
    }
    table.waiting.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CostRule;
    use gridstar_paths::{Cutting, PathOptions};

    fn maze() -> GridSpec {
        GridSpec::new(vec![
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 1.0, 1.0, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 1.0, 1.0],
        ])
        .cost(CostRule::Passable { max: 0.0 })
    }

    fn args(start: usize, goal: usize) -> PathArgs {
        PathArgs {
            start,
            goal,
            options: PathOptions::default(),
        }
    }

    #[test]
    fn answers_like_a_local_session() {
        let worker = Worker::spawn(RuleRegistry::new()).unwrap();
        let built = worker.construct(&maze()).unwrap().wait().unwrap();
        assert_eq!(built, Constructed { layers: 1, cells: 16 });

        let remote = worker.path(&args(0, 12)).unwrap().wait().unwrap();
        let mut local = Session::new(RuleRegistry::new());
        local.construct(&maze()).unwrap();
        assert_eq!(remote, local.path(&args(0, 12)).unwrap());
        assert_eq!(remote.cost, Some(9.0));
    }

    #[test]
    fn requests_are_answered_in_order() {
        let worker = Worker::spawn(RuleRegistry::new()).unwrap();
        let built = worker.construct(&maze()).unwrap();
        let tickets: Vec<_> = (0..4)
            .map(|goal| worker.path(&args(0, goal)).unwrap())
            .collect();
        let rebuilt = worker
            .construct(&maze().diagonals(true).cutting(Cutting::Always))
            .unwrap();
        let after = worker.path(&args(0, 12)).unwrap();

        let ids: Vec<u64> = tickets.iter().map(Ticket::id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert!(built.id() < ids[0]);
        built.wait().unwrap();
        for (goal, ticket) in tickets.into_iter().enumerate() {
            let out = ticket.wait().unwrap();
            assert_eq!(out.cost, Some(goal as f64));
        }
        rebuilt.wait().unwrap();
        // Diagonal moves shorten the route once the new grid is in place.
        assert_eq!(after.wait().unwrap().cost, Some(6.0));
        assert_eq!(worker.in_flight(), 0);
    }

    #[test]
    fn remote_errors_reject_the_ticket() {
        let worker = Worker::spawn(RuleRegistry::new()).unwrap();
        let early = worker.path(&args(0, 1)).unwrap();
        assert!(matches!(early.wait(), Err(Error::Remote(ref m)) if m.contains("constructed")));

        let unknown = worker
            .construct(&maze().cost(CostRule::Named("missing".into())))
            .unwrap();
        assert!(matches!(unknown.wait(), Err(Error::Remote(_))));
    }

    #[test]
    fn named_rules_run_in_the_worker() {
        let registry = RuleRegistry::new().with("flat", |a, b| {
            if a.value == b.value { 1.0 } else { f64::NAN }
        });
        let worker = Worker::spawn(registry).unwrap();
        worker
            .construct(&maze().cost(CostRule::Named("flat".into())))
            .unwrap()
            .wait()
            .unwrap();
        // Zero cells only link to zero cells, as with the passable rule.
        let out = worker.path(&args(0, 8)).unwrap().wait().unwrap();
        assert_eq!(out.cost, Some(8.0));
    }

    #[test]
    fn a_dead_worker_fails_its_tickets() {
        let registry = RuleRegistry::new().with("boom", |_, _| panic!("boom"));
        let worker = Worker::spawn(registry).unwrap();
        let ticket = worker
            .construct(&maze().cost(CostRule::Named("boom".into())))
            .unwrap();
        assert!(matches!(ticket.wait(), Err(Error::Transport(_))));
        // Later requests fail at once or through their ticket.
        match worker.path(&args(0, 1)) {
            Err(e) => assert!(matches!(e, Error::Transport(_))),
            Ok(t) => assert!(matches!(t.wait(), Err(Error::Transport(_)))),
        }
    }
}
