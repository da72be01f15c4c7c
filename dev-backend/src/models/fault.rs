//! Fault plan
//!
//! Per-route FIFO of scripted failures. Each request to a route consumes at
//! most one queued fault; an empty queue means normal service.

use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Upper bound on faults queued for one route
pub const MAX_QUEUED_FAULTS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fault {
    /// Answer with this status and a `{error, status}` body
    Status { status: u16 },
    /// Answer 200 with `{"error": message}`
    ErrorBody { message: String },
    /// Answer 200 with a non-JSON body
    Garbage,
    /// Hold the request, then serve it normally
    Delay { ms: u64 },
}

#[derive(Debug, Deserialize)]
pub struct QueueFault {
    pub route: String,
    #[serde(flatten)]
    pub fault: Fault,
    /// Queue the same fault this many times
    #[serde(default = "default_times")]
    pub times: usize,
}

fn default_times() -> usize {
    1
}

#[derive(Debug, Default)]
pub struct FaultPlan {
    queues: Mutex<HashMap<String, VecDeque<Fault>>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, route: &str, fault: Fault) {
        self.queues
            .lock()
            .entry(route.to_string())
            .or_default()
            .push_back(fault);
    }

    /// Next fault for `route`, if any
    pub fn take(&self, route: &str) -> Option<Fault> {
        let mut queues = self.queues.lock();
        let queue = queues.get_mut(route)?;
        let fault = queue.pop_front();
        if queue.is_empty() {
            queues.remove(route);
        }
        fault
    }

    pub fn pending(&self, route: &str) -> usize {
        self.queues.lock().get(route).map_or(0, VecDeque::len)
    }

    /// Queued fault count per route
    pub fn summary(&self) -> BTreeMap<String, usize> {
        self.queues
            .lock()
            .iter()
            .map(|(route, queue)| (route.clone(), queue.len()))
            .collect()
    }

    pub fn clear(&self) {
        self.queues.lock().clear();
    }
}
