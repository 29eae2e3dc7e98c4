//! Instrumented filters and terminals for pipeline tests
//!
//! Every fixture appends to a shared [`EventLog`] so tests can assert the
//! exact ingress/terminal/egress order a request went through.

use aaa_service::errors::AaaError;
use aaa_service::filters::{Filter, FilterConfig, FilterRequest, FilterResponse, Next, Terminal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Ordered record of pipeline events, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

/// Expected events for a request through `names` in order, ending at the
/// terminal.
pub fn expected_events(names: &[&str]) -> Vec<String> {
    let mut events: Vec<String> = names.iter().map(|n| format!("{n}-ingress")).collect();
    events.push("terminal".to_string());
    events.extend(names.iter().rev().map(|n| format!("{n}-egress")));
    events
}

/// Logs `<name>-ingress` before and `<name>-egress` after the rest of the
/// chain, and counts lifecycle calls.
#[derive(Debug)]
pub struct RecordingFilter {
    name: String,
    log: EventLog,
    inits: AtomicUsize,
    destroys: AtomicUsize,
    last_config: Mutex<Option<FilterConfig>>,
}

impl RecordingFilter {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            inits: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        })
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn destroys(&self) -> usize {
        self.destroys.load(Ordering::SeqCst)
    }

    /// Configuration passed to the most recent `init`.
    pub fn last_config(&self) -> Option<FilterConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

impl Filter for RecordingFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, config: &FilterConfig) -> Result<(), AaaError> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        Ok(())
    }

    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        self.log.push(format!("{}-ingress", self.name));
        let result = next.run(req, resp);
        self.log.push(format!("{}-egress", self.name));
        result
    }

    fn destroy(&self) {
        self.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

/// Filter whose `init` always fails.
#[derive(Debug)]
pub struct FailingInitFilter {
    name: String,
}

impl FailingInitFilter {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }
}

impl Filter for FailingInitFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&self, _config: &FilterConfig) -> Result<(), AaaError> {
        Err(AaaError::FilterInit {
            filter: self.name.clone(),
            reason: "refusing to start".to_string(),
        })
    }

    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        next.run(req, resp)
    }
}

/// Filter that parks each request on ingress until the test opens the gate.
///
/// [`GateFilter::wait_until_entered`] blocks until a request has reached
/// the filter, so a test can change the pipeline while that request is
/// provably in flight.
#[derive(Debug)]
pub struct GateFilter {
    name: String,
    log: EventLog,
    entered_tx: Mutex<Sender<()>>,
    entered_rx: Mutex<Receiver<()>>,
    open_tx: Mutex<Sender<()>>,
    open_rx: Mutex<Receiver<()>>,
}

impl GateFilter {
    pub fn new(name: &str, log: &EventLog) -> Arc<Self> {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (open_tx, open_rx) = mpsc::channel();
        Arc::new(Self {
            name: name.to_string(),
            log: log.clone(),
            entered_tx: Mutex::new(entered_tx),
            entered_rx: Mutex::new(entered_rx),
            open_tx: Mutex::new(open_tx),
            open_rx: Mutex::new(open_rx),
        })
    }

    /// Block until one request has entered the filter.
    pub fn wait_until_entered(&self) {
        self.entered_rx
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10))
            .expect("no request reached the gate");
    }

    /// Let one parked request continue.
    pub fn open(&self) {
        self.open_tx.lock().unwrap().send(()).unwrap();
    }
}

impl Filter for GateFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        self.log.push(format!("{}-ingress", self.name));
        self.entered_tx.lock().unwrap().send(()).unwrap();
        self.open_rx
            .lock()
            .unwrap()
            .recv_timeout(Duration::from_secs(10))
            .expect("gate was never opened");
        let result = next.run(req, resp);
        self.log.push(format!("{}-egress", self.name));
        result
    }
}

/// Terminal that logs `terminal` and counts invocations.
#[derive(Debug, Clone)]
pub struct RecordingTerminal {
    log: EventLog,
    calls: Arc<AtomicUsize>,
}

impl RecordingTerminal {
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Terminal for RecordingTerminal {
    fn handle(&self, _req: &mut FilterRequest, _resp: &mut FilterResponse) -> Result<(), AaaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.push("terminal");
        Ok(())
    }
}
