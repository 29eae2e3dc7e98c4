//! Filter pipeline behavior under concurrent requests and hot swaps
//!
//! Every request must run through exactly one registered list, in order,
//! even while another thread replaces that list.

use aaa_service::errors::AaaError;
use aaa_service::filters::{
    Filter, FilterPipeline, FilterRequest, FilterResponse, Next, Registration,
};
use aaa_test_utils::{
    expected_events, EventLog, GateFilter, RecordingFilter, RecordingTerminal,
};
use axum::http::{HeaderName, HeaderValue, Method, Uri};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const TRACE_HEADER: HeaderName = HeaderName::from_static("x-filter-trace");

fn request() -> FilterRequest {
    FilterRequest::new(Method::GET, Uri::from_static("/restconf"))
}

/// Appends its name to the request's trace header on ingress.
struct Tagging {
    name: &'static str,
}

impl Filter for Tagging {
    fn name(&self) -> &str {
        self.name
    }

    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        let trace = match req.header(&TRACE_HEADER) {
            Some(existing) => format!("{existing},{}", self.name),
            None => self.name.to_string(),
        };
        req.headers.insert(
            TRACE_HEADER,
            HeaderValue::from_str(&trace).map_err(|e| AaaError::Filter(e.to_string()))?,
        );
        next.run(req, resp)
    }
}

fn tagging(names: &[&'static str]) -> Vec<Registration> {
    names
        .iter()
        .map(|&name| Registration::new(Arc::new(Tagging { name })))
        .collect()
}

#[test]
fn test_in_flight_request_keeps_its_snapshot() {
    let log = EventLog::new();
    let terminal = RecordingTerminal::new(&log);
    let pipeline = Arc::new(FilterPipeline::new(terminal.clone()));

    let gate = GateFilter::new("gate", &log);
    let a = RecordingFilter::new("a", &log);
    pipeline
        .update_stages(vec![Registration::new(gate.clone()), Registration::new(a.clone())])
        .unwrap();

    let worker = Arc::clone(&pipeline);
    let in_flight = thread::spawn(move || {
        let mut resp = FilterResponse::default();
        worker.process(&mut request(), &mut resp)
    });
    gate.wait_until_entered();

    let b = RecordingFilter::new("b", &log);
    pipeline
        .update_stages(vec![Registration::new(b.clone())])
        .unwrap();
    assert_eq!(pipeline.stage_names(), ["b"]);

    // The parked request still holds the old list
    assert_eq!(a.destroys(), 0);

    gate.open();
    in_flight.join().unwrap().unwrap();
    assert_eq!(log.events(), expected_events(&["gate", "a"]));
    assert_eq!(a.inits(), 1);
    assert_eq!(a.destroys(), 1);
    assert_eq!(b.destroys(), 0);

    log.clear();
    pipeline
        .process(&mut request(), &mut FilterResponse::default())
        .unwrap();
    assert_eq!(log.events(), expected_events(&["b"]));
    assert_eq!(terminal.calls(), 2);
}

#[test]
fn test_concurrent_requests_see_whole_lists() {
    let terminal = |req: &mut FilterRequest, resp: &mut FilterResponse| -> Result<(), AaaError> {
        resp.body = req.header(&TRACE_HEADER).unwrap_or_default().to_string().into();
        Ok(())
    };
    let pipeline = Arc::new(FilterPipeline::new(terminal));
    pipeline.update_stages(tagging(&["a", "b", "c"])).unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let workers: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = Arc::clone(&pipeline);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while !stop.load(Ordering::Acquire) {
                    let mut resp = FilterResponse::default();
                    pipeline.process(&mut request(), &mut resp).unwrap();
                    seen.push(String::from_utf8(resp.body.to_vec()).unwrap());
                }
                seen
            })
        })
        .collect();

    for round in 0..200 {
        let names: &[&'static str] = if round % 2 == 0 { &["x", "y"] } else { &["a", "b", "c"] };
        pipeline.update_stages(tagging(names)).unwrap();
    }
    stop.store(true, Ordering::Release);

    for worker in workers {
        for trace in worker.join().unwrap() {
            assert!(
                trace == "a,b,c" || trace == "x,y",
                "request ran through a mixed chain: {trace}"
            );
        }
    }
}

#[test]
fn test_destroy_waits_for_running_requests() {
    let log = EventLog::new();
    let terminal = RecordingTerminal::new(&log);
    let pipeline = Arc::new(FilterPipeline::new(terminal.clone()));
    let gate = GateFilter::new("gate", &log);
    let a = RecordingFilter::new("a", &log);
    pipeline
        .update_stages(vec![Registration::new(gate.clone()), Registration::new(a.clone())])
        .unwrap();

    let worker = Arc::clone(&pipeline);
    let in_flight = thread::spawn(move || {
        worker.process(&mut request(), &mut FilterResponse::default())
    });
    gate.wait_until_entered();

    pipeline.destroy();
    assert!(pipeline.is_empty());
    assert_eq!(a.destroys(), 0);

    gate.open();
    in_flight.join().unwrap().unwrap();
    assert_eq!(log.events(), expected_events(&["gate", "a"]));
    assert_eq!(a.destroys(), 1);

    // Later requests go straight to the terminal
    pipeline
        .process(&mut request(), &mut FilterResponse::default())
        .unwrap();
    assert_eq!(terminal.calls(), 2);
}
