//! Scripted transport and clock shared by engine and session tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use bytes::Bytes;

use crate::clock::Clock;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Settable clock for driving expiry by hand.
#[derive(Debug, Default)]
pub(crate) struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub(crate) fn new(now: i64) -> Self {
        Self { now: AtomicI64::new(now) }
    }

    pub(crate) fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub(crate) fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Returns a configurable outcome and records every request it sees.
pub(crate) struct MockTransport {
    outcome: Mutex<Result<HttpResponse, TransportError>>,
    requests: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
    hook: Option<Hook>,
}

impl MockTransport {
    pub(crate) fn ok(status: u16, body: &str) -> Self {
        Self {
            outcome: Mutex::new(Ok(response(status, body, &[]))),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            hook: None,
        }
    }

    /// Run `hook` inside every `send`, before the outcome is returned.
    pub(crate) fn with_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub(crate) fn respond(&self, response: HttpResponse) {
        *self.outcome.lock().unwrap() = Ok(response);
    }

    pub(crate) fn respond_ok(&self, status: u16, body: &str) {
        self.respond(response(status, body, &[]));
    }

    pub(crate) fn fail(&self, err: TransportError) {
        *self.outcome.lock().unwrap() = Err(err);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if let Some(hook) = &self.hook {
            hook();
        }
        self.outcome.lock().unwrap().clone()
    }
}

pub(crate) fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpResponse {
    HttpResponse {
        status,
        body: Bytes::from(body.to_string()),
        headers: headers
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}
