//! Shared test doubles for the provisioning engine.
//!
//! Provides recording [`CommandRunner`] implementations and a
//! [`ProgressReporter`] that captures messages instead of printing them.

#![allow(dead_code, clippy::expect_used)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hostprov_cli::application::ports::{CommandRunner, ProgressReporter};
use hostprov_cli::domain::ExecResult;
use hostprov_cli::domain::ops::USERADD_EXISTS;

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

type Responder = dyn Fn(&str, &[&str]) -> ExecResult + Send + Sync;

// ─── RecordingRunner ─────────────────────────────────────────────────────────

/// A `CommandRunner` that records every call and answers from a closure.
#[derive(Clone)]
pub struct RecordingRunner {
    calls: Arc<Mutex<Vec<Call>>>,
    respond: Arc<Responder>,
}

impl RecordingRunner {
    /// Every command exits 0.
    pub fn ok() -> Self {
        Self::responding(|_, _| ExecResult::ok())
    }

    /// Commands matching `pred` exit with `code`; everything else exits 0.
    pub fn failing_when<F>(pred: F, code: i32) -> Self
    where
        F: Fn(&str, &[&str]) -> bool + Send + Sync + 'static,
    {
        Self::responding(move |program, args| {
            if pred(program, args) {
                ExecResult::failure(code, &format!("{program}: simulated failure"))
            } else {
                ExecResult::ok()
            }
        })
    }

    /// Any invocation of `program` exits with `code`.
    pub fn failing_program(program: &'static str, code: i32) -> Self {
        Self::failing_when(move |p, _| p == program, code)
    }

    /// `id -u` prints `uid`.
    pub fn with_uid(uid: &'static str) -> Self {
        Self::responding(move |program, _| {
            if program == "id" {
                ExecResult::new(0, format!("{uid}\n").into_bytes(), Vec::new())
            } else {
                ExecResult::ok()
            }
        })
    }

    pub fn responding<F>(f: F) -> Self
    where
        F: Fn(&str, &[&str]) -> ExecResult + Send + Sync + 'static,
    {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            respond: Arc::new(f),
        }
    }

    /// Snapshot of all recorded calls, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("mutex poisoned").clone()
    }

    /// Calls whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    fn record(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Option<Duration>,
    ) -> ExecResult {
        self.calls.lock().expect("mutex poisoned").push(Call {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            input: input.map(<[u8]>::to_vec),
            timeout,
        });
        (self.respond)(program, args)
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, program: &str, args: &[&str], input: Option<&[u8]>) -> ExecResult {
        self.record(program, args, input, None)
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
        timeout: Duration,
    ) -> ExecResult {
        self.record(program, args, input, Some(timeout))
    }
}

// ─── FakeHost ────────────────────────────────────────────────────────────────

/// A stateful host: `useradd` for an existing account exits with the
/// "already exists" code, like the real tool. Everything else succeeds.
#[derive(Default)]
pub struct FakeHost {
    users: Mutex<HashSet<String>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> HashSet<String> {
        self.users.lock().expect("mutex poisoned").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mutex poisoned").len()
    }

    fn handle(&self, program: &str, args: &[&str], input: Option<&[u8]>) -> ExecResult {
        self.calls.lock().expect("mutex poisoned").push(Call {
            program: program.to_string(),
            args: args.iter().map(ToString::to_string).collect(),
            input: input.map(<[u8]>::to_vec),
            timeout: None,
        });
        if program == "useradd" {
            let user = args.last().copied().unwrap_or_default().to_string();
            let mut users = self.users.lock().expect("mutex poisoned");
            if !users.insert(user.clone()) {
                return ExecResult::failure(USERADD_EXISTS, &format!("useradd: user '{user}' already exists"));
            }
        }
        ExecResult::ok()
    }
}

impl CommandRunner for FakeHost {
    async fn run(&self, program: &str, args: &[&str], input: Option<&[u8]>) -> ExecResult {
        self.handle(program, args, input)
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        input: Option<&[u8]>,
        _timeout: Duration,
    ) -> ExecResult {
        self.handle(program, args, input)
    }
}

// ─── RecordingReporter ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Step,
    Success,
    Warn,
    Error,
}

/// A `ProgressReporter` that stores `(event, message)` pairs.
#[derive(Default)]
pub struct RecordingReporter {
    events: RefCell<Vec<(Event, String)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Event, String)> {
        self.events.borrow().clone()
    }

    pub fn messages(&self, kind: Event) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.events.borrow_mut().push((Event::Step, message.to_string()));
    }
    fn success(&self, message: &str) {
        self.events.borrow_mut().push((Event::Success, message.to_string()));
    }
    fn warn(&self, message: &str) {
        self.events.borrow_mut().push((Event::Warn, message.to_string()));
    }
    fn error(&self, message: &str) {
        self.events.borrow_mut().push((Event::Error, message.to_string()));
    }
}
