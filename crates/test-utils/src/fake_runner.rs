use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pipeflow::exec::{ScriptOutcome, ScriptRunner};

/// A fake runner that:
/// - records which scripts were "run", in start order
/// - reports exit 0 with output `ran: <script>` unless told otherwise
/// - optionally sleeps to keep several scripts in flight at once
#[derive(Clone, Default)]
pub struct FakeRunner {
    outcomes: Arc<Mutex<HashMap<String, i32>>>,
    panics: Arc<Mutex<Vec<String>>>,
    executed: Arc<Mutex<Vec<String>>>,
    delay: Option<Duration>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `exit_status` for `script`.
    pub fn exit_with(self, script: &str, exit_status: i32) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(script.to_string(), exit_status);
        self
    }

    /// Panic while running `script`.
    pub fn panic_on(self, script: &str) -> Self {
        self.panics.lock().unwrap().push(script.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Highest number of scripts that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl ScriptRunner for FakeRunner {
    fn run(&self, script: String) -> Pin<Box<dyn Future<Output = ScriptOutcome> + Send + '_>> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(script.clone());

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.panics.lock().unwrap().contains(&script) {
                panic!("fake runner asked to panic on '{script}'");
            }

            let exit_status = self
                .outcomes
                .lock()
                .unwrap()
                .get(&script)
                .copied()
                .unwrap_or(0);

            ScriptOutcome {
                exit_status,
                output: format!("ran: {script}\n"),
            }
        })
    }
}
