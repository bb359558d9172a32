//! Concurrency-limited scan runner
//!
//! Enumerates projects through the gateway, then scans them from a bounded
//! pool of worker threads. Workers pull the next project index from a shared
//! counter and send outcomes over a channel to a single collector, which owns
//! the aggregator and emits progress. One project's failure never stops the
//! run; listing failures do (a run that cannot enumerate has nothing to
//! report).

use crate::gitlab::{GitLabError, ProjectHost, ProjectQuery};
use crate::report::{ScanAggregator, ScanReport};
use crate::scan::scan_project;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

/// Default number of projects scanned concurrently.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Cooperative cancellation flag shared between the caller and the workers.
///
/// Once cancelled, no new page fetches or project scans start; in-flight
/// scans finish and their outcomes are kept.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress after each completed project scan. `total` is the number of
/// enumerated projects; with mid-run cancellation `completed` stops short
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Everything a scan run needs besides the gateway.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub package: String,
    pub query: ProjectQuery,
    pub concurrency: usize,
}

impl ScanOptions {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            query: ProjectQuery::default(),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Enumerate and scan projects; block until done or cancelled.
///
/// `on_progress` is called from the collector after every finished project.
/// Errors returned here are run-level (auth, missing group, enumeration
/// failure); per-project errors end up in the report instead.
pub fn run_scan(
    host: &dyn ProjectHost,
    options: &ScanOptions,
    cancel: &CancelFlag,
    mut on_progress: impl FnMut(Progress),
) -> Result<ScanReport, GitLabError> {
    let mut projects = Vec::new();
    for page in host.projects(&options.query) {
        projects.extend(page?);
        if cancel.is_cancelled() {
            break;
        }
    }

    let total = projects.len();
    let mut aggregator = ScanAggregator::new(&options.package);
    if total == 0 {
        return Ok(aggregator.finalize());
    }

    let workers = options.concurrency.clamp(1, total);
    let next_job = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        let next_job = &next_job;
        let projects = &projects;
        let package = options.package.as_str();

        for _ in 0..workers {
            let tx = tx.clone();
            let cancel = cancel.clone();
            scope.spawn(move || {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = next_job.fetch_add(1, Ordering::SeqCst);
                    if index >= projects.len() {
                        break;
                    }
                    let outcome = scan_project(host, &projects[index], package);
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        // The collector's receive loop ends when every worker has dropped
        // its sender.
        drop(tx);

        let mut completed = 0;
        for outcome in rx {
            completed += 1;
            aggregator.add(outcome);
            on_progress(Progress { completed, total });
        }
    });

    Ok(aggregator.finalize())
}
