use std::any::Any;
use std::collections::VecDeque;
use std::iter;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use super::transcription_runner::{TranscriptionRequest, TranscriptionRunner};
use crate::capabilities::domain::feature_flags::FeatureFlags;

/// Narration of a whole batch, one line at a time.
pub type BatchLines = Box<dyn Iterator<Item = String> + Send>;

/// Captions several items of one collection.
pub struct ParallelScheduler {
    runner: TranscriptionRunner,
}

struct ItemOutcome {
    item: String,
    result: Result<Vec<String>, String>,
}

impl ParallelScheduler {
    pub fn new(runner: TranscriptionRunner) -> Self {
        Self { runner }
    }

    /// Run `items` on up to `max_workers` threads.
    ///
    /// Each item's narration is buffered and emitted as one block when the
    /// item finishes, so blocks appear in completion order and never
    /// interleave. A panicking item becomes an error block; the others
    /// carry on.
    pub fn run_parallel(
        &self,
        collection: &str,
        items: Vec<String>,
        max_workers: usize,
        features: FeatureFlags,
    ) -> BatchNarration {
        BatchNarration {
            pending: VecDeque::new(),
            state: BatchState::NotStarted {
                runner: self.runner.clone(),
                collection: collection.to_string(),
                items,
                max_workers,
                features,
            },
        }
    }

    /// Run `items` one after another, streaming each narration live under
    /// a `=== item ===` banner.
    pub fn run_sequential(
        &self,
        collection: &str,
        items: Vec<String>,
        features: FeatureFlags,
    ) -> BatchLines {
        let runner = self.runner.clone();
        let collection = collection.to_string();
        Box::new(items.into_iter().flat_map(move |item| {
            let request = TranscriptionRequest::new(collection.as_str(), item.as_str())
                .with_features(features);
            iter::once(format!("=== {item} ===")).chain(runner.run(request))
        }))
    }
}

pub struct BatchNarration {
    pending: VecDeque<String>,
    state: BatchState,
}

enum BatchState {
    NotStarted {
        runner: TranscriptionRunner,
        collection: String,
        items: Vec<String>,
        max_workers: usize,
        features: FeatureFlags,
    },
    Running {
        outcomes: Receiver<ItemOutcome>,
        remaining: usize,
        workers: Vec<JoinHandle<()>>,
    },
    Finished,
}

impl Iterator for BatchNarration {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }

            match std::mem::replace(&mut self.state, BatchState::Finished) {
                BatchState::NotStarted {
                    runner,
                    collection,
                    items,
                    max_workers,
                    features,
                } => {
                    let max_workers = max_workers.max(1);
                    self.pending.push_back(format!(
                        "Starting parallel transcription of {} files with {max_workers} workers",
                        items.len()
                    ));
                    if items.is_empty() {
                        continue;
                    }
                    let remaining = items.len();
                    let workers = max_workers.min(remaining);
                    let (outcomes, handles) =
                        spawn_workers(runner, collection, items, workers, features);
                    self.state = BatchState::Running {
                        outcomes,
                        remaining,
                        workers: handles,
                    };
                }
                BatchState::Running {
                    outcomes,
                    remaining,
                    workers,
                } => {
                    if remaining == 0 {
                        join_workers(workers);
                        continue;
                    }
                    let Ok(outcome) = outcomes.recv() else {
                        log::error!("Transcription workers exited with {remaining} items left");
                        join_workers(workers);
                        continue;
                    };
                    self.pending.extend(block(outcome));
                    self.state = BatchState::Running {
                        outcomes,
                        remaining: remaining - 1,
                        workers,
                    };
                }
                BatchState::Finished => return None,
            }
        }
    }
}

fn spawn_workers(
    runner: TranscriptionRunner,
    collection: String,
    items: Vec<String>,
    workers: usize,
    features: FeatureFlags,
) -> (Receiver<ItemOutcome>, Vec<JoinHandle<()>>) {
    let (work_tx, work_rx) = crossbeam_channel::unbounded::<String>();
    for item in items {
        // Receiver is alive; send cannot fail.
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    let handles = (0..workers)
        .map(|_| {
            let runner = runner.clone();
            let collection = collection.clone();
            let work_rx = work_rx.clone();
            let done_tx: Sender<ItemOutcome> = done_tx.clone();
            thread::spawn(move || {
                for item in work_rx {
                    let outcome = transcribe_buffered(&runner, &collection, item, features);
                    if done_tx.send(outcome).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();

    (done_rx, handles)
}

fn transcribe_buffered(
    runner: &TranscriptionRunner,
    collection: &str,
    item: String,
    features: FeatureFlags,
) -> ItemOutcome {
    let request = TranscriptionRequest::new(collection, item.as_str()).with_features(features);
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        runner
            .run(request)
            .map(|line| format!("[{item}] {line}"))
            .collect::<Vec<_>>()
    }))
    .map_err(|payload| {
        let message = panic_message(payload.as_ref());
        log::error!("Transcription of {item} panicked: {message}");
        message
    });
    ItemOutcome { item, result }
}

fn block(outcome: ItemOutcome) -> Vec<String> {
    let item = outcome.item;
    match outcome.result {
        Ok(lines) => iter::once(format!("=== COMPLETED: {item} ==="))
            .chain(lines)
            .chain(iter::once(format!("=== END: {item} ===")))
            .collect(),
        Err(message) => vec![
            format!("=== ERROR: {item} ==="),
            format!("Exception: {message}"),
            format!("=== END ERROR: {item} ==="),
        ],
    }
}

fn join_workers(workers: Vec<JoinHandle<()>>) {
    for worker in workers {
        if worker.join().is_err() {
            log::error!("Transcription worker panicked");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
