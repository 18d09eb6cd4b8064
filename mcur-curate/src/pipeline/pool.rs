//! Curation worker pool
//!
//! Fixed number of std threads pulling jobs from a shared queue. Curation is
//! CPU-bound and every invocation is independent, so workers never wait on
//! each other; outcomes are pushed to an mpsc channel as they complete and
//! carry the input index so callers can restore input order.
//!
//! **Cancellation:** [`CurationPool::cancel`] (or a [`CancelHandle`] held by
//! another thread) stops workers from pulling new jobs. Sequences already in
//! progress finish and are reported; jobs still queued are returned as
//! cancelled by [`CurationPool::finish`].

use super::{CurationInput, CurationPipeline};
use crate::types::CurationResult;
use mcur_common::DataIntegrityError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Result of one pulled job
#[derive(Debug, Clone, PartialEq)]
pub enum CurationOutcome {
    Curated {
        index: usize,
        result: CurationResult,
    },
    /// The input failed validation and was not curated
    Excluded {
        index: usize,
        error: DataIntegrityError,
    },
}

impl CurationOutcome {
    pub fn index(&self) -> usize {
        match self {
            CurationOutcome::Curated { index, .. } | CurationOutcome::Excluded { index, .. } => {
                *index
            }
        }
    }
}

/// Everything a finished pool produced
#[derive(Debug, Default)]
pub struct PoolSummary {
    /// Outcomes in completion order, inputs excluded at submission first
    pub outcomes: Vec<CurationOutcome>,
    /// Indexes of jobs never pulled because the pool was cancelled
    pub cancelled: Vec<usize>,
}

/// State shared between the pool handle and its workers
struct PoolState {
    queue: Mutex<VecDeque<(usize, CurationInput)>>,
    /// Signalled on submit, close, and cancel
    condvar: Condvar,
    /// No more jobs will be submitted
    closed: AtomicBool,
    cancelled: AtomicBool,
    completed: AtomicUsize,
}

impl PoolState {
    fn queue(&self) -> MutexGuard<'_, VecDeque<(usize, CurationInput)>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle that cancels a running pool
#[derive(Clone)]
pub struct CancelHandle {
    state: Arc<PoolState>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }
}

/// Fixed-size pool running a [`CurationPipeline`] over submitted inputs
pub struct CurationPool {
    state: Arc<PoolState>,
    workers: Vec<JoinHandle<()>>,
    outcomes: Receiver<CurationOutcome>,
    /// Inputs excluded at submission, before reaching a worker
    undecodable: Vec<CurationOutcome>,
    next_index: usize,
}

impl CurationPool {
    /// Start `workers` threads (at least one)
    pub fn new(pipeline: CurationPipeline, workers: usize) -> Self {
        let state = Arc::new(PoolState {
            queue: Mutex::new(VecDeque::new()),
            condvar: Condvar::new(),
            closed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
        });
        let (tx, rx) = mpsc::channel();

        let worker_count = workers.max(1);
        let workers = (0..worker_count)
            .map(|worker_id| {
                let state = Arc::clone(&state);
                let pipeline = pipeline.clone();
                let tx = tx.clone();
                thread::Builder::new()
                    .name(format!("mcur-curate-{}", worker_id))
                    .spawn(move || worker_loop(worker_id, state, pipeline, tx))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("Failed to spawn curation worker: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        info!(workers = workers.len(), "Curation pool started");

        Self {
            state,
            workers,
            outcomes: rx,
            undecodable: Vec::new(),
            next_index: 0,
        }
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Queue one input; returns its index
    pub fn submit(&mut self, input: CurationInput) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        self.state.queue().push_back((index, input));
        self.state.condvar.notify_one();
        index
    }

    /// Queue every input in order; returns the number queued
    pub fn submit_all<I>(&mut self, inputs: I) -> usize
    where
        I: IntoIterator<Item = CurationInput>,
    {
        let start = self.next_index;
        {
            let mut queue = self.state.queue();
            for input in inputs {
                queue.push_back((self.next_index, input));
                self.next_index += 1;
            }
        }
        self.state.condvar.notify_all();
        self.next_index - start
    }

    /// Record an input that could not be decoded; it takes the next index
    /// and is reported as excluded without being queued
    pub fn exclude(&mut self, error: DataIntegrityError) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        debug!(index, error = %error, "Excluding undecodable input");
        self.undecodable.push(CurationOutcome::Excluded { index, error });
        index
    }

    /// Stop pulling new jobs
    pub fn cancel(&self) {
        self.cancel_handle().cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Jobs still waiting in the queue
    pub fn queue_len(&self) -> usize {
        self.state.queue().len()
    }

    /// Jobs finished so far
    pub fn completed(&self) -> usize {
        self.state.completed.load(Ordering::SeqCst)
    }

    /// Outcomes available right now, without blocking
    pub fn try_outcomes(&self) -> impl Iterator<Item = CurationOutcome> + '_ {
        self.outcomes.try_iter()
    }

    /// Close the queue, wait for the workers and collect everything
    pub fn finish(mut self) -> PoolSummary {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.condvar.notify_all();

        for (idx, handle) in self.workers.drain(..).enumerate() {
            if let Err(e) = handle.join() {
                error!("Curation worker {} panicked: {:?}", idx, e);
            }
        }

        let mut outcomes = std::mem::take(&mut self.undecodable);
        outcomes.extend(self.outcomes.try_iter());
        let cancelled: Vec<usize> = self.state.queue().drain(..).map(|(index, _)| index).collect();

        info!(
            outcomes = outcomes.len(),
            cancelled = cancelled.len(),
            "Curation pool finished"
        );
        PoolSummary {
            outcomes,
            cancelled,
        }
    }
}

impl Drop for CurationPool {
    fn drop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        // Dropped without finish(): stop promptly
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.condvar.notify_all();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    state: Arc<PoolState>,
    pipeline: CurationPipeline,
    tx: Sender<CurationOutcome>,
) {
    debug!("Curation worker {} started", worker_id);

    loop {
        let job = {
            let mut queue = state.queue();
            loop {
                if state.cancelled.load(Ordering::SeqCst) {
                    break None;
                }
                if let Some(job) = queue.pop_front() {
                    break Some(job);
                }
                if state.closed.load(Ordering::SeqCst) {
                    break None;
                }
                queue = state
                    .condvar
                    .wait(queue)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let Some((index, input)) = job else {
            break;
        };

        let outcome = match pipeline.curate(input) {
            Ok(result) => CurationOutcome::Curated { index, result },
            Err(error) => {
                debug!(index, error = %error, "Excluding sequence");
                CurationOutcome::Excluded { index, error }
            }
        };
        state.completed.fetch_add(1, Ordering::SeqCst);

        if tx.send(outcome).is_err() {
            break;
        }
    }

    debug!("Curation worker {} stopped", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExecutionPlan, PlanEntry};
    use crate::error::RuleError;
    use crate::types::{Outcome, TestRule};
    use mcur_common::{Note, Sequence};
    use serde_json::Value;
    use std::sync::mpsc::SyncSender;

    fn pipeline() -> CurationPipeline {
        CurationPipeline::new(Arc::new(ExecutionPlan::default()))
    }

    fn input(pitch: u8) -> CurationInput {
        CurationInput::new(vec![Note::new(pitch, 0.0, 1.0, 80, 0)])
    }

    #[test]
    fn test_every_job_reported_once() {
        let mut pool = CurationPool::new(pipeline(), 4);
        assert_eq!(pool.worker_count(), 4);
        assert_eq!(pool.submit_all((0..50).map(|i| input(i as u8))), 50);

        let summary = pool.finish();
        assert!(summary.cancelled.is_empty());
        let mut indexes: Vec<usize> = summary.outcomes.iter().map(CurationOutcome::index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_outcome_carries_its_input() {
        let mut pool = CurationPool::new(pipeline(), 2);
        for pitch in 40..60 {
            pool.submit(input(pitch));
        }
        for outcome in pool.finish().outcomes {
            match outcome {
                CurationOutcome::Curated { index, result } => {
                    assert_eq!(result.sequence.notes()[0].pitch as usize, 40 + index);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_invalid_input_excluded() {
        let mut pool = CurationPool::new(pipeline(), 1);
        pool.submit(input(60));
        pool.submit(CurationInput::new(vec![Note::new(200, 0.0, 1.0, 80, 0)]));
        let summary = pool.finish();
        let excluded: Vec<usize> = summary
            .outcomes
            .iter()
            .filter(|o| matches!(o, CurationOutcome::Excluded { .. }))
            .map(CurationOutcome::index)
            .collect();
        assert_eq!(excluded, vec![1]);
    }

    #[test]
    fn test_cancel_before_work_cancels_everything() {
        let mut pool = CurationPool::new(pipeline(), 2);
        pool.cancel();
        pool.submit_all((0..10).map(|i| input(i as u8)));
        let summary = pool.finish();
        assert!(summary.outcomes.is_empty());
        assert_eq!(summary.cancelled, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_cancel_handle_from_another_thread() {
        let mut pool = CurationPool::new(pipeline(), 1);
        let handle = pool.cancel_handle();
        thread::spawn(move || handle.cancel()).join().unwrap();
        assert!(pool.cancel_handle().is_cancelled());
        pool.submit(input(60));
        let summary = pool.finish();
        assert_eq!(summary.outcomes.len() + summary.cancelled.len(), 1);
    }

    /// Signals when it starts and then holds its worker until released
    #[derive(Debug)]
    struct HoldingRule {
        started: Mutex<SyncSender<()>>,
        release: Mutex<Receiver<()>>,
    }

    impl TestRule for HoldingRule {
        fn evaluate(&self, _sequence: &Sequence) -> Result<Outcome, RuleError> {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.release.lock().unwrap().recv();
            Ok(Outcome::pass(Value::Null))
        }
    }

    #[test]
    fn test_cancel_while_sequence_in_progress() {
        let (started_tx, started_rx) = mpsc::sync_channel(4);
        let (release_tx, release_rx) = mpsc::channel();
        let rule = HoldingRule {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        };
        let plan = ExecutionPlan {
            tests: vec![PlanEntry::new("holding", "holding", Value::Null, Arc::new(rule) as Arc<dyn TestRule>)],
            ..ExecutionPlan::default()
        };

        let mut pool = CurationPool::new(CurationPipeline::new(Arc::new(plan)), 1);
        pool.submit_all((0..3).map(|i| input(60 + i)));

        // index 0 is now inside the gate on the only worker
        started_rx.recv().unwrap();
        pool.cancel();
        release_tx.send(()).unwrap();
        drop(release_tx);

        let summary = pool.finish();
        let finished: Vec<usize> = summary.outcomes.iter().map(CurationOutcome::index).collect();
        assert_eq!(finished, vec![0]);
        assert!(matches!(
            &summary.outcomes[0],
            CurationOutcome::Curated { result, .. } if result.admitted
        ));
        assert_eq!(summary.cancelled, vec![1, 2]);
    }

    #[test]
    fn test_excluded_at_submission_keeps_its_index() {
        let mut pool = CurationPool::new(pipeline(), 2);
        assert_eq!(pool.submit(input(60)), 0);
        assert_eq!(pool.exclude(DataIntegrityError::MalformedRecord("bad".into())), 1);
        assert_eq!(pool.submit(input(62)), 2);

        let summary = pool.finish();
        assert!(summary.cancelled.is_empty());
        let mut indexes: Vec<usize> = summary.outcomes.iter().map(CurationOutcome::index).collect();
        indexes.sort_unstable();
        assert_eq!(indexes, vec![0, 1, 2]);
        assert!(matches!(
            &summary.outcomes[0],
            CurationOutcome::Excluded { index: 1, error: DataIntegrityError::MalformedRecord(_) }
        ));
    }

    #[test]
    fn test_zero_workers_clamped() {
        let pool = CurationPool::new(pipeline(), 0);
        assert_eq!(pool.worker_count(), 1);
    }
}
