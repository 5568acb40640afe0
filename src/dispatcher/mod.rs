use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use indicatif::ProgressBar;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::executor::{Outcome, RequestExecutor};
use crate::filter::FilterEngine;
use crate::generator::Combination;
use crate::output::HitRecord;
use crate::skip::SkipTracker;
use crate::stop::StopSignal;

// Idle -> Running -> (Draining | Stopped) -> Finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    Running,
    // stop observed while units were still in flight
    Draining,
    // stop observed with nothing in flight
    Stopped,
    Finished,
}

#[derive(Debug)]
struct RunState {
    state: DispatchState,
    completed: u64,
    skipped: u64,
    errors: u64,
    hits: Vec<Outcome>,
    skip: SkipTracker,
}

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub total: u64,
    pub completed: u64,
    pub skipped: u64,
    pub errors: u64,
    pub hits: Vec<Outcome>,
    pub stop_placeholder: Option<String>,
    pub found_values: Vec<String>,
    pub elapsed: Duration,
    pub interrupted: bool,
}

impl RunSummary {
    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }
}

// all state shared between units, behind one lock
pub struct Aggregator {
    total: u64,
    started: Instant,
    stop: StopSignal,
    progress: ProgressBar,
    inner: Mutex<RunState>,
}

impl Aggregator {
    pub fn new(total: u64, skip: SkipTracker, stop: StopSignal, progress: ProgressBar) -> Self {
        progress.set_length(total);
        Self {
            total,
            started: Instant::now(),
            stop,
            progress,
            inner: Mutex::new(RunState {
                state: DispatchState::Idle,
                completed: 0,
                skipped: 0,
                errors: 0,
                hits: Vec::new(),
                skip,
            }),
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub async fn state(&self) -> DispatchState {
        self.inner.lock().await.state
    }

    async fn transition(&self, next: DispatchState) {
        let mut state = self.inner.lock().await;
        info!("dispatcher {:?} -> {:?}", state.state, next);
        state.state = next;
    }

    pub async fn should_skip(&self, combination: &Combination) -> bool {
        self.inner.lock().await.skip.should_skip(combination)
    }

    pub async fn record_skipped(&self) {
        let mut state = self.inner.lock().await;
        state.completed += 1;
        state.skipped += 1;
        self.tick(state.completed);
    }

    pub async fn record(&self, outcome: Outcome, hit: bool) -> Option<HitRecord> {
        let mut state = self.inner.lock().await;
        state.completed += 1;
        if outcome.is_transport_error() {
            state.errors += 1;
        }
        state.skip.record_if_hit(&outcome.combination, hit);
        let record = if hit {
            let record = HitRecord::from(&outcome);
            state.hits.push(outcome);
            Some(record)
        } else {
            None
        };
        self.tick(state.completed);
        record
    }

    fn tick(&self, completed: u64) {
        if !self.stop.is_requested() {
            self.progress.set_position(completed);
        }
    }

    async fn finish(&self, interrupted: bool) -> RunSummary {
        let mut state = self.inner.lock().await;
        RunSummary {
            total: self.total,
            completed: state.completed,
            skipped: state.skipped,
            errors: state.errors,
            hits: std::mem::take(&mut state.hits),
            stop_placeholder: state.skip.placeholder().map(|p| p.to_string()),
            found_values: state.skip.found_sorted(),
            elapsed: self.started.elapsed(),
            interrupted,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub total: u64,
    pub concurrency: usize,
    // requests per second, 0 = unlimited
    pub rate: u32,
    pub stop_placeholder: Option<String>,
}

// At most `concurrency` requests run at once and at most `2 * concurrency`
// units are submitted but not yet joined.
pub struct Dispatcher {
    executor: Arc<RequestExecutor>,
    filter: Arc<FilterEngine>,
    aggregator: Arc<Aggregator>,
    stop: StopSignal,
    concurrency: usize,
    rate: u32,
    hit_tx: Option<mpsc::Sender<HitRecord>>,
}

impl Dispatcher {
    pub fn new(
        executor: RequestExecutor,
        filter: FilterEngine,
        config: DispatchConfig,
        stop: StopSignal,
        progress: ProgressBar,
    ) -> Self {
        let skip = SkipTracker::new(config.stop_placeholder);
        let aggregator = Aggregator::new(config.total, skip, stop.clone(), progress);
        Self {
            executor: Arc::new(executor),
            filter: Arc::new(filter),
            aggregator: Arc::new(aggregator),
            stop,
            concurrency: config.concurrency.max(1),
            rate: config.rate,
            hit_tx: None,
        }
    }

    // hits are sent here as soon as they are recorded
    pub fn with_hits(mut self, tx: mpsc::Sender<HitRecord>) -> Self {
        self.hit_tx = Some(tx);
        self
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.clone()
    }

    pub async fn run<I>(self, combinations: I) -> RunSummary
    where
        I: IntoIterator<Item = Combination>,
    {
        let window = self.concurrency * 2;
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let limiter = NonZeroU32::new(self.rate).map(|r| RateLimiter::direct(Quota::per_second(r)));
        let mut in_flight: VecDeque<JoinHandle<()>> = VecDeque::with_capacity(window);

        self.aggregator.transition(DispatchState::Running).await;

        for combination in combinations {
            if self.stop.is_requested() {
                break;
            }
            while in_flight.len() >= window {
                if let Some(handle) = in_flight.pop_front() {
                    join_unit(handle).await;
                }
            }
            if self.aggregator.should_skip(&combination).await {
                self.aggregator.record_skipped().await;
                continue;
            }
            if let Some(limiter) = limiter.as_ref() {
                limiter.until_ready().await;
            }
            if self.stop.is_requested() {
                break;
            }
            in_flight.push_back(self.spawn_unit(combination, permits.clone()));
        }

        let interrupted = self.stop.is_requested();
        if interrupted {
            info!(
                "stop requested, draining {} submitted requests",
                in_flight.len()
            );
            let next = if in_flight.is_empty() {
                DispatchState::Stopped
            } else {
                DispatchState::Draining
            };
            self.aggregator.transition(next).await;
        }

        while let Some(handle) = in_flight.pop_front() {
            join_unit(handle).await;
        }
        self.aggregator.transition(DispatchState::Finished).await;
        self.aggregator.finish(interrupted).await
    }

    fn spawn_unit(&self, combination: Combination, permits: Arc<Semaphore>) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let filter = self.filter.clone();
        let aggregator = self.aggregator.clone();
        let stop = self.stop.clone();
        let hit_tx = self.hit_tx.clone();
        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            // units still queued behind the permit when a stop arrives are abandoned
            if stop.is_requested() {
                return;
            }
            if aggregator.should_skip(&combination).await {
                aggregator.record_skipped().await;
                return;
            }
            let outcome = executor.execute(combination).await;
            let hit = filter.matches(&outcome);
            if let Some(record) = aggregator.record(outcome, hit).await {
                if let Some(tx) = hit_tx {
                    let _ = tx.send(record).await;
                }
            }
        })
    }
}

async fn join_unit(handle: JoinHandle<()>) {
    if let Err(e) = handle.await {
        warn!("request worker failed: {e}");
    }
}
