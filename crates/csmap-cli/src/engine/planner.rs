//! Pagination planner and worker pool
//!
//! A run probes page 0 to learn the total record count, splits the total into
//! `ceil(count / limit)` pages, and lets a fixed pool of workers drain a closed
//! queue of page jobs. The probe's page is handed to the pool as job 0, so every
//! record is processed exactly once and page 0 is requested only once.
//!
//! The first fatal error (401, failed page, crashed worker) cancels the run:
//! the remaining workers stop before issuing further requests and the error is
//! returned to the caller.

use crate::api::{ActivityPage, PageRequest};
use crate::engine::fetcher::PageFetcher;
use crate::engine::normalize::normalize;
use crate::engine::progress::{ProgressSlot, ProgressTracker};
use crate::engine::store::DedupStore;
use crate::error::{CliError, Result};
use crate::progress::ProgressObserver;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

/// Records requested per page. The activity API caps `limit` at 1000.
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;

/// Workers fetching pages concurrently
pub const DEFAULT_WORKERS: usize = 10;

/// Path segments kept below the root
pub const DEFAULT_PATH_DEPTH: usize = 1;

/// Parameters of one aggregation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPlan {
    /// Window start, Unix milliseconds
    pub from: i64,
    /// Window end, Unix milliseconds
    pub to: i64,
    pub limit: u32,
    pub workers: usize,
    pub depth: usize,
}

impl RunPlan {
    pub fn new(from: i64, to: i64) -> Self {
        Self {
            from,
            to,
            limit: DEFAULT_PAGE_LIMIT,
            workers: DEFAULT_WORKERS,
            depth: DEFAULT_PATH_DEPTH,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Request for page `index`
    pub fn page(&self, index: u64) -> PageRequest {
        PageRequest::for_page(self.from, self.to, index, self.limit)
    }

    /// Reject plans that cannot run, before any request is made
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(CliError::config("page limit must be greater than 0"));
        }
        if self.workers == 0 {
            return Err(CliError::config("worker count must be greater than 0"));
        }
        Ok(())
    }
}

/// Number of pages needed for `total` records
pub fn jobs_count(total: u64, limit: u32) -> u64 {
    total.div_ceil(u64::from(limit.max(1)))
}

/// Outcome of a completed run
#[derive(Debug)]
pub struct Summary {
    /// Record count reported by the probe
    pub total_records: u64,
    /// Pages processed
    pub jobs: u64,
    /// Unique keys collected
    pub store: DedupStore,
}

struct PageJob {
    index: u64,
    prefetched: Option<ActivityPage>,
}

/// Drives a run against a [`PageFetcher`]
pub struct Planner<F> {
    fetcher: Arc<F>,
    observer: Arc<dyn ProgressObserver>,
}

impl<F: PageFetcher + 'static> Planner<F> {
    pub fn new(fetcher: Arc<F>, observer: Arc<dyn ProgressObserver>) -> Self {
        Self { fetcher, observer }
    }

    /// Execute `plan` and return the collected keys
    pub async fn run(&self, plan: &RunPlan) -> Result<Summary> {
        plan.validate()?;

        let cancel = CancellationToken::new();
        let probe = self.fetcher.fetch(&plan.page(0), &cancel).await?;
        let total_records = probe.count;
        let jobs = jobs_count(total_records, plan.limit);

        info!(
            count = total_records,
            jobs,
            workers = plan.workers,
            limit = plan.limit,
            "Planned run"
        );
        self.observer.on_plan(total_records, jobs);

        if jobs == 0 {
            self.observer.on_progress(100);
            self.observer.on_finish();
            return Ok(Summary {
                total_records,
                jobs,
                store: DedupStore::new(),
            });
        }

        let queue = fill_queue(jobs, probe)?;
        let store = Arc::new(DedupStore::new());
        let tracker = Arc::new(ProgressTracker::new(
            plan.workers,
            total_records,
            Arc::clone(&self.observer),
        ));

        let mut pool = JoinSet::new();
        for id in 0..plan.workers {
            let worker = Worker {
                id,
                plan: *plan,
                fetcher: Arc::clone(&self.fetcher),
                queue: Arc::clone(&queue),
                store: Arc::clone(&store),
                progress: tracker.slot(id),
                cancel: cancel.clone(),
            };
            pool.spawn(worker.run().instrument(info_span!("worker", id)));
        }

        let failure = join_all(&mut pool, &cancel).await;
        self.observer.on_finish();

        if let Some(err) = failure {
            return Err(err);
        }

        info!(
            unique_keys = store.len(),
            processed = tracker.done(),
            "Run complete"
        );

        // Workers are joined, so this is the last reference.
        let store = Arc::try_unwrap(store).unwrap_or_else(|shared| (*shared).clone());

        Ok(Summary {
            total_records,
            jobs,
            store,
        })
    }
}

type JobQueue = Arc<Mutex<mpsc::Receiver<PageJob>>>;

/// Queue holding every page job, already closed to new work
fn fill_queue(jobs: u64, probe: ActivityPage) -> Result<JobQueue> {
    let capacity = usize::try_from(jobs)
        .map_err(|_| CliError::config(format!("{} pages exceed the job queue capacity", jobs)))?;
    let (tx, rx) = mpsc::channel(capacity);

    let mut probe = Some(probe);
    for index in 0..jobs {
        let job = PageJob {
            index,
            prefetched: probe.take(),
        };
        tx.try_send(job)
            .map_err(|e| CliError::worker(format!("job queue rejected page: {}", e)))?;
    }

    Ok(Arc::new(Mutex::new(rx)))
}

/// Join every worker. The first real failure cancels the rest; an
/// authentication failure from any worker outranks other failures.
async fn join_all(
    pool: &mut JoinSet<Result<()>>,
    cancel: &CancellationToken,
) -> Option<CliError> {
    let mut failure: Option<CliError> = None;

    while let Some(joined) = pool.join_next().await {
        let outcome = joined.map_err(|e| {
            let reason = if e.is_panic() { "panicked" } else { "was aborted" };
            CliError::worker(reason)
        });

        let err = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) | Err(err) => err,
        };

        if err.is_cancellation() {
            continue;
        }

        match failure.take() {
            None => {
                warn!(error = %err, "Aborting run");
                // Workers cancel on their own failures; panics only surface here.
                cancel.cancel();
                failure = Some(err);
            },
            Some(first) if is_unauthorized(&err) && !is_unauthorized(&first) => {
                debug!(replaced = %first, "Authentication failure takes precedence");
                failure = Some(err);
            },
            Some(first) => {
                debug!(error = %err, "Additional failure after abort");
                failure = Some(first);
            },
        }
    }

    failure
}

fn is_unauthorized(err: &CliError) -> bool {
    matches!(err, CliError::Unauthorized { .. })
}

struct Worker<F> {
    id: usize,
    plan: RunPlan,
    fetcher: Arc<F>,
    queue: JobQueue,
    store: Arc<DedupStore>,
    progress: ProgressSlot,
    cancel: CancellationToken,
}

impl<F: PageFetcher> Worker<F> {
    async fn run(self) -> Result<()> {
        let mut pages = 0u64;

        loop {
            let job = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(pages, "Cancelled");
                    return Ok(());
                },
                job = next_job(&self.queue) => job,
            };

            let Some(job) = job else {
                debug!(pages, "Queue drained");
                return Ok(());
            };

            let page = match job.prefetched {
                Some(page) => page,
                None => self.fetch(job.index).await?,
            };

            self.process(&page);
            pages += 1;
        }
    }

    async fn fetch(&self, index: u64) -> Result<ActivityPage> {
        let request = self.plan.page(index);

        match self.fetcher.fetch(&request, &self.cancel).await {
            Ok(page) => Ok(page),
            Err(err) => {
                if !err.is_cancellation() {
                    warn!(worker = self.id, offset = request.offset, error = %err, "Page failed");
                    self.cancel.cancel();
                }
                Err(err)
            },
        }
    }

    fn process(&self, page: &ActivityPage) {
        for record in &page.results {
            self.store.insert(normalize(record, self.plan.depth));
            self.progress.record(1);
        }
        debug!(
            offset = page.offset,
            records = page.results.len(),
            worker = self.id,
            "Processed page"
        );
    }
}

async fn next_job(queue: &JobQueue) -> Option<PageJob> {
    queue.lock().await.recv().await
}
