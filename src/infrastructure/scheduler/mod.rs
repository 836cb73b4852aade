//! Cron scheduler - runs registered jobs on their schedules.
//!
//! Uses `croner` for cron expression parsing. Schedules are read in the host's
//! local time zone. Every job gets its own tokio task that sleeps until the next
//! occurrence, so one slow job never delays another. A firing runs in a child
//! task; a panic there is logged and the job keeps its schedule. Manual triggers
//! are counted, so each request produces one run.

use chrono::{DateTime, Local, TimeZone};
use croner::errors::CronError;
use croner::Cron;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::application::errors::ConfigError;

pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Body of a scheduled job; called once per firing
pub type JobFn = Arc<dyn Fn() -> JobFuture + Send + Sync>;

struct ScheduledJob {
    id: String,
    cron: Cron,
    run: JobFn,
    trigger: Notify,
    pending: AtomicUsize,
}

impl ScheduledJob {
    /// Consume one queued manual trigger, if any
    fn take_pending(&self) -> bool {
        self.pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct CronScheduler {
    jobs: RwLock<BTreeMap<String, Arc<ScheduledJob>>>,
    started: AtomicBool,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl CronScheduler {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(BTreeMap::new()),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Parse a 5-field cron expression; a leading seconds field is accepted too
    pub fn parse(id: &str, schedule: &str) -> Result<Cron, ConfigError> {
        Cron::new(schedule)
            .with_seconds_optional()
            .parse()
            .map_err(|e| ConfigError::InvalidSchedule {
                job: id.to_string(),
                schedule: schedule.to_string(),
                reason: e.to_string(),
            })
    }

    /// Add a job. Jobs added after `start` begin running immediately.
    pub fn add(&self, id: impl Into<String>, schedule: &str, run: JobFn) -> Result<(), ConfigError> {
        let id = id.into();
        let cron = Self::parse(&id, schedule)?;

        let job = Arc::new(ScheduledJob {
            id: id.clone(),
            cron,
            run,
            trigger: Notify::new(),
            pending: AtomicUsize::new(0),
        });

        {
            let mut jobs = self
                .jobs
                .write()
                .map_err(|_| ConfigError::Parse("Lock poisoned".to_string()))?;
            if jobs.contains_key(&id) {
                return Err(ConfigError::DuplicateJob(id));
            }
            jobs.insert(id.clone(), job.clone());
        }

        info!(job_id = %id, "Registered job on schedule {}", schedule);

        if self.started.load(Ordering::SeqCst) {
            self.spawn_job(job);
        }
        Ok(())
    }

    /// Start the per-job loops
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let jobs: Vec<Arc<ScheduledJob>> = self
            .jobs
            .read()
            .map(|jobs| jobs.values().cloned().collect())
            .unwrap_or_default();

        info!("Cron scheduler started with {} jobs", jobs.len());
        for job in jobs {
            self.spawn_job(job);
        }
    }

    /// Run a job now without touching its schedule. Unknown ids return the known ones.
    pub fn trigger(&self, id: &str) -> Result<(), Vec<String>> {
        let job = self.jobs.read().ok().and_then(|jobs| jobs.get(id).cloned());

        match job {
            Some(job) => {
                job.pending.fetch_add(1, Ordering::SeqCst);
                job.trigger.notify_one();
                Ok(())
            }
            None => Err(self.ids()),
        }
    }

    /// All job ids, sorted
    pub fn ids(&self) -> Vec<String> {
        self.jobs
            .read()
            .map(|jobs| jobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Stop scheduling and wait for running jobs to finish
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        info!("Cron scheduler stopped");
    }

    fn spawn_job(&self, job: Arc<ScheduledJob>) {
        let cancel = self.cancel.clone();
        let tracker = self.tracker.clone();
        self.tracker.spawn(run_job(job, cancel, tracker));
    }
}

impl Default for CronScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Next firing strictly after `now`, in `now`'s time zone
fn next_run<Tz: TimeZone>(cron: &Cron, now: &DateTime<Tz>) -> Result<DateTime<Tz>, CronError> {
    cron.find_next_occurrence(now, false)
}

async fn run_job(job: Arc<ScheduledJob>, cancel: CancellationToken, tracker: TaskTracker) {
    loop {
        if cancel.is_cancelled() {
            return;
        }

        if job.take_pending() {
            info!(job_id = %job.id, "Job triggered manually");
        } else {
            let now = Local::now();
            let next = match next_run(&job.cron, &now) {
                Ok(next) => next,
                Err(e) => {
                    error!(job_id = %job.id, "No next run time: {}", e);
                    return;
                }
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => debug!(job_id = %job.id, "Job fired"),
                _ = job.trigger.notified() => continue,
            }
        }

        if let Err(e) = tracker.spawn((job.run)()).await {
            error!(job_id = %job.id, "Job panicked: {}", e);
        }
    }
}
