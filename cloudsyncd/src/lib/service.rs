use std::{any::Any, fmt, panic::AssertUnwindSafe, time::Duration};

use cloudsync::SyncPlan;
use futures::{Future, FutureExt};
use tokio::time::Instant;

use crate::storage::{self, fs::LocalDir, Deleted};

/// Time source of the sync loop
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep_until(&self, deadline: Instant) -> impl Future<Output = ()> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    Upload,
    Overwrite,
    Delete,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Upload => f.write_str("upload"),
            Op::Overwrite => f.write_str("overwrite"),
            Op::Delete => f.write_str("delete"),
        }
    }
}

/// What happened to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    /// Not an error, but the operation had no effect
    Skipped(String),
    Failed(cloudsync::Error),
}

/// Summary of one sync cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub uploaded: Vec<String>,
    pub overwritten: Vec<String>,
    pub deleted: Vec<String>,
    pub skipped: Vec<(Op, String)>,
    pub failed: Vec<(Op, String, cloudsync::Error)>,
}

impl CycleReport {
    fn record(&mut self, op: Op, name: &str, outcome: Outcome) {
        let name = name.to_string();
        match outcome {
            Outcome::Done => match op {
                Op::Upload => self.uploaded.push(name),
                Op::Overwrite => self.overwritten.push(name),
                Op::Delete => self.deleted.push(name),
            },
            Outcome::Skipped(..) => self.skipped.push((op, name)),
            Outcome::Failed(err) => self.failed.push((op, name, err)),
        }
    }

    /// Number of operations that changed the remote folder
    pub fn mutations(&self) -> usize {
        self.uploaded.len() + self.overwritten.len() + self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} uploaded, {} overwritten, {} deleted, {} skipped, {} failed",
            self.uploaded.len(),
            self.overwritten.len(),
            self.deleted.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Mirrors a local folder onto a remote folder, one cycle per period.
#[derive(Debug)]
pub struct Service<R> {
    local: LocalDir,
    remote: R,
    period: Duration,
}

impl<R> Service<R> {
    pub fn new(local: LocalDir, remote: R, period: Duration) -> cloudsync::Result<Self> {
        if period.is_zero() {
            cloudsync::config_bail!("The sync period can't be zero");
        }
        Ok(Self {
            local,
            remote,
            period,
        })
    }

    pub fn local(&self) -> &LocalDir {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl<R> Service<R>
where
    R: storage::RemoteStore,
{
    /// Runs the sync loop. Never returns.
    pub async fn run<C: Clock>(&self, clock: &C) {
        log::info!(
            "Starting sync of {} every {}s",
            self.local.root(),
            self.period.as_secs()
        );
        loop {
            self.tick(clock).await;
        }
    }

    /// Runs one cycle and waits for the end of the period.
    /// Errors that abort the cycle are logged and swallowed.
    pub async fn tick<C: Clock>(&self, clock: &C) -> Option<CycleReport> {
        let deadline = clock.now() + self.period;
        let report = match AssertUnwindSafe(self.cycle()).catch_unwind().await {
            Ok(Ok(report)) => Some(report),
            Ok(Err(err)) => {
                log::error!("Sync cycle aborted: {err}");
                None
            }
            Err(panic) => {
                log::error!("Unexpected error during sync cycle: {}", panic_message(&*panic));
                None
            }
        };
        clock.sleep_until(deadline).await;
        report
    }

    /// Runs one reconciliation pass.
    /// Returns an error only if one of the listings failed, in which case
    /// nothing was changed on the remote side.
    pub async fn cycle(&self) -> cloudsync::Result<CycleReport> {
        log::info!("Starting sync cycle");

        let remote = self.remote.list_entries().await?;
        let local = self.local.entries().await?;

        let plan = SyncPlan::build(&local, &remote, &chrono::Local);
        log::debug!(
            "{} local and {} remote files: {} to upload, {} to overwrite, {} to delete",
            local.len(),
            remote.len(),
            plan.to_upload.len(),
            plan.to_overwrite.len(),
            plan.to_delete.len()
        );

        let mut report = CycleReport::default();

        for name in plan.to_upload.iter() {
            let outcome = self.upload(name, false).await;
            report.record(Op::Upload, name, outcome);
        }
        for name in plan.to_overwrite.iter() {
            let outcome = self.upload(name, true).await;
            report.record(Op::Overwrite, name, outcome);
        }
        for name in plan.to_delete.iter() {
            let outcome = self.delete(name).await;
            report.record(Op::Delete, name, outcome);
        }

        if report.mutations() > 0 || !report.is_clean() {
            log::info!("Sync cycle done: {report}");
        } else {
            log::debug!("Sync cycle done: {report}");
        }
        Ok(report)
    }

    async fn upload(&self, name: &str, overwrite: bool) -> Outcome {
        let op = if overwrite { Op::Overwrite } else { Op::Upload };
        match self.do_upload(name, overwrite).await {
            Ok(Some(())) => {
                if overwrite {
                    log::info!("overwrote {name}");
                } else {
                    log::info!("uploaded {name}");
                }
                Outcome::Done
            }
            Ok(None) => {
                let reason = "no upload link, the file already exists on the disk".to_string();
                log::warn!("{op} of {name} skipped: {reason}");
                Outcome::Skipped(reason)
            }
            Err(err) => {
                log::error!("{op} of {name} failed: {err}");
                Outcome::Failed(err)
            }
        }
    }

    async fn do_upload(&self, name: &str, overwrite: bool) -> cloudsync::Result<Option<()>> {
        let Some(handle) = self.remote.request_upload(name, overwrite).await? else {
            return Ok(None);
        };
        let path = self.local.file_path(name);
        self.remote.upload(&handle, &path).await?;
        Ok(Some(()))
    }

    async fn delete(&self, name: &str) -> Outcome {
        match self.remote.delete(name).await {
            Ok(Deleted::Done) => {
                log::info!("deleted {name}");
                Outcome::Done
            }
            Ok(Deleted::AlreadyAbsent) => {
                log::info!("deleted {name} (was already gone)");
                Outcome::Done
            }
            Err(err) => {
                log::error!("delete of {name} failed: {err}");
                Outcome::Failed(err)
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg
    } else {
        "unknown panic"
    }
}
