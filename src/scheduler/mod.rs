pub mod tasks;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// A background task body, invoked once per run
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Wrapper around tokio-cron-scheduler for background tasks
pub struct Scheduler {
    inner: JobScheduler,
}

impl Scheduler {
    /// Create a new scheduler
    pub async fn new() -> Result<Self> {
        let inner = JobScheduler::new()
            .await
            .context("Failed to create job scheduler")?;
        Ok(Self { inner })
    }

    /// Add a task that first runs after `initial_delay`, then every `period`
    pub async fn add_interval_job<F>(
        &self,
        name: &str,
        initial_delay: Duration,
        period: Duration,
        task: F,
    ) -> Result<()>
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        let task = Arc::new(task);

        let first_name = name.to_string();
        let first_task = task.clone();
        let first = Job::new_one_shot_async(initial_delay, move |_uuid, _lock| {
            let name = first_name.clone();
            let fut = first_task();
            Box::pin(async move {
                info!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create initial run for job: {}", name))?;

        let job_name = name.to_string();
        let repeated = Job::new_repeated_async(period, move |_uuid, _lock| {
            let name = job_name.clone();
            let fut = task();
            Box::pin(async move {
                info!("Running scheduled task: {}", name);
                fut.await;
            })
        })
        .with_context(|| format!("Failed to create repeated job: {}", name))?;

        self.inner
            .add(first)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;
        self.inner
            .add(repeated)
            .await
            .with_context(|| format!("Failed to add job: {}", name))?;

        info!(
            "Scheduled task '{}' after {:?}, then every {:?}",
            name, initial_delay, period
        );
        Ok(())
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        self.inner
            .start()
            .await
            .context("Failed to start scheduler")?;
        info!("Scheduler started");
        Ok(())
    }

    /// Shutdown the scheduler
    #[allow(dead_code)]
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner
            .shutdown()
            .await
            .context("Failed to shutdown scheduler")?;
        info!("Scheduler stopped");
        Ok(())
    }
}
