use super::{DBClient, SubscriptionExt};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Every day at 01:00
const EXPIRY_SCHEDULE: &str = "0 0 1 * * *";

impl DBClient {
    /// Register the daily subscription expiry sweep. The scheduler runs in the
    /// background; this returns once the job is registered.
    pub async fn start_expiry_task(&self) -> Result<(), JobSchedulerError> {
        let sched = JobScheduler::new().await?;
        let db_client = self.clone();

        let job = Job::new_async(EXPIRY_SCHEDULE, move |uuid, _l| {
            let db_client = db_client.clone();
            Box::pin(async move {
                tracing::info!("Running subscription expiry job {:?}", uuid);

                match db_client.expire_subscriptions().await {
                    Ok((expired, downgraded)) => {
                        tracing::info!(
                            expired,
                            downgraded,
                            "Subscription expiry job {:?} finished",
                            uuid
                        );
                    }
                    Err(e) => {
                        tracing::error!("Subscription expiry job {:?} failed: {:?}", uuid, e);
                    }
                }
            })
        })?;

        sched.add(job).await?;
        // It doesn't block.
        sched.start().await?;

        Ok(())
    }
}
