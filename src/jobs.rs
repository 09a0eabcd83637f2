use crate::errors::BlogError;
use crate::storage;
use sea_orm::DatabaseConnection;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

pub const CLEANUP_EXPIRED_SESSIONS: &str = "cleanup_expired_sessions";

/// Initialize and start the job scheduler with all background tasks
pub async fn init_scheduler(db: DatabaseConnection) -> Result<JobScheduler, BlogError> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| BlogError::Other(format!("Failed to create job scheduler: {}", e)))?;

    // Cleanup expired sessions job - runs every hour
    let cleanup_sessions_job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
        let db = db.clone();
        Box::pin(async move {
            if let Err(e) = run_job(&db, CLEANUP_EXPIRED_SESSIONS).await {
                error!("Scheduled job {} failed: {}", CLEANUP_EXPIRED_SESSIONS, e);
            }
        })
    })
    .map_err(|e| BlogError::Other(format!("Failed to create cleanup sessions job: {}", e)))?;

    sched
        .add(cleanup_sessions_job)
        .await
        .map_err(|e| BlogError::Other(format!("Failed to add cleanup sessions job: {}", e)))?;

    sched
        .start()
        .await
        .map_err(|e| BlogError::Other(format!("Failed to start job scheduler: {}", e)))?;

    info!("Job scheduler started with {} jobs", 1);

    Ok(sched)
}

/// Run a job by name; returns the number of records it touched.
pub async fn run_job(db: &DatabaseConnection, job_name: &str) -> Result<u64, BlogError> {
    info!("Running job: {}", job_name);

    let count = match job_name {
        CLEANUP_EXPIRED_SESSIONS => storage::cleanup_expired_sessions(db).await?,
        _ => {
            return Err(BlogError::Other(format!("Unknown job name: {}", job_name)));
        }
    };

    info!("Job {} completed: {} records", job_name, count);
    Ok(count)
}
