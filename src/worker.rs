use deadpool_redis::{redis::AsyncCommands, Config, Connection, Pool, Runtime};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edu_agent::application::IngestService;
use edu_agent::infrastructure::{
    keys, queues, AppConfig, IngestDocumentJob, JobResult, PdfTextExtractor, SubjectRegistry,
};

pub type RedisPool = Pool;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Redis pool error: {0}")]
    Pool(String),
    #[error("Redis error: {0}")]
    Redis(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, WorkerError>;

pub fn create_pool(redis_url: &str) -> Result<RedisPool> {
    let cfg = Config::from_url(redis_url);
    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

pub struct WorkerState {
    pub redis_pool: RedisPool,
    pub registry: Arc<SubjectRegistry>,
    pub ingest: IngestService,
    pub result_ttl_seconds: u64,
}

impl WorkerState {
    pub async fn new(redis_pool: RedisPool, config: &AppConfig) -> anyhow::Result<Self> {
        let registry = Arc::new(SubjectRegistry::from_config(config).await?);
        let ingest = IngestService::new(
            Arc::new(PdfTextExtractor),
            config.config.rag.chunk_size,
            config.config.rag.chunk_overlap,
        );

        Ok(Self {
            redis_pool,
            registry,
            ingest,
            result_ttl_seconds: config.config.worker.result_ttl_seconds,
        })
    }
}

pub struct JobConsumer {
    state: Arc<WorkerState>,
    concurrency: usize,
}

impl JobConsumer {
    pub fn new(state: WorkerState, concurrency: usize) -> Self {
        Self {
            state: Arc::new(state),
            concurrency,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        tracing::info!(concurrency = self.concurrency, "consumer started");

        loop {
            let permit = semaphore.clone().acquire_owned().await.unwrap();
            let state = self.state.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = process_next_job(&state).await {
                    tracing::error!(error = %e, "job failed");
                }
            });

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }
}

async fn conn(state: &WorkerState) -> Result<Connection> {
    state
        .redis_pool
        .get()
        .await
        .map_err(|e| WorkerError::Pool(e.to_string()))
}

async fn set_status(
    state: &WorkerState,
    conn: &mut Connection,
    job_id: uuid::Uuid,
    status: &JobResult,
) -> Result<()> {
    let json = serde_json::to_string(status)?;
    conn.set_ex::<_, _, ()>(keys::job_status(&job_id), &json, state.result_ttl_seconds)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))
}

async fn process_next_job(state: &WorkerState) -> Result<()> {
    let mut c = conn(state).await?;

    let result: Option<(String, String)> = c
        .brpop(&[queues::INGEST_QUEUE], 1.0)
        .await
        .map_err(|e| WorkerError::Redis(e.to_string()))?;

    if let Some((queue, job_json)) = result {
        match serde_json::from_str::<IngestDocumentJob>(&job_json) {
            Ok(job) => process_ingest_job(state, job).await?,
            Err(e) => tracing::error!(queue, error = %e, "dropping malformed job payload"),
        }
    }
    Ok(())
}

async fn process_ingest_job(state: &WorkerState, job: IngestDocumentJob) -> Result<()> {
    tracing::info!(
        job_id = %job.job_id,
        subject = %job.subject,
        files = job.paths.len(),
        "processing ingest"
    );
    let mut c = conn(state).await?;

    set_status(state, &mut c, job.job_id, &JobResult::processing(job.job_id)).await?;

    let outcome = match state.registry.get(&job.subject) {
        Some(agent) => {
            state
                .ingest
                .ingest_paths(agent.rag_service(), &job.paths)
                .await
        }
        None => Err(edu_agent::domain::DomainError::not_found(format!(
            "subject '{}'",
            job.subject
        ))),
    };

    match outcome {
        Ok(report) => {
            set_status(
                state,
                &mut c,
                job.job_id,
                &JobResult::completed(
                    job.job_id,
                    serde_json::json!({
                        "subject": job.subject,
                        "documents": report.documents,
                        "skipped": report.skipped,
                        "chunks": report.chunks,
                    }),
                ),
            )
            .await?;
            tracing::info!(job_id = %job.job_id, chunks = report.chunks, "ingest completed");
        }
        Err(e) => {
            set_status(
                state,
                &mut c,
                job.job_id,
                &JobResult::failed(job.job_id, e.to_string()),
            )
            .await?;
            tracing::warn!(job_id = %job.job_id, error = %e, "ingest failed");
        }
    }

    cleanup_spooled_files(&job).await;
    Ok(())
}

async fn cleanup_spooled_files(job: &IngestDocumentJob) {
    let Some(first) = job.paths.first() else {
        return;
    };
    // Uploads are spooled under a per-job directory; remove the whole thing.
    if let Some(dir) = first.parent() {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to clean up spool");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worker=debug,edu_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let redis_pool = create_pool(&config.config.redis_url)?;
    info!("Redis connected");

    let concurrency = config.config.worker.concurrency;
    let state = WorkerState::new(redis_pool, &config).await?;
    info!("Qdrant connected");

    let consumer = JobConsumer::new(state, concurrency);

    info!(concurrency, "worker started");
    consumer.start().await?;

    Ok(())
}
