use std::sync::Arc;

use crate::api::queue::{JobProducer, RedisPool};
use crate::domain::ports::ChatStore;
use crate::infrastructure::{AppConfig, SubjectRegistry};

#[derive(Clone)]
pub struct AppState {
    pub redis_pool: RedisPool,
    pub job_producer: JobProducer,
    pub chat_store: Arc<dyn ChatStore>,
    pub agents: Arc<SubjectRegistry>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        redis_pool: RedisPool,
        chat_store: Arc<dyn ChatStore>,
        agents: Arc<SubjectRegistry>,
        config: AppConfig,
    ) -> Self {
        let config = Arc::new(config);
        let job_producer =
            JobProducer::new(redis_pool.clone(), config.config.worker.result_ttl_seconds);
        Self {
            redis_pool,
            job_producer,
            chat_store,
            agents,
            config,
        }
    }
}
