use crate::{config::Config, services::schedule::ScheduleRegistry};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub schedules: Arc<ScheduleRegistry>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config, schedules: ScheduleRegistry) -> Self {
        Self {
            db,
            config: Arc::new(config),
            schedules: Arc::new(schedules),
        }
    }
}
