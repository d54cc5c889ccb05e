use crate::config::Config;
use crate::db::DbPool;
use crate::notify::Notifier;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub notifier: Notifier,
}
