use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::ai::intent::IntentVocabulary;
use crate::services::ai::LlmProvider;
use crate::services::catalog::Catalog;
use crate::services::messaging::ChatProvider;
use crate::services::sessions::SessionStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub catalog: Catalog,
    pub sessions: SessionStore,
    pub vocab: IntentVocabulary,
    pub llm: Option<Box<dyn LlmProvider>>,
    pub telegram: Box<dyn ChatProvider>,
}
