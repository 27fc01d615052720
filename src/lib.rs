pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;

use crate::auth::OperatorRealm;
use crate::config::Config;
use crate::services::chat_service::ChatService;
use crate::store::DocumentStore;
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub realm: OperatorRealm,
    pub chat_service: ChatService,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, realm: OperatorRealm, chat_service: ChatService) -> Self {
        Self {
            store,
            realm,
            chat_service,
        }
    }

    pub fn from_config(config: &Config, store: Arc<dyn DocumentStore>) -> error::Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        let realm = OperatorRealm::from_config(config);
        let chat_service = ChatService::new(
            config.gemini_api_key.clone(),
            config.gemini_model.clone(),
            &config.portfolio_owner,
            http_client,
        );

        Ok(Self::new(store, realm, chat_service))
    }
}
