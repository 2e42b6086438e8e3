//! Shared helpers for API integration tests

use std::sync::Arc;

use actix_web::{body::MessageBody, dev::ServiceResponse, test, web};
use serde_json::Value;

use ds_api::AppState;
use ds_infra::{MemoryKeyValueStore, TestNumberAuthProvider};
use ds_shared::AppConfig;

pub const PHONE: &str = "+919876543210";
pub const CODE: &str = "123456";
pub const ANDROID_UA: &str =
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/126.0 Mobile Safari/537.36";

/// Development configuration: fixed test numbers, memory storage, testing bot check
pub fn test_config() -> AppConfig {
    AppConfig::development()
}

pub fn test_state(config: AppConfig) -> web::Data<AppState> {
    let provider = Arc::new(TestNumberAuthProvider::new(
        config.provider.test_numbers.clone(),
    ));
    let store = Arc::new(MemoryKeyValueStore::new());
    web::Data::new(AppState::new(config, provider, store))
}

pub async fn read_json<B: MessageBody>(resp: ServiceResponse<B>) -> Value {
    let bytes = test::read_body(resp).await;
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub fn session_path(id: &str, suffix: &str) -> String {
    format!("/api/v1/phone-auth/sessions/{}{}", id, suffix)
}
