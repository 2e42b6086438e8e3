//! Mock collaborators for testing the verification flow

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::domain::value_objects::{BotCheckToken, ChallengeHandle, VerifiedIdentity, WidgetHandle};
use crate::errors::{BotCheckError, ConfirmError, ProviderError, StorageError};
use crate::services::verification::traits::{
    AuthProvider, BotCheckWidget, CapabilityProbe, Clock, CodeCapture, KeyValueStore,
    PlatformCapabilities,
};
use crate::services::verification::{FlowConfig, VerificationFlow};

pub const PHONE: &str = "+919876543210";
pub const VALID_CODE: &str = "482913";
pub const BOT_TOKEN: &str = "bot-token";

// Manually advanced clock
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()),
        }
    }

    pub fn advance(&self, seconds: i64) {
        *self.now.lock().unwrap() += Duration::seconds(seconds);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct ProviderState {
    issued: Vec<(String, String)>,
    confirmations: Vec<(String, String)>,
    issue_error: Option<ProviderError>,
    confirm_error: Option<ProviderError>,
}

// Mock auth provider accepting a single valid code
pub struct MockAuthProvider {
    state: Mutex<ProviderState>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockAuthProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState::default()),
            gate: Mutex::new(None),
        }
    }

    pub fn set_issue_error(&self, error: Option<ProviderError>) {
        self.state.lock().unwrap().issue_error = error;
    }

    pub fn set_confirm_error(&self, error: Option<ProviderError>) {
        self.state.lock().unwrap().confirm_error = error;
    }

    /// Hold every confirmation until a permit is added to the returned gate
    pub fn hold_confirmations(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn issue_count(&self) -> usize {
        self.state.lock().unwrap().issued.len()
    }

    pub fn confirm_count(&self) -> usize {
        self.state.lock().unwrap().confirmations.len()
    }

    pub fn last_bot_check_token(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .issued
            .last()
            .map(|(_, token)| token.clone())
    }

    pub fn confirmed_challenges(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .confirmations
            .iter()
            .map(|(challenge, _)| challenge.clone())
            .collect()
    }
}

#[async_trait]
impl AuthProvider for MockAuthProvider {
    async fn issue_challenge(
        &self,
        phone_number: &str,
        bot_check: &BotCheckToken,
    ) -> Result<ChallengeHandle, ProviderError> {
        let mut state = self.state.lock().unwrap();
        state
            .issued
            .push((phone_number.to_string(), bot_check.as_str().to_string()));
        if let Some(error) = state.issue_error.clone() {
            return Err(error);
        }
        Ok(ChallengeHandle::new(format!("H{}", state.issued.len())))
    }

    async fn confirm_challenge(
        &self,
        challenge: &ChallengeHandle,
        code: &str,
    ) -> Result<VerifiedIdentity, ConfirmError> {
        let confirm_error = {
            let mut state = self.state.lock().unwrap();
            state
                .confirmations
                .push((challenge.as_str().to_string(), code.to_string()));
            state.confirm_error.clone()
        };

        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if let Some(error) = confirm_error {
            return Err(ConfirmError::Provider(error));
        }
        if code == VALID_CODE {
            Ok(VerifiedIdentity::new("uid-1", PHONE, "id-token").with_new_user(true))
        } else {
            Err(ConfirmError::InvalidCode)
        }
    }
}

// Mock key-value store backed by a HashMap
pub struct MockKeyValueStore {
    values: Mutex<HashMap<String, String>>,
    failure: Mutex<Option<String>>,
}

impl MockKeyValueStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            failure: Mutex::new(None),
        }
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn check(&self) -> Result<(), StorageError> {
        match self.failure.lock().unwrap().as_ref() {
            Some(message) => Err(StorageError::backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MockKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.insert(key, value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct WidgetState {
    next_id: u32,
    live: HashMap<String, String>,
    created: usize,
    destroyed: usize,
    fail_execute: bool,
}

// Mock bot-check widget enforcing one widget per container
pub struct MockBotCheck {
    state: Mutex<WidgetState>,
}

impl MockBotCheck {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WidgetState::default()),
        }
    }

    pub fn set_fail_execute(&self, fail: bool) {
        self.state.lock().unwrap().fail_execute = fail;
    }

    /// Drop every widget as if the page cleared its containers
    pub fn forget_all(&self) {
        self.state.lock().unwrap().live.clear();
    }

    pub fn live_count(&self) -> usize {
        self.state.lock().unwrap().live.len()
    }

    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn destroyed(&self) -> usize {
        self.state.lock().unwrap().destroyed
    }
}

#[async_trait]
impl BotCheckWidget for MockBotCheck {
    async fn create(&self, container_id: &str) -> Result<WidgetHandle, BotCheckError> {
        let mut state = self.state.lock().unwrap();
        if state.live.values().any(|container| container == container_id) {
            return Err(BotCheckError::AlreadyRendered {
                container: container_id.to_string(),
            });
        }
        state.next_id += 1;
        state.created += 1;
        let id = format!("W{}", state.next_id);
        state.live.insert(id.clone(), container_id.to_string());
        Ok(WidgetHandle::new(id))
    }

    async fn execute(&self, widget: &WidgetHandle) -> Result<BotCheckToken, BotCheckError> {
        let state = self.state.lock().unwrap();
        if !state.live.contains_key(widget.as_str()) {
            return Err(BotCheckError::WidgetNotFound);
        }
        if state.fail_execute {
            return Err(BotCheckError::TokenUnavailable {
                reason: "challenge expired".to_string(),
            });
        }
        Ok(BotCheckToken::new(BOT_TOKEN))
    }

    async fn destroy(&self, widget: &WidgetHandle) -> Result<(), BotCheckError> {
        let mut state = self.state.lock().unwrap();
        match state.live.remove(widget.as_str()) {
            Some(_) => {
                state.destroyed += 1;
                Ok(())
            }
            None => Err(BotCheckError::WidgetNotFound),
        }
    }
}

// Mock capture facility fed through a channel
pub struct MockCodeCapture {
    sender: mpsc::UnboundedSender<String>,
    receiver: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    requests: AtomicUsize,
}

impl MockCodeCapture {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: tokio::sync::Mutex::new(receiver),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn deliver(&self, code: &str) {
        let _ = self.sender.send(code.to_string());
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeCapture for MockCodeCapture {
    async fn request_code(&self, cancel: CancellationToken) -> Option<String> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let mut receiver = self.receiver.lock().await;
        tokio::select! {
            _ = cancel.cancelled() => None,
            code = receiver.recv() => code,
        }
    }
}

/// Flow wired to mocks that tests can inspect
pub struct Harness {
    pub flow: VerificationFlow,
    pub provider: Arc<MockAuthProvider>,
    pub store: Arc<MockKeyValueStore>,
    pub widget: Arc<MockBotCheck>,
    pub clock: Arc<ManualClock>,
    pub capture: Arc<MockCodeCapture>,
    config: FlowConfig,
    capabilities: Option<PlatformCapabilities>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(FlowConfig::default(), None)
    }

    pub fn with_config(config: FlowConfig) -> Self {
        Self::build(config, None)
    }

    pub fn with_capture(capabilities: PlatformCapabilities) -> Self {
        Self::build(FlowConfig::default(), Some(capabilities))
    }

    fn build(config: FlowConfig, capabilities: Option<PlatformCapabilities>) -> Self {
        let provider = Arc::new(MockAuthProvider::new());
        let store = Arc::new(MockKeyValueStore::new());
        let widget = Arc::new(MockBotCheck::new());
        let clock = Arc::new(ManualClock::new());
        let capture = Arc::new(MockCodeCapture::new());

        let mut harness = Self {
            flow: VerificationFlow::builder(provider.clone(), store.clone(), widget.clone()).build(),
            provider,
            store,
            widget,
            clock,
            capture,
            config,
            capabilities,
        };
        harness.flow = harness.new_flow();
        harness
    }

    /// Another flow over the same collaborators, as after a reload
    pub fn new_flow(&self) -> VerificationFlow {
        let mut builder = VerificationFlow::builder(
            self.provider.clone(),
            self.store.clone(),
            self.widget.clone(),
        )
        .config(self.config.clone())
        .clock(self.clock.clone());

        if let Some(capabilities) = self.capabilities {
            let probe: Arc<dyn CapabilityProbe> = Arc::new(capabilities);
            builder = builder.code_capture(self.capture.clone(), probe);
        }
        builder.build()
    }

    pub async fn ready(self) -> Self {
        self.flow.initialize().await.unwrap();
        self
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn cooldown_key(&self) -> &str {
        &self.config.cooldown_key
    }

    pub fn stored_expiry_millis(&self) -> Option<i64> {
        self.store
            .value(self.cooldown_key())
            .and_then(|raw| raw.parse().ok())
    }
}

/// Let spawned tasks run
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Wait until the condition holds, failing after one second
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(1), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("condition not reached in time");
}
