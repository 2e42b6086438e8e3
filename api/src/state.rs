//! Application state shared by all workers
//!
//! Each client drives its own verification flow. Flows are keyed by a
//! session id the client keeps across reloads; durable keys and the bot-check
//! container are scoped to that id so sessions never see each other's state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use uuid::Uuid;

use ds_core::errors::VerificationResult;
use ds_core::services::onboarding::OnboardingRouter;
use ds_core::services::verification::{
    AuthProvider, FlowConfig, KeyValueStore, PlatformCapabilities, VerificationFlow,
};
use ds_infra::{
    create_auth_provider, create_key_value_store, InfrastructureError, InvisibleRecaptcha,
    SmsInboxCapture,
};
use ds_shared::{AppConfig, VerificationConfig};

use crate::handlers::ApiError;

/// A live verification flow and the adapters bound to it
pub struct SessionEntry {
    pub flow: VerificationFlow,
    pub inbox: Arc<SmsInboxCapture>,
    pub bot_check_container: String,
    pub capabilities: PlatformCapabilities,
    last_seen: Mutex<Instant>,
}

impl SessionEntry {
    fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

pub struct AppState {
    config: AppConfig,
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn KeyValueStore>,
    bot_check: Arc<InvisibleRecaptcha>,
    sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let bot_check = Arc::new(InvisibleRecaptcha::new(&config.provider.bot_check));
        Self {
            config,
            provider,
            store,
            bot_check,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Build provider and storage from configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, InfrastructureError> {
        let provider = create_auth_provider(&config.provider)?;
        let store = create_key_value_store(&config.storage).await?;
        Ok(Self::new(config, provider, store))
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bot_check(&self) -> &InvisibleRecaptcha {
        &self.bot_check
    }

    pub fn session_count(&self) -> usize {
        self.read_sessions().len()
    }

    fn flow_config(&self, id: Uuid) -> FlowConfig {
        FlowConfig::from(&self.config.verification).scoped(&id.to_string())
    }

    /// Start a flow, replacing any flow already running under the same id
    ///
    /// The durable cooldown of a restored session is picked up by `initialize`.
    pub async fn open_session(
        &self,
        id: Option<Uuid>,
        capabilities: PlatformCapabilities,
    ) -> VerificationResult<Arc<SessionEntry>> {
        let id = id.unwrap_or_else(Uuid::new_v4);

        let previous = self.write_sessions().remove(&id);
        if let Some(previous) = previous {
            previous.flow.dispose().await;
            tracing::debug!(session_id = %id, "Replaced existing verification session");
        }

        let config = self.flow_config(id);
        let inbox = Arc::new(SmsInboxCapture::new(
            self.config.verification.origin_domain.clone(),
        ));
        let bot_check_container = config.bot_check_container.clone();

        let flow = VerificationFlow::builder(
            Arc::clone(&self.provider),
            Arc::clone(&self.store),
            self.bot_check.clone(),
        )
        .config(config)
        .code_capture(inbox.clone(), Arc::new(capabilities))
        .session_id(id)
        .build();
        flow.initialize().await?;

        let entry = Arc::new(SessionEntry {
            flow,
            inbox,
            bot_check_container,
            capabilities,
            last_seen: Mutex::new(Instant::now()),
        });
        self.write_sessions().insert(id, Arc::clone(&entry));

        tracing::info!(
            session_id = %id,
            mobile = capabilities.mobile,
            secure_context = capabilities.secure_context,
            event = "session_opened",
            "Verification session opened"
        );
        Ok(entry)
    }

    /// Look up a live session and mark it as in use
    pub fn session(&self, id: Uuid) -> Result<Arc<SessionEntry>, ApiError> {
        let entry = self
            .read_sessions()
            .get(&id)
            .cloned()
            .ok_or(ApiError::SessionNotFound(id))?;
        entry.touch();
        Ok(entry)
    }

    /// Dispose a flow; returns whether it existed
    pub async fn close_session(&self, id: Uuid) -> bool {
        let entry = self.write_sessions().remove(&id);
        match entry {
            Some(entry) => {
                entry.flow.dispose().await;
                tracing::info!(session_id = %id, event = "session_closed", "Verification session closed");
                true
            }
            None => false,
        }
    }

    /// Dispose sessions unused for longer than `idle_timeout`; returns how many
    pub async fn evict_idle(&self, idle_timeout: Duration) -> usize {
        let expired: Vec<(Uuid, Arc<SessionEntry>)> = {
            let mut sessions = self.write_sessions();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| entry.idle_for() > idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry)))
                .collect()
        };

        for (id, entry) in &expired {
            entry.flow.dispose().await;
            tracing::info!(
                session_id = %id,
                status = %entry.flow.status(),
                event = "session_expired",
                "Idle verification session discarded"
            );
        }
        expired.len()
    }

    /// Evict idle sessions on the configured interval until the task is dropped
    pub async fn sweep_idle_sessions(&self) {
        let idle_timeout = self.config.verification.session_idle_timeout();
        let mut interval = tokio::time::interval(self.config.verification.session_sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            let evicted = self.evict_idle(idle_timeout).await;
            if evicted > 0 {
                tracing::debug!(
                    evicted = evicted,
                    remaining = self.session_count(),
                    "Idle session sweep finished"
                );
            }
        }
    }

    /// Role routing scoped to one client
    pub fn onboarding(&self, id: Uuid) -> OnboardingRouter {
        let key = VerificationConfig::scoped_key(
            &self.config.verification.role_storage_key,
            &id.to_string(),
        );
        OnboardingRouter::new(Arc::clone(&self.store), key)
    }

    /// Dispose every flow
    pub async fn shutdown(&self) {
        let entries: Vec<_> = self.write_sessions().drain().map(|(_, entry)| entry).collect();
        for entry in &entries {
            entry.flow.dispose().await;
        }
        tracing::info!(count = entries.len(), "Verification sessions disposed");
    }

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, Arc<SessionEntry>>> {
        self.sessions.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<SessionEntry>>> {
        self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
