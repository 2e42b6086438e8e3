//! Phone verification flow
//!
//! Drives a single client through phone submission, challenge dispatch and
//! code confirmation:
//! - Guards dispatch with a resend cooldown that survives reloads
//! - Keeps one bot-check widget per flow and re-renders it after failures
//! - Collapses overlapping and repeated confirmations into one provider call
//! - Optionally listens for the code through the platform capture facility

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::{DateTime, Utc};
use ds_shared::phone::{is_present, mask_phone_number};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::entities::{
    remaining_seconds, ConfirmGate, SkipReason, VerificationSession, VerificationStatus,
};
use crate::errors::{ConfirmError, ProviderError, StorageError, VerificationError, VerificationResult};

use super::bot_check::BotCheckSlot;
use super::capture::CaptureListener;
use super::config::FlowConfig;
use super::cooldown::{CooldownStore, Countdown};
use super::traits::{
    AuthProvider, BotCheckWidget, CapabilityProbe, Clock, CodeCapture, KeyValueStore,
    PlatformCapabilities, SystemClock,
};
use super::types::{CodeOrigin, ConfirmOutcome, DispatchOutcome, SessionSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Active,
    Disposed,
}

struct FlowState {
    session: VerificationSession,
    lifecycle: Lifecycle,
    dispatching: bool,
    listener: Option<CaptureListener>,
}

impl FlowState {
    fn ensure_active(&self) -> VerificationResult<()> {
        match self.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Created => Err(VerificationError::NotInitialized),
            Lifecycle::Disposed => Err(VerificationError::Disposed),
        }
    }

    fn stop_capture(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.cancel();
        }
    }

    fn capture_active(&self) -> bool {
        self.listener
            .as_ref()
            .map(CaptureListener::is_active)
            .unwrap_or(false)
    }
}

struct FlowInner {
    config: FlowConfig,
    provider: Arc<dyn AuthProvider>,
    bot_check: BotCheckSlot,
    cooldown: CooldownStore,
    countdown: Countdown,
    capture: Option<Arc<dyn CodeCapture>>,
    capabilities: Arc<dyn CapabilityProbe>,
    clock: Arc<dyn Clock>,
    state: Mutex<FlowState>,
    /// Bumped whenever a confirmation leaves `Confirming`
    settled: watch::Sender<u64>,
}

/// Phone verification flow for one client
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct VerificationFlow {
    inner: Arc<FlowInner>,
}

/// Builder for [`VerificationFlow`]
pub struct VerificationFlowBuilder {
    provider: Arc<dyn AuthProvider>,
    store: Arc<dyn KeyValueStore>,
    widget: Arc<dyn BotCheckWidget>,
    config: FlowConfig,
    clock: Arc<dyn Clock>,
    capture: Option<Arc<dyn CodeCapture>>,
    capabilities: Arc<dyn CapabilityProbe>,
    session_id: Option<Uuid>,
}

impl VerificationFlowBuilder {
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enable automatic code capture, gated by the platform capabilities
    pub fn code_capture(
        mut self,
        capture: Arc<dyn CodeCapture>,
        capabilities: Arc<dyn CapabilityProbe>,
    ) -> Self {
        self.capture = Some(capture);
        self.capabilities = capabilities;
        self
    }

    pub fn session_id(mut self, id: Uuid) -> Self {
        self.session_id = Some(id);
        self
    }

    pub fn build(self) -> VerificationFlow {
        let now = self.clock.now();
        let session = match self.session_id {
            Some(id) => VerificationSession::with_id(id, now),
            None => VerificationSession::new(now),
        };
        let cooldown = CooldownStore::new(self.store, self.config.cooldown_key.clone());
        let countdown = Countdown::new(
            Arc::clone(&self.clock),
            cooldown.clone(),
            self.config.countdown_tick,
        );

        VerificationFlow {
            inner: Arc::new(FlowInner {
                bot_check: BotCheckSlot::new(self.widget, self.config.bot_check_container.clone()),
                config: self.config,
                provider: self.provider,
                cooldown,
                countdown,
                capture: self.capture,
                capabilities: self.capabilities,
                clock: self.clock,
                state: Mutex::new(FlowState {
                    session,
                    lifecycle: Lifecycle::Created,
                    dispatching: false,
                    listener: None,
                }),
                settled: watch::channel(0).0,
            }),
        }
    }
}

impl VerificationFlow {
    pub fn builder(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn KeyValueStore>,
        widget: Arc<dyn BotCheckWidget>,
    ) -> VerificationFlowBuilder {
        VerificationFlowBuilder {
            provider,
            store,
            widget,
            config: FlowConfig::default(),
            clock: Arc::new(SystemClock),
            capture: None,
            capabilities: Arc::new(PlatformCapabilities::default()),
            session_id: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.lock_state().session.id()
    }

    pub fn status(&self) -> VerificationStatus {
        self.inner.lock_state().session.status()
    }

    /// Seconds before another dispatch is allowed
    pub fn cooldown_remaining(&self) -> u64 {
        let now = self.inner.clock.now();
        self.inner.lock_state().session.cooldown_remaining(now)
    }

    /// Receive the countdown as it ticks
    pub fn subscribe_countdown(&self) -> watch::Receiver<u64> {
        self.inner.countdown.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot()
    }

    /// Restore any persisted cooldown and render the bot check
    pub async fn initialize(&self) -> VerificationResult<SessionSnapshot> {
        let inner = &self.inner;
        {
            let mut state = inner.lock_state();
            match state.lifecycle {
                Lifecycle::Created => state.lifecycle = Lifecycle::Active,
                Lifecycle::Active => return Err(VerificationError::AlreadyInitialized),
                Lifecycle::Disposed => return Err(VerificationError::Disposed),
            }
        }

        inner.rehydrate_cooldown().await;

        if let Err(e) = inner.bot_check.reinitialize().await {
            // Dispatch renders the widget again on demand
            tracing::warn!(
                container = %inner.bot_check.container_id(),
                error = %e,
                event = "bot_check_init_failed",
                "Failed to render bot check during initialization"
            );
        }

        Ok(inner.snapshot())
    }

    /// Request a one-time code for the phone number
    ///
    /// The cooldown starts whether or not the provider accepted the request.
    pub async fn dispatch_challenge(&self, phone_number: &str) -> VerificationResult<DispatchOutcome> {
        let inner = &self.inner;
        let phone_number = phone_number.trim().to_string();
        let now = inner.clock.now();

        {
            let mut state = inner.lock_state();
            state.ensure_active()?;

            if state.session.status() == VerificationStatus::Verified {
                return Err(VerificationError::AlreadyVerified);
            }

            let remaining = state.session.cooldown_remaining(now);
            if remaining > 0 {
                tracing::warn!(
                    session_id = %state.session.id(),
                    cooldown_remaining = remaining,
                    event = "dispatch_rejected_cooldown",
                    "Verification code requested during cooldown"
                );
                return Err(VerificationError::CooldownActive {
                    remaining_seconds: remaining,
                });
            }

            if state.session.status() == VerificationStatus::Confirming {
                return Err(VerificationError::ConfirmationInFlight);
            }
            if state.dispatching {
                return Err(VerificationError::DispatchInFlight);
            }
            if !is_present(&phone_number) {
                return Err(VerificationError::MissingPhoneNumber);
            }

            state.dispatching = true;
        }
        let _dispatching = DispatchGuard { inner };

        // Another tab or a reload may have started a cooldown we have not seen
        match inner.cooldown.load().await {
            Ok(Some(expiry)) if remaining_seconds(expiry, now) > 0 => {
                let remaining = remaining_seconds(expiry, now);
                inner.lock_state().session.restore_cooldown(expiry);
                inner.countdown.start(expiry);
                tracing::warn!(
                    cooldown_remaining = remaining,
                    event = "dispatch_rejected_cooldown",
                    "Persisted cooldown still active"
                );
                return Err(VerificationError::CooldownActive {
                    remaining_seconds: remaining,
                });
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event = "cooldown_load_failed",
                    "Failed to read persisted cooldown"
                );
            }
        }

        {
            let mut state = inner.lock_state();
            state.session.invalidate_challenge();
            state.stop_capture();
        }

        let issued = match inner.bot_check.token().await {
            Ok(token) => inner.provider.issue_challenge(&phone_number, &token).await,
            Err(e) => Err(ProviderError::from(e)),
        };

        let expiry = inner.clock.now() + inner.config.resend_cooldown;
        inner.apply_cooldown(expiry).await;
        let cooldown_seconds = remaining_seconds(expiry, inner.clock.now());

        match issued {
            Ok(challenge) => {
                let auto_capture = {
                    let mut state = inner.lock_state();
                    if state.lifecycle == Lifecycle::Disposed {
                        return Err(VerificationError::Disposed);
                    }
                    state.session.challenge_issued(phone_number.clone(), challenge);
                    inner.start_capture(&mut state)
                };

                tracing::info!(
                    phone = %mask_phone_number(&phone_number),
                    cooldown_seconds = cooldown_seconds,
                    auto_capture = auto_capture,
                    event = "challenge_dispatched",
                    "Verification code sent"
                );

                Ok(DispatchOutcome {
                    phone_number,
                    resend_available_at: expiry,
                    cooldown_seconds,
                    auto_capture,
                })
            }
            Err(e) => {
                tracing::error!(
                    phone = %mask_phone_number(&phone_number),
                    error = %e,
                    event = "challenge_dispatch_failed",
                    "Failed to send verification code"
                );
                inner.bot_check.teardown().await;
                Err(VerificationError::Dispatch(e))
            }
        }
    }

    /// Confirm a code from an explicit submit
    pub async fn confirm(&self, code: &str) -> VerificationResult<ConfirmOutcome> {
        self.inner.confirm_code(code.trim(), CodeOrigin::Submit, None).await
    }

    /// Update the code input; a full-length value is confirmed right away
    pub async fn enter_code(&self, value: &str) -> VerificationResult<ConfirmOutcome> {
        let code_length = self.inner.config.code_length;
        let value: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .take(code_length)
            .collect();

        {
            let mut state = self.inner.lock_state();
            state.ensure_active()?;
            state.session.set_code_input(value.clone());
        }

        if value.chars().count() < code_length {
            return Ok(ConfirmOutcome::Skipped(SkipReason::Incomplete));
        }
        self.inner.confirm_code(&value, CodeOrigin::Input, None).await
    }

    /// Leave code entry and go back to the phone number
    ///
    /// The cooldown keeps running.
    pub fn change_phone_number(&self) -> VerificationResult<SessionSnapshot> {
        {
            let mut state = self.inner.lock_state();
            state.ensure_active()?;
            state.session.return_to_phone_entry()?;
            state.stop_capture();
        }
        Ok(self.inner.snapshot())
    }

    /// Release the widget, listener and countdown; idempotent
    pub async fn dispose(&self) {
        let inner = &self.inner;
        {
            let mut state = inner.lock_state();
            if state.lifecycle == Lifecycle::Disposed {
                return;
            }
            state.lifecycle = Lifecycle::Disposed;
            state.stop_capture();
        }
        inner.countdown.stop();
        inner.bot_check.teardown().await;

        tracing::debug!(event = "verification_flow_disposed", "Verification flow disposed");
    }
}

impl FlowInner {
    fn lock_state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now();
        let state = self.lock_state();
        let session = &state.session;
        SessionSnapshot {
            session_id: session.id(),
            status: session.status(),
            phone_number: session.phone_number().map(mask_phone_number),
            has_challenge: session.has_challenge(),
            code_input: session.code_input().to_string(),
            cooldown_remaining: session.cooldown_remaining(now),
            cooldown_expiry: session.active_cooldown(now),
            auto_capture_active: state.capture_active(),
            rejected_attempts: session.rejected_attempts(),
            created_at: session.created_at(),
        }
    }

    async fn rehydrate_cooldown(&self) {
        let now = self.clock.now();
        match self.cooldown.load().await {
            Ok(Some(expiry)) if expiry > now => {
                self.lock_state().session.restore_cooldown(expiry);
                self.countdown.start(expiry);
                tracing::info!(
                    cooldown_remaining = remaining_seconds(expiry, now),
                    event = "cooldown_rehydrated",
                    "Restored resend cooldown"
                );
            }
            Ok(Some(_)) => self.discard_persisted_cooldown().await,
            Ok(None) => {}
            Err(StorageError::CorruptValue { key }) => {
                tracing::warn!(key = %key, event = "cooldown_corrupt", "Discarding unreadable cooldown");
                self.discard_persisted_cooldown().await;
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    event = "cooldown_load_failed",
                    "Failed to read persisted cooldown"
                );
            }
        }
    }

    async fn discard_persisted_cooldown(&self) {
        if let Err(e) = self.cooldown.clear().await {
            tracing::warn!(
                error = %e,
                event = "cooldown_clear_failed",
                "Failed to clear persisted cooldown"
            );
        }
    }

    async fn apply_cooldown(&self, expiry: DateTime<Utc>) {
        self.lock_state().session.start_cooldown(expiry);
        if let Err(e) = self.cooldown.persist(expiry).await {
            tracing::error!(
                error = %e,
                event = "cooldown_persist_failed",
                "Failed to persist resend cooldown"
            );
        }
        self.countdown.start(expiry);
    }

    /// Start listening for an incoming code; returns whether a listener runs
    fn start_capture(self: &Arc<Self>, state: &mut FlowState) -> bool {
        state.stop_capture();

        let Some(capture) = self.capture.clone() else {
            return false;
        };
        if state.session.status() != VerificationStatus::ChallengeSent {
            return false;
        }
        if !self.capabilities.supports_auto_capture() {
            tracing::debug!(event = "auto_capture_unsupported", "Automatic code capture unavailable");
            return false;
        }

        let token = CancellationToken::new();
        let task_token = token.clone();
        let flow: Weak<FlowInner> = Arc::downgrade(self);

        let task = tokio::spawn(async move {
            let code = tokio::select! {
                biased;
                _ = task_token.cancelled() => None,
                code = capture.request_code(task_token.clone()) => code,
            };
            let Some(code) = code else {
                return;
            };

            // A code captured while another confirmation runs waits for it to
            // settle, then goes through the gate again
            loop {
                let Some(inner) = flow.upgrade() else {
                    return;
                };
                let mut settled = inner.settled.subscribe();
                let result = inner
                    .confirm_code(code.trim(), CodeOrigin::AutoCapture, Some(&task_token))
                    .await;
                drop(inner);

                match result {
                    Ok(ConfirmOutcome::Skipped(SkipReason::InFlight)) => {
                        tracing::debug!(
                            event = "auto_capture_deferred",
                            "Captured code waits for the running confirmation"
                        );
                        tokio::select! {
                            biased;
                            _ = task_token.cancelled() => return,
                            changed = settled.changed() => {
                                if changed.is_err() {
                                    return;
                                }
                            }
                        }
                    }
                    Ok(outcome) => {
                        tracing::debug!(
                            verified = outcome.is_verified(),
                            event = "auto_capture_completed",
                            "Automatic code capture finished"
                        );
                        return;
                    }
                    Err(e) => {
                        tracing::debug!(
                            error = %e,
                            event = "auto_capture_confirm_failed",
                            "Captured code was not accepted"
                        );
                        return;
                    }
                }
            }
        });

        state.listener = Some(CaptureListener::new(token, task));
        true
    }

    async fn confirm_code(
        &self,
        code: &str,
        origin: CodeOrigin,
        capture_token: Option<&CancellationToken>,
    ) -> VerificationResult<ConfirmOutcome> {
        let challenge = {
            let mut state = self.lock_state();
            if capture_token.map(CancellationToken::is_cancelled).unwrap_or(false) {
                return Ok(ConfirmOutcome::Skipped(SkipReason::Cancelled));
            }
            state.ensure_active()?;

            if origin == CodeOrigin::AutoCapture {
                state.session.set_code_input(code);
            }

            let allow_resubmit = self.config.allow_identical_resubmit && origin == CodeOrigin::Submit;
            match state
                .session
                .begin_confirmation(code, self.config.code_length, allow_resubmit)
            {
                Ok(challenge) => challenge,
                Err(ConfirmGate::Skip(reason)) => {
                    tracing::debug!(
                        origin = origin.as_str(),
                        reason = reason.as_str(),
                        event = "confirmation_skipped",
                        "Confirmation skipped"
                    );
                    return Ok(ConfirmOutcome::Skipped(reason));
                }
                Err(ConfirmGate::Reject(e)) => return Err(e),
            }
        };

        let mut confirming = ConfirmGuard { inner: self, armed: true };
        let result = self.provider.confirm_challenge(&challenge, code).await;
        confirming.armed = false;

        let mut state = self.lock_state();
        let session_id = state.session.id();
        let outcome = match result {
            Ok(identity) => {
                state.session.confirmation_succeeded();
                state.stop_capture();
                tracing::info!(
                    session_id = %session_id,
                    phone = %mask_phone_number(&identity.phone_number),
                    origin = origin.as_str(),
                    is_new_user = identity.is_new_user,
                    event = "phone_verified",
                    "Phone number verified"
                );
                Ok(ConfirmOutcome::Verified(identity))
            }
            Err(ConfirmError::InvalidCode) => {
                state.session.confirmation_failed();
                tracing::warn!(
                    session_id = %session_id,
                    origin = origin.as_str(),
                    rejected_attempts = state.session.rejected_attempts(),
                    event = "verification_code_rejected",
                    "Verification code rejected"
                );
                Err(VerificationError::InvalidCode)
            }
            Err(ConfirmError::Provider(e)) => {
                state.session.confirmation_failed();
                tracing::error!(
                    session_id = %session_id,
                    error = %e,
                    event = "confirmation_provider_error",
                    "Provider failed while confirming code"
                );
                Err(VerificationError::Provider(e))
            }
        };
        drop(state);
        self.confirmation_settled();
        outcome
    }

    fn confirmation_settled(&self) {
        self.settled.send_modify(|generation| *generation = generation.wrapping_add(1));
    }
}

/// Clears the dispatch flag however dispatch ends
struct DispatchGuard<'a> {
    inner: &'a FlowInner,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock_state().dispatching = false;
    }
}

/// Leaves `Confirming` if the confirmation future is dropped mid-call
struct ConfirmGuard<'a> {
    inner: &'a FlowInner,
    armed: bool,
}

impl Drop for ConfirmGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.inner.lock_state().session.abort_confirmation();
            self.inner.confirmation_settled();
        }
    }
}
