//! Phone verification session endpoints
//!
//! A client opens a session, requests a code for its phone number and then
//! confirms the code by submitting it, typing it, or forwarding the SMS that
//! carried it. Every error body is localized from `Accept-Language`.

use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;
use validator::Validate;

use ds_core::domain::value_objects::PostVerificationRoute;
use ds_core::services::verification::{CapabilityProbe, ConfirmOutcome};
use ds_shared::phone::mask_phone_number;
use ds_shared::{ApiResponse, Language};

use crate::dto::{
    CodeInputRequest, CreateSessionRequest, InboundSmsRequest, InboundSmsResponse, RoleResponse,
    SelectRoleRequest, SendCodeRequest, SendCodeResponse, SessionResponse, VerifyCodeRequest,
    VerifyCodeResponse,
};
use crate::handlers::{respond, ApiError};
use crate::i18n::notice;
use crate::middleware::client::{platform_capabilities, request_language};
use crate::state::{AppState, SessionEntry};

fn session_response(state: &AppState, entry: &SessionEntry) -> SessionResponse {
    SessionResponse {
        session: entry.flow.snapshot(),
        bot_check_container: entry.bot_check_container.clone(),
        site_key: state.bot_check().site_key().to_string(),
        auto_capture_supported: entry.capabilities.supports_auto_capture(),
    }
}

/// Route after a successful confirmation
///
/// Falls back to role selection when the stored role cannot be read.
async fn next_route(state: &AppState, id: Uuid) -> PostVerificationRoute {
    match state.onboarding(id).next_route().await {
        Ok(route) => route,
        Err(e) => {
            tracing::warn!(
                session_id = %id,
                error = %e,
                event = "role_lookup_failed",
                "Could not read selected role"
            );
            PostVerificationRoute::SelectRole
        }
    }
}

/// Response for a confirmation; a verified session is closed
async fn confirm_response(
    state: &AppState,
    id: Uuid,
    outcome: ConfirmOutcome,
    lang: Language,
) -> HttpResponse {
    if outcome.is_verified() {
        // A verified flow has nothing left to do
        state.close_session(id).await;
        let route = next_route(state, id).await;
        let body = VerifyCodeResponse::from_outcome(outcome, Some(route.path().to_string()));
        HttpResponse::Ok().json(ApiResponse::success(body).with_message(notice("phone_verified", lang)))
    } else {
        HttpResponse::Ok().json(ApiResponse::success(VerifyCodeResponse::from_outcome(outcome, None)))
    }
}

/// POST /api/v1/phone-auth/sessions
///
/// Opens a flow, or re-opens one after a reload when `session_id` is given.
pub async fn create_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateSessionRequest>,
) -> HttpResponse {
    let lang = request_language(&req);
    respond(lang, async {
        let capabilities = platform_capabilities(
            &req,
            body.otp_credential,
            state.config().server.trust_forwarded_proto,
        );
        let entry = state.open_session(body.session_id, capabilities).await?;

        Ok(HttpResponse::Created().json(
            ApiResponse::success(session_response(&state, &entry))
                .with_message(notice("session_ready", lang)),
        ))
    })
    .await
}

/// GET /api/v1/phone-auth/sessions/{id}
pub async fn get_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    respond(request_language(&req), async {
        let entry = state.session(*path)?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(session_response(&state, &entry))))
    })
    .await
}

/// POST /api/v1/phone-auth/sessions/{id}/code
///
/// 429 while the resend cooldown runs, 503 when the provider refuses to send.
pub async fn send_code(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SendCodeRequest>,
) -> HttpResponse {
    let lang = request_language(&req);
    respond(lang, async {
        body.validate()?;
        let id = *path;
        let entry = state.session(id)?;

        if let Some(token) = body.recaptcha_token.as_deref().map(str::trim) {
            if !token.is_empty() {
                state.bot_check().submit_token(&entry.bot_check_container, token);
            }
        }

        tracing::info!(
            session_id = %id,
            phone = %mask_phone_number(&body.phone),
            "Processing send code request"
        );
        entry.inbox.discard_pending();
        let outcome = entry.flow.dispatch_challenge(&body.phone).await?;

        Ok(HttpResponse::Ok().json(
            ApiResponse::success(SendCodeResponse::from(outcome))
                .with_message(notice("code_sent", lang)),
        ))
    })
    .await
}

/// POST /api/v1/phone-auth/sessions/{id}/verify
pub async fn verify_code(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<VerifyCodeRequest>,
) -> HttpResponse {
    let lang = request_language(&req);
    respond(lang, async {
        body.validate()?;
        let id = *path;
        let entry = state.session(id)?;
        let outcome = entry.flow.confirm(&body.code).await?;
        Ok(confirm_response(&state, id, outcome, lang).await)
    })
    .await
}

/// PUT /api/v1/phone-auth/sessions/{id}/code-input
///
/// Mirrors the code field; a complete code is confirmed right away.
pub async fn update_code_input(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CodeInputRequest>,
) -> HttpResponse {
    let lang = request_language(&req);
    respond(lang, async {
        body.validate()?;
        let id = *path;
        let entry = state.session(id)?;
        let outcome = entry.flow.enter_code(&body.value).await?;
        Ok(confirm_response(&state, id, outcome, lang).await)
    })
    .await
}

/// POST /api/v1/phone-auth/sessions/{id}/change-phone
pub async fn change_phone(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    respond(request_language(&req), async {
        let entry = state.session(*path)?;
        entry.flow.change_phone_number()?;
        Ok(HttpResponse::Ok().json(ApiResponse::success(session_response(&state, &entry))))
    })
    .await
}

/// POST /api/v1/phone-auth/sessions/{id}/sms
///
/// SMS text forwarded by the device. A code addressed to this origin wakes
/// the flow's capture listener, which confirms it in the background.
pub async fn inbound_sms(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<InboundSmsRequest>,
) -> HttpResponse {
    respond(request_language(&req), async {
        body.validate()?;
        let entry = state.session(*path)?;
        let accepted = entry.inbox.deliver(&body.message);
        Ok(HttpResponse::Accepted().json(ApiResponse::success(InboundSmsResponse { accepted })))
    })
    .await
}

/// PUT /api/v1/phone-auth/sessions/{id}/role
///
/// The role outlives the flow, so no live session is required.
pub async fn select_role(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SelectRoleRequest>,
) -> HttpResponse {
    let lang = request_language(&req);
    respond(lang, async {
        let router = state.onboarding(*path);
        router.select_role(body.role).await?;
        let route = router.next_route().await?;

        Ok(HttpResponse::Ok().json(
            ApiResponse::success(RoleResponse {
                role: body.role,
                redirect_to: route.path().to_string(),
            })
            .with_message(notice("role_saved", lang)),
        ))
    })
    .await
}

/// DELETE /api/v1/phone-auth/sessions/{id}
pub async fn delete_session(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    respond(request_language(&req), async {
        let id = *path;
        if !state.close_session(id).await {
            return Err(ApiError::SessionNotFound(id));
        }
        Ok(HttpResponse::NoContent().finish())
    })
    .await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/phone-auth")
            .route("/sessions", web::post().to(create_session))
            .route("/sessions/{id}", web::get().to(get_session))
            .route("/sessions/{id}", web::delete().to(delete_session))
            .route("/sessions/{id}/code", web::post().to(send_code))
            .route("/sessions/{id}/verify", web::post().to(verify_code))
            .route("/sessions/{id}/code-input", web::put().to(update_code_input))
            .route("/sessions/{id}/change-phone", web::post().to(change_phone))
            .route("/sessions/{id}/sms", web::post().to(inbound_sms))
            .route("/sessions/{id}/role", web::put().to(select_role)),
    );
}
