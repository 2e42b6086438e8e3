use actix_web::{web, HttpRequest, HttpResponse};

use ds_shared::{error_codes, ErrorResponse};

use crate::i18n::error_message;
use crate::middleware::client::request_language;
use crate::state::AppState;

/// Health check endpoint handler
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "drivesync-api",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config().environment,
        "active_sessions": state.session_count(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// API documentation endpoint
pub async fn api_documentation() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "DriveSync API v1",
        "endpoints": {
            "health": "/health",
            "phone_auth": {
                "create_session": {
                    "path": "/api/v1/phone-auth/sessions",
                    "method": "POST",
                    "request_body": {
                        "session_id": "uuid (optional, restores a session after reload)",
                        "otp_credential": "bool (client exposes an OTP credential facility)"
                    }
                },
                "get_session": { "path": "/api/v1/phone-auth/sessions/{id}", "method": "GET" },
                "send_code": {
                    "path": "/api/v1/phone-auth/sessions/{id}/code",
                    "method": "POST",
                    "request_body": { "phone": "string", "recaptcha_token": "string (optional)" },
                    "responses": {
                        "200": "Code sent",
                        "400": "Phone number missing",
                        "429": "Resend cooldown active",
                        "503": "Code could not be sent"
                    }
                },
                "verify_code": {
                    "path": "/api/v1/phone-auth/sessions/{id}/verify",
                    "method": "POST",
                    "request_body": { "code": "string" },
                    "responses": {
                        "200": "Verified, or skipped as a duplicate",
                        "400": "Invalid code",
                        "409": "No code requested yet"
                    }
                },
                "code_input": { "path": "/api/v1/phone-auth/sessions/{id}/code-input", "method": "PUT" },
                "change_phone": { "path": "/api/v1/phone-auth/sessions/{id}/change-phone", "method": "POST" },
                "inbound_sms": { "path": "/api/v1/phone-auth/sessions/{id}/sms", "method": "POST" },
                "select_role": { "path": "/api/v1/phone-auth/sessions/{id}/role", "method": "PUT" },
                "delete_session": { "path": "/api/v1/phone-auth/sessions/{id}", "method": "DELETE" }
            }
        }
    }))
}

/// Default 404 handler
pub async fn not_found(req: HttpRequest) -> HttpResponse {
    let lang = request_language(&req);
    let (code, message, _) = error_message("not_found", lang).unwrap_or_else(|| {
        (
            error_codes::NOT_FOUND.to_string(),
            "The requested resource was not found".to_string(),
            404,
        )
    });
    HttpResponse::NotFound().json(ErrorResponse::new(code, message))
}
