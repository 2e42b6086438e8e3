//! Conversion of flow and request errors into localized HTTP responses

use std::collections::HashMap;
use std::future::Future;

use actix_web::{error::JsonPayloadError, http::StatusCode, HttpRequest, HttpResponse};
use uuid::Uuid;

use ds_core::errors::{StorageError, VerificationError};
use ds_shared::{error_codes, ErrorResponse, Language};

use crate::i18n::{error_message, format_message};
use crate::middleware::client::request_language;

/// Everything a route can fail with
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    #[error("invalid request: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("malformed request body: {0}")]
    Payload(String),
}

impl ApiError {
    /// Catalog key of the user-facing message
    fn message_key(&self) -> &'static str {
        match self {
            ApiError::Verification(error) => match error {
                VerificationError::CooldownActive { .. } => "cooldown_active",
                VerificationError::MissingPhoneNumber => "phone_required",
                VerificationError::DispatchInFlight | VerificationError::ConfirmationInFlight => {
                    "request_in_progress"
                }
                VerificationError::NoActiveChallenge => "no_active_challenge",
                VerificationError::InvalidCodeLength { .. } => "code_length",
                VerificationError::InvalidCode => "invalid_code",
                VerificationError::AlreadyVerified => "already_verified",
                VerificationError::Dispatch(_) => "dispatch_failed",
                VerificationError::Provider(_) => "provider_unavailable",
                VerificationError::NotInitialized
                | VerificationError::AlreadyInitialized
                | VerificationError::Disposed => "session_closed",
                VerificationError::Storage(_) => "storage_error",
            },
            ApiError::Storage(_) => "storage_error",
            ApiError::SessionNotFound(_) => "session_not_found",
            ApiError::Validation(_) | ApiError::Payload(_) => "validation_error",
        }
    }

    /// Code used when the catalog has no entry
    fn fallback_code(&self) -> &'static str {
        match self {
            ApiError::Verification(error) => error.code(),
            ApiError::Storage(_) => error_codes::STORAGE_ERROR,
            ApiError::SessionNotFound(_) => error_codes::SESSION_NOT_FOUND,
            ApiError::Validation(_) | ApiError::Payload(_) => error_codes::VALIDATION_ERROR,
        }
    }

    fn params(&self) -> HashMap<&'static str, String> {
        let mut params = HashMap::new();
        match self {
            ApiError::Verification(VerificationError::CooldownActive { remaining_seconds }) => {
                params.insert("seconds", remaining_seconds.to_string());
            }
            ApiError::Verification(VerificationError::InvalidCodeLength { expected, .. }) => {
                params.insert("expected", expected.to_string());
            }
            _ => {}
        }
        params
    }

    fn is_client_error(&self) -> bool {
        match self {
            ApiError::Verification(error) => !matches!(
                error,
                VerificationError::Provider(_) | VerificationError::Storage(_)
            ),
            ApiError::Storage(_) => false,
            _ => true,
        }
    }

    /// Localized error response
    pub fn to_response(&self, lang: Language) -> HttpResponse {
        if self.is_client_error() {
            tracing::warn!(error = %self, event = "request_rejected", "Request rejected");
        } else {
            tracing::error!(error = ?self, event = "request_failed", "Request failed");
        }

        let (code, message, status) = error_message(self.message_key(), lang).unwrap_or_else(|| {
            (
                self.fallback_code().to_string(),
                self.to_string(),
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            )
        });
        let message = format_message(&message, &self.params());

        let mut body = ErrorResponse::new(code, message);
        match self {
            ApiError::Verification(VerificationError::CooldownActive { remaining_seconds }) => {
                body = body.add_detail("remaining_seconds", remaining_seconds);
            }
            ApiError::Verification(VerificationError::InvalidCodeLength { expected, actual }) => {
                body = body
                    .add_detail("expected", expected)
                    .add_detail("actual", actual);
            }
            ApiError::Validation(errors) => {
                let fields: HashMap<String, Vec<String>> = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, errors)| {
                        let messages = errors
                            .iter()
                            .map(|e| {
                                e.message
                                    .as_ref()
                                    .map(|m| m.to_string())
                                    .unwrap_or_else(|| e.code.to_string())
                            })
                            .collect();
                        (field.to_string(), messages)
                    })
                    .collect();
                body = body.add_detail("fields", fields);
            }
            _ => {}
        }

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::build(status).json(body)
    }
}

/// Run a route body and render its error in the caller's language
pub async fn respond<F>(lang: Language, handler: F) -> HttpResponse
where
    F: Future<Output = Result<HttpResponse, ApiError>>,
{
    match handler.await {
        Ok(response) => response,
        Err(error) => error.to_response(lang),
    }
}

/// JSON extractor errors rendered like every other validation error
pub fn json_error_handler(error: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    let response = ApiError::Payload(error.to_string()).to_response(request_language(req));
    actix_web::error::InternalError::from_response(error, response).into()
}
